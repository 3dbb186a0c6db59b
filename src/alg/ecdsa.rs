//! `ES256`, `ES384` and `ES512` algorithms implemented with the RustCrypto NIST curve crates.

use std::{borrow::Cow, num::NonZeroUsize};

use crate::{alg, Algorithm, AlgorithmSignature};

macro_rules! define_ecdsa_alg {
    (
        $(#[$($attr:meta)+])*
        struct $name:ident($curve:ident, $alg_name:expr, $scalar_len:expr);
    ) => {
        impl AlgorithmSignature for $curve::ecdsa::Signature {
            const LENGTH: Option<NonZeroUsize> = NonZeroUsize::new(2 * $scalar_len);

            fn try_from_slice(slice: &[u8]) -> anyhow::Result<Self> {
                Self::from_slice(slice).map_err(|err| anyhow::anyhow!(err))
            }

            fn as_bytes(&self) -> Cow<'_, [u8]> {
                Cow::Owned(self.to_bytes().to_vec())
            }
        }

        $(#[$($attr)+])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $name {
            /// Byte length of a raw secret scalar for the curve.
            pub const SCALAR_LEN: usize = $scalar_len;
        }

        impl Algorithm for $name {
            type SigningKey = $curve::ecdsa::SigningKey;
            type VerifyingKey = $curve::ecdsa::VerifyingKey;
            type Signature = $curve::ecdsa::Signature;

            fn name(&self) -> Cow<'static, str> {
                Cow::Borrowed($alg_name)
            }

            fn sign(
                &self,
                signing_key: &Self::SigningKey,
                message: &[u8],
            ) -> anyhow::Result<Self::Signature> {
                use $curve::ecdsa::signature::Signer as _;

                signing_key
                    .try_sign(message)
                    .map_err(|err| anyhow::anyhow!(err))
            }

            fn verify_signature(
                &self,
                signature: &Self::Signature,
                verifying_key: &Self::VerifyingKey,
                message: &[u8],
            ) -> bool {
                use $curve::ecdsa::signature::Verifier as _;

                verifying_key.verify(message, signature).is_ok()
            }
        }

        /// Accepts a raw big-endian secret scalar of exactly the curve size.
        /// PEM documents may be PKCS#8 or SEC1-encoded.
        impl alg::SigningKey<$name> for $curve::ecdsa::SigningKey {
            fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
                anyhow::ensure!(
                    raw.len() == $scalar_len,
                    "{} secret key must have {} bytes, got {}",
                    $alg_name,
                    $scalar_len,
                    raw.len()
                );
                Self::from_slice(raw).map_err(|err| anyhow::anyhow!(err))
            }

            fn from_pem(pem: &str) -> anyhow::Result<Self> {
                use $curve::pkcs8::DecodePrivateKey as _;

                let secret = $curve::SecretKey::from_pkcs8_pem(pem)
                    .or_else(|_| $curve::SecretKey::from_sec1_pem(pem))
                    .map_err(|err| {
                        anyhow::anyhow!("cannot parse {} private key: {err}", $alg_name)
                    })?;
                Self::from_slice(&secret.to_bytes()).map_err(|err| anyhow::anyhow!(err))
            }

            fn to_verifying_key(&self) -> <$name as Algorithm>::VerifyingKey {
                $curve::ecdsa::VerifyingKey::from(self)
            }
        }

        /// Accepts SEC1-encoded points (compressed or uncompressed), or SPKI PEM documents.
        impl alg::VerifyingKey<$name> for $curve::ecdsa::VerifyingKey {
            fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
                Self::from_sec1_bytes(raw).map_err(|err| anyhow::anyhow!(err))
            }

            fn from_pem(pem: &str) -> anyhow::Result<Self> {
                use $curve::{
                    elliptic_curve::sec1::ToEncodedPoint as _, pkcs8::DecodePublicKey as _,
                };

                let public = $curve::PublicKey::from_public_key_pem(pem).map_err(|err| {
                    anyhow::anyhow!("cannot parse {} public key: {err}", $alg_name)
                })?;
                Self::from_sec1_bytes(public.to_encoded_point(false).as_bytes())
                    .map_err(|err| anyhow::anyhow!(err))
            }
        }
    };
}

define_ecdsa_alg! {
    /// `ES256` signing algorithm. Implements elliptic curve digital signatures (ECDSA)
    /// on the secp256r1 curve (aka P-256) with SHA-256.
    struct Es256(p256, "ES256", 32);
}
define_ecdsa_alg! {
    /// `ES384` signing algorithm: ECDSA on the secp384r1 curve (aka P-384) with SHA-384.
    struct Es384(p384, "ES384", 48);
}
define_ecdsa_alg! {
    /// `ES512` signing algorithm: ECDSA on the secp521r1 curve (aka P-521) with SHA-512.
    ///
    /// Note that the scalar length is 66 bytes, not 64.
    struct Es512(p521, "ES512", 66);
}

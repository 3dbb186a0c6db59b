//! JWT algorithms based on HMACs.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use smallvec::SmallVec;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use std::{borrow::Cow, fmt};

use crate::{alg::SigningKey, Algorithm, AlgorithmSignature};

/// Signature produced by the `HS*` algorithms.
#[derive(Clone, PartialEq, Eq)]
pub struct HmacSignature(SmallVec<[u8; 64]>);

impl fmt::Debug for HmacSignature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("HmacSignature").field(&"_").finish()
    }
}

impl AlgorithmSignature for HmacSignature {
    fn try_from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(Self(bytes.into()))
    }

    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }
}

macro_rules! define_hmac_key {
    (
        $(#[$($attr:meta)+])*
        struct $name:ident<$digest:ident>([u8; $buffer_size:expr]);
    ) => {
        $(#[$($attr)+])*
        #[derive(Clone, Zeroize)]
        #[zeroize(drop)]
        pub struct $name(pub(crate) SmallVec<[u8; $buffer_size]>);

        impl fmt::Debug for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.debug_tuple(stringify!($name)).field(&"_").finish()
            }
        }

        impl $name {
            /// Creates a key from the specified `bytes`.
            pub fn new(bytes: impl AsRef<[u8]>) -> Self {
                Self(bytes.as_ref().into())
            }

            /// Computes HMAC with this key and the specified `message`.
            fn hmac(&self, message: &[u8]) -> SmallVec<[u8; 64]> {
                let mut hmac = <Hmac<$digest> as Mac>::new_from_slice(&self.0)
                    .expect("HMACs work with any key size");
                hmac.update(message);
                hmac.finalize().into_bytes().as_slice().into()
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                $name(bytes.into())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

define_hmac_key! {
    /// Signing / verifying key for `HS256` algorithm. Zeroed on drop.
    struct Hs256Key<Sha256>([u8; 64]);
}
define_hmac_key! {
    /// Signing / verifying key for `HS384` algorithm. Zeroed on drop.
    struct Hs384Key<Sha384>([u8; 128]);
}
define_hmac_key! {
    /// Signing / verifying key for `HS512` algorithm. Zeroed on drop.
    struct Hs512Key<Sha512>([u8; 128]);
}

macro_rules! define_hmac_alg {
    (
        $(#[$($attr:meta)+])*
        struct $name:ident($key:ident, $alg_name:expr, $output_len:expr);
    ) => {
        $(#[$($attr)+])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $name {
            /// Byte length of the hash output, which is also the minimum recommended key length.
            pub const OUTPUT_LEN: usize = $output_len;
        }

        impl Algorithm for $name {
            type SigningKey = $key;
            type VerifyingKey = $key;
            type Signature = HmacSignature;

            fn name(&self) -> Cow<'static, str> {
                Cow::Borrowed($alg_name)
            }

            fn sign(
                &self,
                signing_key: &Self::SigningKey,
                message: &[u8],
            ) -> anyhow::Result<Self::Signature> {
                Ok(HmacSignature(signing_key.hmac(message)))
            }

            fn verify_signature(
                &self,
                signature: &Self::Signature,
                verifying_key: &Self::VerifyingKey,
                message: &[u8],
            ) -> bool {
                let expected = verifying_key.hmac(message);
                // Length mismatch is not secret, so `ct_eq` on slices of different length
                // short-circuits to `false`.
                expected.as_slice().ct_eq(signature.0.as_slice()).into()
            }
        }

        impl SigningKey<$name> for $key {
            fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
                Ok(Self::from(raw))
            }

            fn to_verifying_key(&self) -> Self {
                self.clone()
            }
        }

        impl crate::alg::VerifyingKey<$name> for $key {
            fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
                Ok(Self::from(raw))
            }
        }
    };
}

define_hmac_alg! {
    /// `HS256` signing algorithm.
    ///
    /// See [RFC 7518] for the algorithm specification.
    ///
    /// [RFC 7518]: https://tools.ietf.org/html/rfc7518#section-3.2
    struct Hs256(Hs256Key, "HS256", 32);
}
define_hmac_alg! {
    /// `HS384` signing algorithm.
    ///
    /// See [RFC 7518] for the algorithm specification.
    ///
    /// [RFC 7518]: https://tools.ietf.org/html/rfc7518#section-3.2
    struct Hs384(Hs384Key, "HS384", 48);
}
define_hmac_alg! {
    /// `HS512` signing algorithm.
    ///
    /// See [RFC 7518] for the algorithm specification.
    ///
    /// [RFC 7518]: https://tools.ietf.org/html/rfc7518#section-3.2
    struct Hs512(Hs512Key, "HS512", 64);
}

//! RSA-based JWT schemes: `RS*` and `PS*`.

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use rand_core::OsRng;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    traits::PublicKeyParts,
    Pkcs1v15Sign, Pss,
};
use sha2::{Digest, Sha256, Sha384, Sha512};

use std::{borrow::Cow, fmt};

use crate::{
    alg::{SigningKey, VerifyingKey},
    Algorithm, AlgorithmSignature,
};

/// Minimum supported bit length of an RSA modulus, as per [RFC 7518].
///
/// [RFC 7518]: https://www.rfc-editor.org/rfc/rfc7518.html#section-3.3
pub const MIN_MODULUS_BITS: usize = 2_048;

/// RSA signature.
#[derive(Clone)]
pub struct RsaSignature(Vec<u8>);

impl fmt::Debug for RsaSignature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RsaSignature")
            .field("len", &self.0.len())
            .finish()
    }
}

impl AlgorithmSignature for RsaSignature {
    fn try_from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(!bytes.is_empty(), "RSA signature is empty");
        Ok(RsaSignature(bytes.to_vec()))
    }

    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }
}

/// RSA hash algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(message).to_vec(),
            Self::Sha384 => Sha384::digest(message).to_vec(),
            Self::Sha512 => Sha512::digest(message).to_vec(),
        }
    }

    fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            Self::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            Self::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            Self::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }

    /// The salt length is set to the size of hash function output;
    /// see <https://www.rfc-editor.org/rfc/rfc7518.html#section-3.5>.
    fn pss(self) -> Pss {
        match self {
            Self::Sha256 => Pss::new::<Sha256>(),
            Self::Sha384 => Pss::new::<Sha384>(),
            Self::Sha512 => Pss::new::<Sha512>(),
        }
    }
}

/// RSA padding algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Padding {
    Pkcs1v15,
    Pss,
}

/// Integrity algorithm using [RSA] digital signatures.
///
/// Depending on the variation, the algorithm employs PKCS#1 v1.5 or PSS padding and
/// one of the hash functions from the SHA-2 family: SHA-256, SHA-384, or SHA-512.
/// See [RFC 7518] for more details. Depending on the chosen parameters,
/// the name of the algorithm is one of `RS256`, `RS384`, `RS512`, `PS256`, `PS384`, `PS512`:
///
/// - `R` / `P` denote the padding scheme: PKCS#1 v1.5 for `R`, PSS for `P`
/// - `256` / `384` / `512` denote the hash function
///
/// The length of RSA keys is not unequivocally specified by the algorithm; nevertheless,
/// it **MUST** be at least 2048 bits as per RFC 7518. Keys with shorter moduli are rejected
/// when a [`Signer`](crate::Signer) is created.
///
/// [RSA]: https://en.wikipedia.org/wiki/RSA_(cryptosystem)
/// [RFC 7518]: https://www.rfc-editor.org/rfc/rfc7518.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rsa {
    hash_alg: HashAlg,
    padding_alg: Padding,
}

impl Algorithm for Rsa {
    type SigningKey = RsaPrivateKey;
    type VerifyingKey = RsaPublicKey;
    type Signature = RsaSignature;

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.alg_name())
    }

    fn sign(
        &self,
        signing_key: &Self::SigningKey,
        message: &[u8],
    ) -> anyhow::Result<Self::Signature> {
        let digest = self.hash_alg.digest(message);
        let signature = match self.padding_alg {
            Padding::Pkcs1v15 => {
                signing_key.sign_with_rng(&mut OsRng, self.hash_alg.pkcs1v15(), &digest)
            }
            Padding::Pss => signing_key.sign_with_rng(&mut OsRng, self.hash_alg.pss(), &digest),
        };
        signature.map(RsaSignature).map_err(|err| anyhow::anyhow!(err))
    }

    fn verify_signature(
        &self,
        signature: &Self::Signature,
        verifying_key: &Self::VerifyingKey,
        message: &[u8],
    ) -> bool {
        let digest = self.hash_alg.digest(message);
        let result = match self.padding_alg {
            Padding::Pkcs1v15 => {
                verifying_key.verify(self.hash_alg.pkcs1v15(), &digest, &signature.0)
            }
            Padding::Pss => verifying_key.verify(self.hash_alg.pss(), &digest, &signature.0),
        };
        result.is_ok()
    }
}

impl Rsa {
    const fn new(hash_alg: HashAlg, padding_alg: Padding) -> Self {
        Rsa {
            hash_alg,
            padding_alg,
        }
    }

    /// RSA with SHA-256 and PKCS#1 v1.5 padding.
    pub const fn rs256() -> Rsa {
        Rsa::new(HashAlg::Sha256, Padding::Pkcs1v15)
    }

    /// RSA with SHA-384 and PKCS#1 v1.5 padding.
    pub const fn rs384() -> Rsa {
        Rsa::new(HashAlg::Sha384, Padding::Pkcs1v15)
    }

    /// RSA with SHA-512 and PKCS#1 v1.5 padding.
    pub const fn rs512() -> Rsa {
        Rsa::new(HashAlg::Sha512, Padding::Pkcs1v15)
    }

    /// RSA with SHA-256 and PSS padding.
    pub const fn ps256() -> Rsa {
        Rsa::new(HashAlg::Sha256, Padding::Pss)
    }

    /// RSA with SHA-384 and PSS padding.
    pub const fn ps384() -> Rsa {
        Rsa::new(HashAlg::Sha384, Padding::Pss)
    }

    /// RSA with SHA-512 and PSS padding.
    pub const fn ps512() -> Rsa {
        Rsa::new(HashAlg::Sha512, Padding::Pss)
    }

    fn alg_name(self) -> &'static str {
        match (self.padding_alg, self.hash_alg) {
            (Padding::Pkcs1v15, HashAlg::Sha256) => "RS256",
            (Padding::Pkcs1v15, HashAlg::Sha384) => "RS384",
            (Padding::Pkcs1v15, HashAlg::Sha512) => "RS512",
            (Padding::Pss, HashAlg::Sha256) => "PS256",
            (Padding::Pss, HashAlg::Sha384) => "PS384",
            (Padding::Pss, HashAlg::Sha512) => "PS512",
        }
    }

    /// Checks that the key modulus is long enough.
    pub(crate) fn check_modulus(key: &impl PublicKeyParts) -> anyhow::Result<()> {
        let bits = key.n().bits();
        anyhow::ensure!(
            bits >= MIN_MODULUS_BITS,
            "RSA modulus has {bits} bits; at least {MIN_MODULUS_BITS} bits are required"
        );
        Ok(())
    }
}

/// Parses PKCS#8 or PKCS#1 DER-encoded private keys.
impl SigningKey<Rsa> for RsaPrivateKey {
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
        Self::from_pkcs8_der(raw)
            .or_else(|_| Self::from_pkcs1_der(raw))
            .map_err(|err| anyhow::anyhow!("cannot parse RSA private key: {err}"))
    }

    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        Self::from_pkcs8_pem(pem)
            .or_else(|_| Self::from_pkcs1_pem(pem))
            .map_err(|err| anyhow::anyhow!("cannot parse RSA private key: {err}"))
    }

    fn to_verifying_key(&self) -> RsaPublicKey {
        self.to_public_key()
    }
}

/// Parses SPKI or PKCS#1 DER-encoded public keys.
impl VerifyingKey<Rsa> for RsaPublicKey {
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
        Self::from_public_key_der(raw)
            .or_else(|_| Self::from_pkcs1_der(raw))
            .map_err(|err| anyhow::anyhow!("cannot parse RSA public key: {err}"))
    }

    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        Self::from_public_key_pem(pem)
            .or_else(|_| Self::from_pkcs1_pem(pem))
            .map_err(|err| anyhow::anyhow!("cannot parse RSA public key: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use rsa::BigUint;

    use super::*;

    fn public_key_with_modulus_bits(bits: usize) -> RsaPublicKey {
        let modulus = (BigUint::from(1_u8) << (bits - 1)) + BigUint::from(1_u8);
        RsaPublicKey::new(modulus, BigUint::from(65_537_u32)).unwrap()
    }

    #[test]
    fn modulus_length_is_counted_in_bits() {
        let key = public_key_with_modulus_bits(2_048);
        assert_eq!(key.size(), 256);
        Rsa::check_modulus(&key).unwrap();

        // Same byte length, but one bit short.
        let key = public_key_with_modulus_bits(2_047);
        assert_eq!(key.size(), 256);
        let err = Rsa::check_modulus(&key).unwrap_err().to_string();
        assert!(err.contains("2047 bits"), "{err}");
    }
}

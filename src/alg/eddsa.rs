//! EdDSA on the Ed25519 curve, in pure (`Ed25519`) and pre-hashed (`Ed25519ph`) flavors,
//! implemented with `ed25519-dalek`.

use ed25519_dalek::{
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey,
};
use sha2::{Digest, Sha512};

use std::{borrow::Cow, num::NonZeroUsize};

use crate::{alg, Algorithm, AlgorithmSignature};

impl AlgorithmSignature for Signature {
    const LENGTH: Option<NonZeroUsize> = NonZeroUsize::new(ed25519_dalek::SIGNATURE_LENGTH);

    fn try_from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        Self::from_slice(bytes).map_err(|err| anyhow::anyhow!(err))
    }

    fn as_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_bytes().to_vec())
    }
}

/// EdDSA algorithm using the Ed25519 elliptic curve.
///
/// With `prehash` set, the message is hashed with SHA-512 before signing as per
/// [RFC 8032] (`Ed25519ph`); otherwise, the pure variant is used.
///
/// [RFC 8032]: https://www.rfc-editor.org/rfc/rfc8032#section-5.1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ed25519 {
    prehash: bool,
}

impl Ed25519 {
    /// Pure Ed25519.
    pub const fn new() -> Self {
        Self { prehash: false }
    }

    /// Pre-hashed Ed25519 (`Ed25519ph`).
    pub const fn prehashed() -> Self {
        Self { prehash: true }
    }

    /// Checks whether this algorithm pre-hashes messages.
    pub fn is_prehashed(self) -> bool {
        self.prehash
    }
}

impl Algorithm for Ed25519 {
    type SigningKey = SigningKey;
    type VerifyingKey = VerifyingKey;
    type Signature = Signature;

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(if self.prehash { "Ed25519ph" } else { "Ed25519" })
    }

    fn sign(
        &self,
        signing_key: &Self::SigningKey,
        message: &[u8],
    ) -> anyhow::Result<Self::Signature> {
        if self.prehash {
            let digest = Sha512::new().chain_update(message);
            signing_key
                .sign_prehashed(digest, None)
                .map_err(|err| anyhow::anyhow!(err))
        } else {
            Ok(signing_key.sign(message))
        }
    }

    fn verify_signature(
        &self,
        signature: &Self::Signature,
        verifying_key: &Self::VerifyingKey,
        message: &[u8],
    ) -> bool {
        if self.prehash {
            let digest = Sha512::new().chain_update(message);
            verifying_key
                .verify_prehashed(digest, None, signature)
                .is_ok()
        } else {
            verifying_key.verify(message, signature).is_ok()
        }
    }
}

/// Accepts either a 32-byte secret seed or a 64-byte keypair (seed followed by the public key).
impl alg::SigningKey<Ed25519> for SigningKey {
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
        match raw.len() {
            ed25519_dalek::SECRET_KEY_LENGTH => {
                let mut seed = [0_u8; ed25519_dalek::SECRET_KEY_LENGTH];
                seed.copy_from_slice(raw);
                Ok(Self::from_bytes(&seed))
            }
            ed25519_dalek::KEYPAIR_LENGTH => {
                let mut keypair = [0_u8; ed25519_dalek::KEYPAIR_LENGTH];
                keypair.copy_from_slice(raw);
                Self::from_keypair_bytes(&keypair).map_err(|err| anyhow::anyhow!(err))
            }
            len => Err(anyhow::anyhow!(
                "Ed25519 secret key must have 32 or 64 bytes, got {len}"
            )),
        }
    }

    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        Self::from_pkcs8_pem(pem)
            .map_err(|err| anyhow::anyhow!("cannot parse Ed25519 private key: {err}"))
    }

    fn to_verifying_key(&self) -> VerifyingKey {
        self.verifying_key()
    }
}

impl alg::VerifyingKey<Ed25519> for VerifyingKey {
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self> {
        let raw: &[u8; ed25519_dalek::PUBLIC_KEY_LENGTH] = raw
            .try_into()
            .map_err(|_| anyhow::anyhow!("Ed25519 public key must have 32 bytes"))?;
        Self::from_bytes(raw).map_err(|err| anyhow::anyhow!(err))
    }

    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        Self::from_public_key_pem(pem)
            .map_err(|err| anyhow::anyhow!("cannot parse Ed25519 public key: {err}"))
    }
}

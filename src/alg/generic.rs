//! Generic traits providing uniform interfaces for loading keys of a certain cryptosystem,
//! and a container for a key of either kind.

use std::fmt;

use crate::Algorithm;

/// Verifying key for a specific signature cryptosystem. In the case of public-key cryptosystems,
/// this is a public key.
///
/// This trait provides a uniform interface for loading keys of different algorithms.
pub trait VerifyingKey<T>: Sized
where
    T: Algorithm<VerifyingKey = Self>,
{
    /// Creates a key from `raw` bytes. Returns an error if the bytes do not represent
    /// a valid key.
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self>;

    /// Creates a key from a PEM-encoded document.
    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        let _ = pem;
        Err(anyhow::anyhow!("PEM-encoded keys are not supported"))
    }
}

/// Signing key for a specific signature cryptosystem. In the case of public-key cryptosystems,
/// this is a private key.
///
/// This trait provides a uniform interface for loading keys of different algorithms.
pub trait SigningKey<T>: Sized
where
    T: Algorithm<SigningKey = Self>,
{
    /// Creates a key from `raw` bytes. Returns an error if the bytes do not represent
    /// a valid key.
    fn from_slice(raw: &[u8]) -> anyhow::Result<Self>;

    /// Creates a key from a PEM-encoded document.
    fn from_pem(pem: &str) -> anyhow::Result<Self> {
        let _ = pem;
        Err(anyhow::anyhow!("PEM-encoded keys are not supported"))
    }

    /// Converts a signing key to a verification key.
    fn to_verifying_key(&self) -> T::VerifyingKey;
}

/// Key material for an asymmetric algorithm: either a signing key (which can both sign
/// and verify tokens), or a verifying key only.
pub enum KeyMaterial<A: Algorithm> {
    /// Signing (private) key.
    Signing(A::SigningKey),
    /// Verifying (public) key.
    Verifying(A::VerifyingKey),
}

impl<A> KeyMaterial<A>
where
    A: Algorithm,
    A::SigningKey: SigningKey<A>,
    A::VerifyingKey: VerifyingKey<A>,
{
    /// Loads a signing key from raw bytes.
    pub fn from_signing_slice(raw: &[u8]) -> anyhow::Result<Self> {
        A::SigningKey::from_slice(raw).map(Self::Signing)
    }

    /// Loads a verifying key from raw bytes.
    pub fn from_verifying_slice(raw: &[u8]) -> anyhow::Result<Self> {
        A::VerifyingKey::from_slice(raw).map(Self::Verifying)
    }

    /// Loads a key from a PEM document, trying a signing key first.
    pub fn from_pem(pem: &str) -> anyhow::Result<Self> {
        match A::SigningKey::from_pem(pem) {
            Ok(key) => Ok(Self::Signing(key)),
            Err(signing_err) => A::VerifyingKey::from_pem(pem)
                .map(Self::Verifying)
                .map_err(|_| signing_err),
        }
    }

    /// Returns the signing key, if present.
    pub fn signing_key(&self) -> Option<&A::SigningKey> {
        match self {
            Self::Signing(key) => Some(key),
            Self::Verifying(_) => None,
        }
    }

    /// Invokes `action` with the verifying key, deriving it from the signing key if necessary.
    pub fn with_verifying_key<R>(&self, action: impl FnOnce(&A::VerifyingKey) -> R) -> R {
        match self {
            Self::Signing(key) => action(&key.to_verifying_key()),
            Self::Verifying(key) => action(key),
        }
    }
}

impl<A> Clone for KeyMaterial<A>
where
    A: Algorithm,
    A::SigningKey: Clone,
    A::VerifyingKey: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Signing(key) => Self::Signing(key.clone()),
            Self::Verifying(key) => Self::Verifying(key.clone()),
        }
    }
}

impl<A: Algorithm> fmt::Debug for KeyMaterial<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Signing(_) => "Signing",
            Self::Verifying(_) => "Verifying",
        };
        formatter.debug_tuple(kind).field(&"_").finish()
    }
}

//! [`Signer`]: a closed set of supported algorithms paired with key material.

use serde::{Deserialize, Serialize};

use std::{fmt, str::FromStr};

use crate::{
    alg::{
        Ed25519, Es256, Es384, Es512, Hs256, Hs256Key, Hs384, Hs384Key, Hs512, Hs512Key,
        KeyMaterial, NoneAlg, Rsa, SigningKey, VerifyingKey,
    },
    traits::AlgorithmExt,
    Algorithm, CreationError, KeyError, ValidationError,
};

/// Name of a JWT signing algorithm, as it appears in the `alg` field of the token header.
///
/// The set of names is closed; names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AlgorithmName {
    /// HMAC with SHA-256.
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC with SHA-384.
    #[serde(rename = "HS384")]
    Hs384,
    /// HMAC with SHA-512.
    #[serde(rename = "HS512")]
    Hs512,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,
    /// RSASSA-PSS with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,
    /// RSASSA-PSS with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,
    /// RSASSA-PSS with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,
    /// ECDSA on P-256 with SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA on P-384 with SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA on P-521 with SHA-512.
    #[serde(rename = "ES512")]
    Es512,
    /// Pure EdDSA on Curve25519.
    Ed25519,
    /// Pre-hashed EdDSA on Curve25519.
    Ed25519ph,
    /// Pure EdDSA on Curve448. Recognized, but not supported.
    Ed448,
    /// Pre-hashed EdDSA on Curve448. Recognized, but not supported.
    Ed448ph,
    /// Unsecured tokens.
    #[serde(rename = "none")]
    None,
}

impl AlgorithmName {
    /// All recognized algorithm names.
    pub const ALL: [Self; 17] = [
        Self::Hs256,
        Self::Hs384,
        Self::Hs512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::Ed25519,
        Self::Ed25519ph,
        Self::Ed448,
        Self::Ed448ph,
        Self::None,
    ];

    /// Returns the name as used in the JWT header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ed25519 => "Ed25519",
            Self::Ed25519ph => "Ed25519ph",
            Self::Ed448 => "Ed448",
            Self::Ed448ph => "Ed448ph",
            Self::None => "none",
        }
    }

    /// Checks whether this crate has a cryptographic backend for the algorithm.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Ed448 | Self::Ed448ph)
    }

    fn rsa(self) -> Option<Rsa> {
        Some(match self {
            Self::Rs256 => Rsa::rs256(),
            Self::Rs384 => Rsa::rs384(),
            Self::Rs512 => Rsa::rs512(),
            Self::Ps256 => Rsa::ps256(),
            Self::Ps384 => Rsa::ps384(),
            Self::Ps512 => Rsa::ps512(),
            _ => return None,
        })
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmName {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| KeyError::UnknownAlgorithm(s.to_owned()))
    }
}

/// Source of key material for a [`Signer`].
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// Raw secret bytes: the HMAC secret, a DER-encoded RSA private key (PKCS#8 or PKCS#1),
    /// an EC secret scalar, or an Ed25519 seed / keypair.
    Octet(&'a [u8]),
    /// Raw public key bytes: a DER-encoded RSA public key (SPKI or PKCS#1), a SEC1-encoded
    /// EC point, or a 32-byte Ed25519 public key. For HMAC, this is the same as [`Self::Octet`].
    PublicOctet(&'a [u8]),
    /// PEM document with either a private or a public key.
    Pem(&'a str),
}

impl fmt::Debug for KeySource<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Octet(_) => "Octet",
            Self::PublicOctet(_) => "PublicOctet",
            Self::Pem(_) => "Pem",
        };
        formatter.debug_tuple(kind).field(&"_").finish()
    }
}

/// Serializable signer settings, e.g. loaded from an application config file.
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::{AlgorithmName, Signer, SignerConfig};
/// # fn main() -> anyhow::Result<()> {
/// let config: SignerConfig = serde_json::from_str(
///     r#"{ "signer_alg": "HS512", "key_octet": "my secret" }"#,
/// )?;
/// let signer = Signer::from_config(&config)?;
/// assert_eq!(signer.algorithm(), AlgorithmName::Hs512);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Algorithm name; `HS256` by default.
    pub signer_alg: String,
    /// Raw secret (used as UTF-8 bytes).
    pub key_octet: Option<String>,
    /// PEM-encoded private or public key. Takes precedence over `key_octet`.
    pub key_pem: Option<String>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            signer_alg: AlgorithmName::Hs256.to_string(),
            key_octet: None,
            key_pem: None,
        }
    }
}

#[derive(Clone)]
enum SignerInner {
    Hs256(Hs256Key),
    Hs384(Hs384Key),
    Hs512(Hs512Key),
    Rsa(Rsa, KeyMaterial<Rsa>),
    Es256(KeyMaterial<Es256>),
    Es384(KeyMaterial<Es384>),
    Es512(KeyMaterial<Es512>),
    Ed25519(Ed25519, KeyMaterial<Ed25519>),
    None,
}

/// Algorithm together with key material, used to sign and verify tokens.
///
/// A signer is immutable once created. Signers holding only a public key can verify tokens,
/// but fail to sign them.
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::{AlgorithmName, KeySource, Signer};
/// # fn main() -> anyhow::Result<()> {
/// let signer = Signer::new(AlgorithmName::Hs256, KeySource::Octet(b"super_secret_key"))?;
/// let signature = signer.sign(b"header.payload")?;
/// signer.verify(b"header.payload", &signature)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Signer {
    name: AlgorithmName,
    inner: SignerInner,
}

impl fmt::Debug for Signer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Signer")
            .field("algorithm", &self.name)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

fn load_key<A>(name: AlgorithmName, key: KeySource<'_>) -> Result<KeyMaterial<A>, KeyError>
where
    A: Algorithm,
    A::SigningKey: SigningKey<A>,
    A::VerifyingKey: VerifyingKey<A>,
{
    let material = match key {
        KeySource::Octet(raw) => KeyMaterial::from_signing_slice(raw),
        KeySource::PublicOctet(raw) => KeyMaterial::from_verifying_slice(raw),
        KeySource::Pem(pem) => KeyMaterial::from_pem(pem),
    };
    material.map_err(|reason| KeyError::unsuitable(name, reason))
}

fn hmac_secret<'a>(
    name: AlgorithmName,
    key: KeySource<'a>,
    output_len: usize,
) -> Result<&'a [u8], KeyError> {
    let secret = match key {
        KeySource::Octet(raw) | KeySource::PublicOctet(raw) => raw,
        KeySource::Pem(_) => {
            let reason = anyhow::anyhow!("HMAC secrets cannot be PEM-encoded");
            return Err(KeyError::unsuitable(name, reason));
        }
    };
    warn_weak_secret(name, secret.len(), output_len);
    Ok(secret)
}

fn warn_weak_secret(name: AlgorithmName, len: usize, output_len: usize) {
    if len < output_len {
        tracing::warn!(
            algorithm = %name,
            secret_len = len,
            recommended_len = output_len,
            "HMAC secret is shorter than the hash output"
        );
    }
}

impl Signer {
    /// Creates a signer for the algorithm `name` from the provided key material.
    ///
    /// # Errors
    ///
    /// - [`KeyError::UnsupportedAlgorithm`] for `Ed448` and `Ed448ph`
    /// - [`KeyError::Unsuitable`] if the key cannot be parsed, belongs to another curve,
    ///   or is too weak (RSA moduli shorter than 2048 bits)
    pub fn new(name: AlgorithmName, key: KeySource<'_>) -> Result<Self, KeyError> {
        let inner = match name {
            AlgorithmName::Hs256 => {
                SignerInner::Hs256(Hs256Key::new(hmac_secret(name, key, Hs256::OUTPUT_LEN)?))
            }
            AlgorithmName::Hs384 => {
                SignerInner::Hs384(Hs384Key::new(hmac_secret(name, key, Hs384::OUTPUT_LEN)?))
            }
            AlgorithmName::Hs512 => {
                SignerInner::Hs512(Hs512Key::new(hmac_secret(name, key, Hs512::OUTPUT_LEN)?))
            }
            AlgorithmName::Rs256
            | AlgorithmName::Rs384
            | AlgorithmName::Rs512
            | AlgorithmName::Ps256
            | AlgorithmName::Ps384
            | AlgorithmName::Ps512 => {
                let rsa = name.rsa().ok_or(KeyError::UnsupportedAlgorithm(name))?;
                let material = load_key::<Rsa>(name, key)?;
                let modulus_check = match &material {
                    KeyMaterial::Signing(key) => Rsa::check_modulus(key),
                    KeyMaterial::Verifying(key) => Rsa::check_modulus(key),
                };
                modulus_check.map_err(|reason| KeyError::unsuitable(name, reason))?;
                SignerInner::Rsa(rsa, material)
            }
            AlgorithmName::Es256 => SignerInner::Es256(load_key(name, key)?),
            AlgorithmName::Es384 => SignerInner::Es384(load_key(name, key)?),
            AlgorithmName::Es512 => SignerInner::Es512(load_key(name, key)?),
            AlgorithmName::Ed25519 => SignerInner::Ed25519(Ed25519::new(), load_key(name, key)?),
            AlgorithmName::Ed25519ph => {
                SignerInner::Ed25519(Ed25519::prehashed(), load_key(name, key)?)
            }
            AlgorithmName::Ed448 | AlgorithmName::Ed448ph => {
                return Err(KeyError::UnsupportedAlgorithm(name));
            }
            AlgorithmName::None => return Ok(Self::none()),
        };

        let signer = Self { name, inner };
        tracing::debug!(algorithm = %name, can_sign = signer.can_sign(), "created signer");
        Ok(signer)
    }

    /// Creates a signer from serializable settings.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::UnknownAlgorithm`] if the algorithm name is not recognized,
    /// [`KeyError::MissingKey`] if no key is provided for an algorithm other than `none`,
    /// and other errors as per [`Self::new()`].
    pub fn from_config(config: &SignerConfig) -> Result<Self, KeyError> {
        let name: AlgorithmName = config.signer_alg.parse()?;
        let key = if let Some(pem) = &config.key_pem {
            KeySource::Pem(pem)
        } else if let Some(octet) = &config.key_octet {
            KeySource::Octet(octet.as_bytes())
        } else if name == AlgorithmName::None {
            KeySource::Octet(&[])
        } else {
            return Err(KeyError::MissingKey(name));
        };
        Self::new(name, key)
    }

    /// Creates an `HS256` signer.
    pub fn hs256(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        warn_weak_secret(AlgorithmName::Hs256, secret.len(), Hs256::OUTPUT_LEN);
        Self::hmac(AlgorithmName::Hs256, SignerInner::Hs256(Hs256Key::new(secret)))
    }

    /// Creates an `HS384` signer.
    pub fn hs384(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        warn_weak_secret(AlgorithmName::Hs384, secret.len(), Hs384::OUTPUT_LEN);
        Self::hmac(AlgorithmName::Hs384, SignerInner::Hs384(Hs384Key::new(secret)))
    }

    /// Creates an `HS512` signer.
    pub fn hs512(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        warn_weak_secret(AlgorithmName::Hs512, secret.len(), Hs512::OUTPUT_LEN);
        Self::hmac(AlgorithmName::Hs512, SignerInner::Hs512(Hs512Key::new(secret)))
    }

    fn hmac(name: AlgorithmName, inner: SignerInner) -> Self {
        tracing::debug!(algorithm = %name, "created signer");
        Self { name, inner }
    }

    /// Creates a signer for unsecured tokens. Such tokens carry no integrity protection;
    /// use only if the token is protected by other means.
    pub fn none() -> Self {
        tracing::warn!("created signer for insecure `none` algorithm");
        Self {
            name: AlgorithmName::None,
            inner: SignerInner::None,
        }
    }

    /// Returns the algorithm of this signer.
    pub fn algorithm(&self) -> AlgorithmName {
        self.name
    }

    /// Checks whether this signer holds a key able to produce signatures.
    pub fn can_sign(&self) -> bool {
        match &self.inner {
            SignerInner::Hs256(_)
            | SignerInner::Hs384(_)
            | SignerInner::Hs512(_)
            | SignerInner::None => true,
            SignerInner::Rsa(_, key) => key.signing_key().is_some(),
            SignerInner::Es256(key) => key.signing_key().is_some(),
            SignerInner::Es384(key) => key.signing_key().is_some(),
            SignerInner::Es512(key) => key.signing_key().is_some(),
            SignerInner::Ed25519(_, key) => key.signing_key().is_some(),
        }
    }

    /// Signs `message` and returns the raw signature bytes.
    ///
    /// # Errors
    ///
    /// Fails if the signer only holds a public key, or if the crypto backend fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CreationError> {
        let result = match &self.inner {
            SignerInner::Hs256(key) => Hs256.sign_bytes(key, message),
            SignerInner::Hs384(key) => Hs384.sign_bytes(key, message),
            SignerInner::Hs512(key) => Hs512.sign_bytes(key, message),
            SignerInner::Rsa(rsa, key) => sign_with(rsa, key, message),
            SignerInner::Es256(key) => sign_with(&Es256, key, message),
            SignerInner::Es384(key) => sign_with(&Es384, key, message),
            SignerInner::Es512(key) => sign_with(&Es512, key, message),
            SignerInner::Ed25519(alg, key) => sign_with(alg, key, message),
            SignerInner::None => {
                tracing::warn!("signing token with insecure `none` algorithm");
                NoneAlg.sign_bytes(&(), message)
            }
        };
        result.map_err(|reason| CreationError::Signing {
            algorithm: self.name,
            reason,
        })
    }

    /// Verifies `signature` for `message` using the algorithm of this signer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSignature`] on mismatch, or another signature-related
    /// error if the signature has an invalid length or cannot be parsed.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), ValidationError> {
        match &self.inner {
            SignerInner::Hs256(key) => Hs256.verify_bytes(key, message, signature),
            SignerInner::Hs384(key) => Hs384.verify_bytes(key, message, signature),
            SignerInner::Hs512(key) => Hs512.verify_bytes(key, message, signature),
            SignerInner::Rsa(rsa, key) => {
                key.with_verifying_key(|key| rsa.verify_bytes(key, message, signature))
            }
            SignerInner::Es256(key) => {
                key.with_verifying_key(|key| Es256.verify_bytes(key, message, signature))
            }
            SignerInner::Es384(key) => {
                key.with_verifying_key(|key| Es384.verify_bytes(key, message, signature))
            }
            SignerInner::Es512(key) => {
                key.with_verifying_key(|key| Es512.verify_bytes(key, message, signature))
            }
            SignerInner::Ed25519(alg, key) => {
                key.with_verifying_key(|key| alg.verify_bytes(key, message, signature))
            }
            SignerInner::None => {
                tracing::warn!("verifying token with insecure `none` algorithm");
                NoneAlg.verify_bytes(&(), message, signature)
            }
        }
    }
}

fn sign_with<A>(alg: &A, key: &KeyMaterial<A>, message: &[u8]) -> anyhow::Result<Vec<u8>>
where
    A: Algorithm,
    A::SigningKey: SigningKey<A>,
    A::VerifyingKey: VerifyingKey<A>,
{
    let signing_key = key
        .signing_key()
        .ok_or_else(|| anyhow::anyhow!("signer holds a verifying key only"))?;
    alg.sign_bytes(signing_key, message)
}

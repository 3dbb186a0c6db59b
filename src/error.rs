//! Error handling.

use core::fmt;

use crate::signer::AlgorithmName;

#[cfg(feature = "ciborium")]
pub(crate) type CborDeError = ciborium::de::Error<std::io::Error>;
#[cfg(feature = "ciborium")]
pub(crate) type CborSerError = ciborium::ser::Error<std::io::Error>;

/// Errors that may occur during token parsing.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// Token has invalid structure.
    ///
    /// Valid tokens must consist of 3 base64url-encoded parts (header, claims, and signature)
    /// separated by periods.
    InvalidTokenStructure,
    /// Cannot decode base64.
    InvalidBase64Encoding,
    /// Token header cannot be parsed.
    MalformedHeader(serde_json::Error),
    /// Token header is valid JSON, but is not a JSON object.
    HeaderNotAnObject,
    /// [Content type][cty] mentioned in the token header is not supported.
    ///
    /// Supported content types are JSON (used by default) and CBOR (only if the `ciborium`
    /// crate feature is enabled, which it is by default).
    ///
    /// [cty]: https://tools.ietf.org/html/rfc7515#section-4.1.10
    UnsupportedContentType(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTokenStructure => formatter.write_str("Invalid token structure"),
            Self::InvalidBase64Encoding => write!(formatter, "base64 decoding error"),
            Self::MalformedHeader(err) => write!(formatter, "Malformed token header: {err}"),
            Self::HeaderNotAnObject => formatter.write_str("Token header is not a JSON object"),
            Self::UnsupportedContentType(ty) => {
                write!(formatter, "Unsupported content type: {ty}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedHeader(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that can occur during token verification and claim validation.
#[derive(Debug)]
#[non_exhaustive]
pub enum ValidationError {
    /// Token signature has invalid byte length.
    InvalidSignatureLen {
        /// Expected signature length.
        expected: usize,
        /// Actual signature length.
        actual: usize,
    },
    /// Token signature is malformed.
    MalformedSignature(anyhow::Error),
    /// Token signature has failed verification.
    InvalidSignature,
    /// Token claims cannot be deserialized from JSON.
    MalformedClaims(serde_json::Error),
    /// Token claims cannot be deserialized from CBOR.
    #[cfg(feature = "ciborium")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ciborium")))]
    MalformedCborClaims(CborDeError),
    /// Token claims are well-formed, but are not a JSON object.
    ClaimsNotAnObject,
    /// A claim validator has rejected the token. Only the first failing claim is reported.
    Claim {
        /// Name of the rejected claim.
        claim: String,
        /// Human-readable message produced by the validator.
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignatureLen { expected, actual } => write!(
                formatter,
                "Invalid signature length: expected {expected} bytes, got {actual} bytes"
            ),
            Self::MalformedSignature(err) => write!(formatter, "Malformed token signature: {err}"),
            Self::InvalidSignature => formatter.write_str("Invalid signature"),
            Self::MalformedClaims(err) => write!(formatter, "Cannot deserialize claims: {err}"),
            #[cfg(feature = "ciborium")]
            Self::MalformedCborClaims(err) => write!(formatter, "Cannot deserialize claims: {err}"),
            Self::ClaimsNotAnObject => formatter.write_str("Token claims are not a JSON object"),
            Self::Claim { message, .. } => formatter.write_str(message),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedSignature(err) => Some(err.as_ref()),
            Self::MalformedClaims(err) => Some(err),
            #[cfg(feature = "ciborium")]
            Self::MalformedCborClaims(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that can occur during token creation.
#[derive(Debug)]
#[non_exhaustive]
pub enum CreationError {
    /// Token header cannot be serialized.
    Header(serde_json::Error),
    /// Token claims cannot be serialized into JSON.
    Claims(serde_json::Error),
    /// Token claims cannot be serialized into CBOR.
    #[cfg(feature = "ciborium")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ciborium")))]
    CborClaims(CborSerError),
    /// Structured claims passed to the builder do not serialize to a JSON object.
    ClaimsNotAnObject,
    /// Neither the token nor the configuration provides a [`Signer`](crate::Signer).
    NoSigner,
    /// The cryptographic backend has failed to produce a signature, e.g., because
    /// the signer only holds a verifying key.
    Signing {
        /// Algorithm that has failed.
        algorithm: AlgorithmName,
        /// Underlying reason.
        reason: anyhow::Error,
    },
}

impl fmt::Display for CreationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(err) => write!(formatter, "Cannot serialize header: {err}"),
            Self::Claims(err) => write!(formatter, "Cannot serialize claims: {err}"),
            #[cfg(feature = "ciborium")]
            Self::CborClaims(err) => write!(formatter, "Cannot serialize claims into CBOR: {err}"),
            Self::ClaimsNotAnObject => {
                formatter.write_str("Claims must serialize to a JSON object")
            }
            Self::NoSigner => formatter.write_str("No signer configured"),
            Self::Signing { algorithm, reason } => {
                write!(formatter, "Cannot sign token with {algorithm}: {reason}")
            }
        }
    }
}

impl std::error::Error for CreationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Header(err) | Self::Claims(err) => Some(err),
            #[cfg(feature = "ciborium")]
            Self::CborClaims(err) => Some(err),
            Self::Signing { reason, .. } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

/// Errors that can occur when creating a [`Signer`](crate::Signer) from key material.
#[derive(Debug)]
#[non_exhaustive]
pub enum KeyError {
    /// Algorithm name is not recognized.
    UnknownAlgorithm(String),
    /// Algorithm is recognized, but has no cryptographic backend in this crate.
    UnsupportedAlgorithm(AlgorithmName),
    /// Key material is missing from the signer configuration.
    MissingKey(AlgorithmName),
    /// Key material cannot be used with the algorithm (e.g., wrong curve or key length).
    Unsuitable {
        /// Algorithm for which the key was supplied.
        algorithm: AlgorithmName,
        /// Underlying reason.
        reason: anyhow::Error,
    },
}

impl KeyError {
    pub(crate) fn unsuitable(algorithm: AlgorithmName, reason: anyhow::Error) -> Self {
        Self::Unsuitable { algorithm, reason }
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(formatter, "Unknown algorithm: {name}"),
            Self::UnsupportedAlgorithm(alg) => {
                write!(formatter, "Algorithm {alg} is not supported")
            }
            Self::MissingKey(alg) => write!(formatter, "No key material provided for {alg}"),
            Self::Unsuitable { algorithm, reason } => {
                write!(formatter, "Key is unsuitable for {algorithm}: {reason}")
            }
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unsuitable { reason, .. } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

/// Umbrella error returned by the call-level entry points, such as
/// [`TokenConfig::decode_token()`](crate::TokenConfig::decode_token()).
///
/// The `Display` implementation provides a single human-readable message describing
/// the first encountered failure.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Compact token is malformed.
    Parse(ParseError),
    /// Token could not be created.
    Creation(CreationError),
    /// Token has failed verification or validation.
    Validation(ValidationError),
    /// Key material is invalid.
    Key(KeyError),
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => fmt::Display::fmt(err, formatter),
            Self::Creation(err) => fmt::Display::fmt(err, formatter),
            Self::Validation(err) => fmt::Display::fmt(err, formatter),
            Self::Key(err) => fmt::Display::fmt(err, formatter),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Creation(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Key(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<CreationError> for Error {
    fn from(err: CreationError) -> Self {
        Self::Creation(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        Self::Key(err)
    }
}

//! `Token` builder, compact serialization and the sign / verify pipeline.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Duration;
use serde::{de::Error as _, Serialize};
use serde_json::{Map, Value};
use smallvec::{smallvec, SmallVec};

use std::fmt;

use crate::{
    generator::{self, DEFAULT_TTL_SECS},
    validator::run_validators,
    Claims, CreationError, Error, Generators, ParseError, Signer, TimeOptions, ValidateClaims,
    ValidationError, ValidationOptions, Validators,
};

/// Maximum "reasonable" signature size in bytes.
const SIGNATURE_SIZE: usize = 128;

/// Encoding of the token claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Codec {
    /// JSON encoding, as per the JWT spec.
    #[default]
    Json,
    /// Compact [CBOR] encoding. Tokens encoded this way have the `cty` header field set
    /// to `"CBOR"`, and are not understood by most other JWT implementations.
    ///
    /// [CBOR]: https://www.rfc-editor.org/rfc/rfc8949.html
    #[cfg(feature = "ciborium")]
    #[cfg_attr(docsrs, doc(cfg(feature = "ciborium")))]
    Cbor,
}

impl Codec {
    fn encode_claims(self, claims: &Claims) -> Result<Vec<u8>, CreationError> {
        match self {
            Self::Json => serde_json::to_vec(claims).map_err(CreationError::Claims),
            #[cfg(feature = "ciborium")]
            Self::Cbor => {
                let mut buffer = vec![];
                ciborium::into_writer(claims, &mut buffer).map_err(CreationError::CborClaims)?;
                Ok(buffer)
            }
        }
    }

    fn decode_claims(self, raw: &[u8]) -> Result<Claims, ValidationError> {
        let value: Value = match self {
            Self::Json => serde_json::from_slice(raw).map_err(ValidationError::MalformedClaims)?,
            #[cfg(feature = "ciborium")]
            Self::Cbor => ciborium::from_reader(raw).map_err(ValidationError::MalformedCborClaims)?,
        };
        Claims::from_value(value)
    }
}

/// Builder of a token, holding everything needed to sign it.
///
/// `Token` is immutable by replacement: builder methods consume the token and return
/// an updated one. Claim generators are only invoked during signing, and their values
/// always overwrite literal claims with the same name. Validators are only used
/// during verification.
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::{Signer, Token, ValidationOptions};
/// # use serde_json::json;
/// # fn main() -> anyhow::Result<()> {
/// let signer = Signer::hs256(b"super_secret_key_donut_steel");
/// let token = Token::new()
///     .with_sub("alice")
///     .with_claim("admin", false)
///     .with_exp()
///     .with_signer(signer);
/// let signed = token.sign()?;
///
/// let claims = token.verify(signed.as_str(), &ValidationOptions::default())?;
/// assert_eq!(claims["sub"], json!("alice"));
/// assert!(claims.timestamp("exp").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Token {
    header: Map<String, Value>,
    claims: Claims,
    generators: Generators,
    validators: Validators,
    signer: Option<Signer>,
    codec: Codec,
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Token {
    /// Creates a token with the `{"typ": "JWT"}` header and no claims.
    pub fn new() -> Self {
        Self {
            header: default_header(),
            claims: Claims::new(),
            generators: Generators::new(),
            validators: Validators::new(),
            signer: None,
            codec: Codec::Json,
        }
    }

    /// Returns the header of the token. The `alg` field is only added during signing.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Returns literal claims of the token, i.e., claims without generated values.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Returns claim generators attached to the token.
    pub fn generators(&self) -> &Generators {
        &self.generators
    }

    /// Returns validators attached to the token.
    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    /// Returns the signer attached to the token, if any.
    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    /// Sets a single claim.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "Claim name must be non-empty");
        self.claims.insert(name, value);
        self
    }

    /// Replaces all literal claims.
    #[must_use]
    pub fn with_claims(mut self, claims: Claims) -> Self {
        self.claims = claims;
        self
    }

    /// Replaces all literal claims with a structured value, such as a struct deriving
    /// `Serialize`.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be serialized or does not serialize to an object.
    pub fn with_claims_from<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, CreationError> {
        Ok(self.with_claims(Claims::from_serializable(value)?))
    }

    /// Registers a generator for `exp` producing the signing time plus 2 hours.
    #[must_use]
    pub fn with_exp(self) -> Self {
        let ttl = Duration::seconds(DEFAULT_TTL_SECS);
        self.with_claim_generator("exp", generator::expiration(ttl, TimeOptions::default()))
    }

    /// Sets `exp` to the specified timestamp.
    #[must_use]
    pub fn with_exp_at(self, timestamp: i64) -> Self {
        self.with_claim("exp", timestamp)
    }

    /// Registers a generator for `iat` producing the signing time.
    #[must_use]
    pub fn with_iat(self) -> Self {
        self.with_claim_generator("iat", generator::issued_at(TimeOptions::default()))
    }

    /// Sets `iat` to the specified timestamp.
    #[must_use]
    pub fn with_iat_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", timestamp)
    }

    /// Registers a generator for `nbf` producing the signing time minus 1 second.
    #[must_use]
    pub fn with_nbf(self) -> Self {
        self.with_claim_generator("nbf", generator::not_before(TimeOptions::default()))
    }

    /// Sets `nbf` to the specified timestamp.
    #[must_use]
    pub fn with_nbf_at(self, timestamp: i64) -> Self {
        self.with_claim("nbf", timestamp)
    }

    /// Sets the issuer (`iss`) claim.
    #[must_use]
    pub fn with_iss(self, issuer: impl Into<Value>) -> Self {
        self.with_claim("iss", issuer)
    }

    /// Sets the subject (`sub`) claim.
    #[must_use]
    pub fn with_sub(self, subject: impl Into<Value>) -> Self {
        self.with_claim("sub", subject)
    }

    /// Sets the audience (`aud`) claim.
    #[must_use]
    pub fn with_aud(self, audience: impl Into<Value>) -> Self {
        self.with_claim("aud", audience)
    }

    /// Sets the token ID (`jti`) claim.
    #[must_use]
    pub fn with_jti(self, id: impl Into<Value>) -> Self {
        self.with_claim("jti", id)
    }

    /// Sets a single header field. `alg` is always overwritten during signing.
    #[must_use]
    pub fn with_header_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    /// Replaces the header. If the new header has no `typ` field, `typ: "JWT"` is still
    /// added during signing.
    #[must_use]
    pub fn with_header_args(mut self, header: Map<String, Value>) -> Self {
        self.header = header;
        self
    }

    /// Attaches a signer to the token.
    #[must_use]
    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Registers a generator for the claim.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn with_claim_generator<F>(mut self, name: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.generators.insert(name, generator);
        self
    }

    /// Registers a validator for the claim. The validator receives the claim value,
    /// the whole payload and the caller-supplied options.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn with_validator<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &Claims, &ValidationOptions) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.insert(name, validator);
        self
    }

    /// Registers a simple predicate over the claim value.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn with_validation<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators = self.validators.with_predicate(name, predicate);
        self
    }

    /// Sets the codec for claims.
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the claims as they would be signed right now: literal claims overwritten
    /// by the generated ones.
    pub fn generate_claims(&self) -> Claims {
        let mut claims = self.claims.clone();
        self.generators.apply(&mut claims);
        claims
    }

    /// Signs the token with the attached signer.
    ///
    /// # Errors
    ///
    /// Returns [`CreationError::NoSigner`] if no signer is attached, or an error
    /// from encoding / signing.
    pub fn sign(&self) -> Result<SignedToken, CreationError> {
        let signer = self.signer.as_ref().ok_or(CreationError::NoSigner)?;
        self.sign_inner(signer)
    }

    /// Signs the token with the attached signer, or with `default_signer` if no signer
    /// is attached.
    pub fn sign_with(&self, default_signer: &Signer) -> Result<SignedToken, CreationError> {
        self.sign_inner(self.signer.as_ref().unwrap_or(default_signer))
    }

    fn sign_inner(&self, signer: &Signer) -> Result<SignedToken, CreationError> {
        let claims = self.generate_claims();
        SignedToken::new(self.header.clone(), claims, signer, self.codec)
    }

    /// Verifies a compact token with the attached signer and validators.
    ///
    /// # Errors
    ///
    /// Returns [`CreationError::NoSigner`] (wrapped into [`Error`]) if no signer is attached,
    /// and any parsing, signature or claim validation error.
    pub fn verify(&self, compact: &str, options: &ValidationOptions) -> Result<Claims, Error> {
        let signer = self.signer.as_ref().ok_or(CreationError::NoSigner)?;
        verify_compact(compact, signer, &self.validators, options)
    }

    /// Verifies a compact token with the attached signer (or `default_signer` if no signer
    /// is attached) and validators.
    pub fn verify_with(
        &self,
        compact: &str,
        default_signer: &Signer,
        options: &ValidationOptions,
    ) -> Result<Claims, Error> {
        let signer = self.signer.as_ref().unwrap_or(default_signer);
        verify_compact(compact, signer, &self.validators, options)
    }

    /// Returns the header of a compact token **without** verifying it.
    ///
    /// The result is untrusted; it may be used to choose the verifying key, but never as
    /// a source of truth.
    pub fn peek_header(compact: &str) -> Result<Map<String, Value>, ParseError> {
        UntrustedToken::new(compact).map(|token| token.header)
    }

    /// Returns the claims of a compact token **without** verifying its signature or running
    /// any validators.
    ///
    /// The returned claims are untrusted: anyone can produce a token with arbitrary claims.
    pub fn peek_claims(compact: &str) -> Result<Claims, Error> {
        let token = UntrustedToken::new(compact)?;
        Ok(token.claims_unverified()?)
    }
}

pub(crate) fn default_header() -> Map<String, Value> {
    let mut header = Map::new();
    header.insert("typ".to_owned(), "JWT".into());
    header
}

/// Verifies `compact` with `signer` and then validates the claims with `validators`.
///
/// The algorithm of `signer` is always used; the `alg` field in the token header is ignored.
/// Neither the header nor the claims are decoded before the signature is verified, so
/// tampering with any part of the token is reported as a signature error.
///
/// # Errors
///
/// Returns the first encountered error: a parsing error, a signature verification error,
/// a claims decoding error, or a [`ValidationError::Claim`] from the first failed validator.
pub fn verify_compact<V: ValidateClaims + ?Sized>(
    compact: &str,
    signer: &Signer,
    validators: &V,
    options: &ValidationOptions,
) -> Result<Claims, Error> {
    let parts = TokenParts::split(compact)?;
    let algorithm = signer.algorithm();
    signer.verify(parts.signed_data, &parts.signature)?;

    let token = parts.parse_header()?;
    token.check_algorithm(algorithm.as_str());
    tracing::debug!(%algorithm, "verified token signature");
    let claims = token.claims_unverified()?;

    run_validators(validators, &claims, options).map_err(|(claim, message)| {
        tracing::debug!(claim = %claim, "claim validation failed");
        ValidationError::Claim { claim, message }
    })?;
    Ok(claims)
}

/// Signed token in the compact form, together with its header and claims.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedToken {
    compact: String,
    header: Map<String, Value>,
    claims: Claims,
}

impl SignedToken {
    pub(crate) fn new(
        mut header: Map<String, Value>,
        claims: Claims,
        signer: &Signer,
        codec: Codec,
    ) -> Result<Self, CreationError> {
        let algorithm = signer.algorithm();
        header.insert("alg".to_owned(), algorithm.as_str().into());
        header.entry("typ").or_insert_with(|| Value::from("JWT"));
        #[cfg(feature = "ciborium")]
        if codec == Codec::Cbor {
            header.insert("cty".to_owned(), "CBOR".into());
        }

        let serialized_header = serde_json::to_vec(&header).map_err(CreationError::Header)?;
        let serialized_claims = codec.encode_claims(&claims)?;

        let mut compact = Base64UrlUnpadded::encode_string(&serialized_header);
        compact.push('.');
        compact.push_str(&Base64UrlUnpadded::encode_string(&serialized_claims));
        let signature = signer.sign(compact.as_bytes())?;
        compact.push('.');
        compact.push_str(&Base64UrlUnpadded::encode_string(&signature));

        tracing::debug!(%algorithm, ?codec, claims = claims.len(), "signed token");
        Ok(Self {
            compact,
            header,
            claims,
        })
    }

    /// Returns the compact form of the token.
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// Returns the header with `alg` filled in.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Returns the signed claims, including generated ones.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Converts this token into its compact form.
    pub fn into_string(self) -> String {
        self.compact
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.compact)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.compact
    }
}

/// Parsed, but unverified token.
///
/// Nothing in an `UntrustedToken` should be relied upon before its signature is verified.
#[derive(Debug, Clone)]
pub struct UntrustedToken<'a> {
    signed_data: &'a [u8],
    header: Map<String, Value>,
    algorithm: String,
    codec: Codec,
    serialized_claims: Vec<u8>,
    signature: SmallVec<[u8; SIGNATURE_SIZE]>,
}

/// Compact token split into its segments, with the header not parsed yet.
struct TokenParts<'a> {
    signed_data: &'a [u8],
    serialized_header: Vec<u8>,
    serialized_claims: Vec<u8>,
    signature: SmallVec<[u8; SIGNATURE_SIZE]>,
}

impl<'a> TokenParts<'a> {
    fn split(s: &'a str) -> Result<Self, ParseError> {
        let token_parts: Vec<_> = s.splitn(4, '.').collect();
        let &[header, claims, signature] = &token_parts[..] else {
            return Err(ParseError::InvalidTokenStructure);
        };

        let signed_data = &s[..header.len() + 1 + claims.len()];
        let serialized_header = Base64UrlUnpadded::decode_vec(header)
            .map_err(|_| ParseError::InvalidBase64Encoding)?;
        let serialized_claims = Base64UrlUnpadded::decode_vec(claims)
            .map_err(|_| ParseError::InvalidBase64Encoding)?;
        let mut decoded_signature = smallvec![0; 3 * (signature.len() + 3) / 4];
        let signature_len = Base64UrlUnpadded::decode(signature, &mut decoded_signature[..])
            .map_err(|_| ParseError::InvalidBase64Encoding)?
            .len();
        decoded_signature.truncate(signature_len);

        Ok(Self {
            signed_data: signed_data.as_bytes(),
            serialized_header,
            serialized_claims,
            signature: decoded_signature,
        })
    }

    fn parse_header(self) -> Result<UntrustedToken<'a>, ParseError> {
        let header: Value =
            serde_json::from_slice(&self.serialized_header).map_err(ParseError::MalformedHeader)?;
        let Value::Object(header) = header else {
            return Err(ParseError::HeaderNotAnObject);
        };
        let algorithm = match header.get("alg") {
            Some(Value::String(alg)) => alg.clone(),
            Some(_) => {
                let err = serde_json::Error::custom("`alg` field must be a string");
                return Err(ParseError::MalformedHeader(err));
            }
            None => {
                let err = serde_json::Error::missing_field("alg");
                return Err(ParseError::MalformedHeader(err));
            }
        };
        let codec = match header.get("cty") {
            None => Codec::Json,
            Some(Value::String(cty)) if cty.eq_ignore_ascii_case("json") => Codec::Json,
            #[cfg(feature = "ciborium")]
            Some(Value::String(cty)) if cty.eq_ignore_ascii_case("cbor") => Codec::Cbor,
            Some(Value::String(cty)) => {
                return Err(ParseError::UnsupportedContentType(cty.clone()));
            }
            Some(_) => {
                let err = serde_json::Error::custom("`cty` field must be a string");
                return Err(ParseError::MalformedHeader(err));
            }
        };

        Ok(UntrustedToken {
            signed_data: self.signed_data,
            header,
            algorithm,
            codec,
            serialized_claims: self.serialized_claims,
            signature: self.signature,
        })
    }
}

impl<'a> TryFrom<&'a str> for UntrustedToken<'a> {
    type Error = ParseError;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        TokenParts::split(s)?.parse_header()
    }
}

impl<'a> UntrustedToken<'a> {
    /// Parses a compact token. This is a shortcut for calling the [`TryFrom`] conversion.
    pub fn new<S: AsRef<str> + ?Sized>(s: &'a S) -> Result<Self, ParseError> {
        Self::try_from(s.as_ref())
    }

    /// Gets the token header.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Gets the algorithm claimed by the token header. This value is informational only;
    /// it is never used to choose the verification algorithm.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Gets the claims codec specified by the `cty` header field.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Returns signature bytes from the token. These bytes are **not** guaranteed to form
    /// a valid signature.
    pub fn signature_bytes(&self) -> &[u8] {
        &self.signature
    }

    /// Verifies the token signature using the algorithm and key of `signer`.
    pub fn verify_signature(&self, signer: &Signer) -> Result<(), ValidationError> {
        let algorithm = signer.algorithm();
        self.check_algorithm(algorithm.as_str());
        signer.verify(self.signed_data, &self.signature)?;
        tracing::debug!(%algorithm, "verified token signature");
        Ok(())
    }

    fn check_algorithm(&self, algorithm: &str) {
        if self.algorithm != algorithm {
            tracing::debug!(
                header_alg = %self.algorithm,
                algorithm,
                "token header specifies another algorithm; using the configured one"
            );
        }
    }

    /// Decodes the claims **without** checking the signature.
    pub fn claims_unverified(&self) -> Result<Claims, ValidationError> {
        self.codec.decode_claims(&self.serialized_claims)
    }
}

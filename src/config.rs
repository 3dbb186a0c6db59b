//! Injected token configuration: signer, claim generators, validators and codec.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use std::mem;

use crate::{
    generator::{self, DEFAULT_TTL_SECS},
    token::{default_header, verify_compact, SignedToken},
    Claims, Codec, CreationError, Error, Generators, Signer, TimeOptions, ValidationOptions,
    Validators,
};

/// Standard claims registered by [`TokenConfig::with_default_claims()`].
///
/// Registers generators for `exp` (signing time plus `ttl`), `iat` (signing time),
/// `nbf` (signing time minus 1 second) and `jti` (random ID), and validators for `exp`,
/// `iat` and `nbf`. If `issuer` / `audience` are set, the `iss` / `aud` claims are generated
/// and required to be equal to the configured values. Claims listed in `skip` are
/// not registered at all.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DefaultClaims {
    /// Lifetime of issued tokens. 2 hours by default.
    pub ttl: Duration,
    /// Expected issuer (`iss` claim).
    pub issuer: Option<String>,
    /// Expected audience (`aud` claim).
    pub audience: Option<String>,
    /// Claims that should not be generated or validated.
    pub skip: Vec<String>,
    /// Clock and leeway for time-based claims.
    pub time: TimeOptions,
}

impl Default for DefaultClaims {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            issuer: None,
            audience: None,
            skip: Vec::new(),
            time: TimeOptions::default(),
        }
    }
}

impl DefaultClaims {
    /// Sets the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Excludes a claim from generation and validation.
    #[must_use]
    pub fn skip(mut self, claim: impl Into<String>) -> Self {
        self.skip.push(claim.into());
        self
    }

    /// Sets the clock and leeway for time-based claims.
    #[must_use]
    pub fn with_time_options(mut self, time: TimeOptions) -> Self {
        self.time = time;
        self
    }

    fn is_skipped(&self, claim: &str) -> bool {
        self.skip.iter().any(|skipped| skipped == claim)
    }

    fn register(&self, generators: &mut Generators, validators: &mut Validators) {
        let time = self.time;
        let enabled = |claim: &str| !self.is_skipped(claim);

        if enabled("exp") {
            generators.insert("exp", generator::expiration(self.ttl, time));
        }
        if enabled("iat") {
            generators.insert("iat", generator::issued_at(time));
        }
        if enabled("nbf") {
            generators.insert("nbf", generator::not_before(time));
        }
        if enabled("jti") {
            generators.insert("jti", generator::token_id);
        }
        let issuer = self.issuer.clone().filter(|_| enabled("iss"));
        let audience = self.audience.clone().filter(|_| enabled("aud"));

        let mut registered = mem::take(validators);
        if enabled("exp") {
            registered = registered.with_expiration(time);
        }
        if enabled("iat") {
            registered = registered.with_issuance(time);
        }
        if enabled("nbf") {
            registered = registered.with_maturity(time);
        }
        if let Some(issuer) = issuer {
            registered = registered.with_expected("iss", issuer.as_str());
            generators.insert("iss", move || Value::from(issuer.as_str()));
        }
        if let Some(audience) = audience {
            registered = registered.with_expected("aud", audience.as_str());
            generators.insert("aud", move || Value::from(audience.as_str()));
        }
        *validators = registered;
    }
}

/// Explicitly injected configuration for issuing and verifying tokens.
///
/// The configuration is read-only during signing and verification, so it can be shared
/// among threads (e.g., wrapped in an `Arc`).
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::{DefaultClaims, Signer, TokenConfig, ValidationOptions};
/// # use serde_json::json;
/// # fn main() -> anyhow::Result<()> {
/// let config = TokenConfig::new(Signer::hs256(b"super_secret_key_donut_steel"))
///     .with_default_claims(&DefaultClaims::default().with_issuer("my-app"))
///     .add_claim(
///         "user_id",
///         || json!(42),
///         |value, _, options| match options.get("user_id") {
///             Some(expected) if expected != value => Err("Wrong user".to_owned()),
///             _ => Ok(()),
///         },
///     );
///
/// let token = config.encode_token(&json!({ "role": "admin" }))?;
/// let options = ValidationOptions::default().with("user_id", 42);
/// let claims = config.decode_token(&token, &options)?;
/// assert_eq!(claims["iss"], json!("my-app"));
/// assert_eq!(claims["role"], json!("admin"));
///
/// let options = ValidationOptions::default().with("user_id", 5);
/// let err = config.decode_token(&token, &options).unwrap_err();
/// assert_eq!(err.to_string(), "Wrong user");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenConfig {
    signer: Signer,
    generators: Generators,
    validators: Validators,
    codec: Codec,
}

impl TokenConfig {
    /// Creates a configuration with the specified signer, no generators or validators,
    /// and JSON codec.
    pub fn new(signer: Signer) -> Self {
        Self {
            signer,
            generators: Generators::new(),
            validators: Validators::new(),
            codec: Codec::Json,
        }
    }

    /// Returns the signer.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Returns registered claim generators.
    pub fn generators(&self) -> &Generators {
        &self.generators
    }

    /// Returns registered claim validators.
    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    /// Returns the claims codec.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Adds generators, replacing ones registered for the same claims.
    #[must_use]
    pub fn with_generators(mut self, generators: &Generators) -> Self {
        self.generators.extend(generators);
        self
    }

    /// Adds validators, replacing ones registered for the same claims.
    #[must_use]
    pub fn with_validators(mut self, validators: &Validators) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Sets the claims codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Registers the standard claims.
    #[must_use]
    pub fn with_default_claims(mut self, defaults: &DefaultClaims) -> Self {
        defaults.register(&mut self.generators, &mut self.validators);
        self
    }

    /// Registers both a generator and a validator for `claim`.
    ///
    /// # Panics
    ///
    /// Panics if `claim` is empty.
    #[must_use]
    pub fn add_claim<G, V>(mut self, claim: impl Into<String>, generator: G, validator: V) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
        V: Fn(&Value, &Claims, &ValidationOptions) -> Result<(), String> + Send + Sync + 'static,
    {
        let claim = claim.into();
        self.generators.insert(claim.clone(), generator);
        self.validators.insert(claim, validator);
        self
    }

    /// Runs all generators on top of `extra` claims without signing. Generated values
    /// overwrite `extra` claims with the same name.
    pub fn generate_claims(&self, extra: Claims) -> Claims {
        let mut claims = extra;
        self.generators.apply(&mut claims);
        claims
    }

    /// Generates claims on top of `extra` ones and signs the resulting token.
    pub fn generate_and_sign(&self, extra: Claims) -> Result<SignedToken, CreationError> {
        let claims = self.generate_claims(extra);
        SignedToken::new(default_header(), claims, &self.signer, self.codec)
    }

    /// Encodes a token with claims from `extra` (any value serializing to an object)
    /// plus generated claims, and returns its compact form.
    ///
    /// # Errors
    ///
    /// Fails if `extra` cannot be converted to a claim set, or if encoding / signing fails.
    pub fn encode_token<T: Serialize + ?Sized>(&self, extra: &T) -> Result<String, Error> {
        let extra = Claims::from_serializable(extra)?;
        Ok(self.generate_and_sign(extra)?.into_string())
    }

    /// Verifies the signature of a compact token and runs the configured validators.
    ///
    /// # Errors
    ///
    /// Returns the first encountered error; see [`verify_compact()`](crate::verify_compact()).
    pub fn verify_and_validate(
        &self,
        compact: &str,
        options: &ValidationOptions,
    ) -> Result<Claims, Error> {
        verify_compact(compact, &self.signer, &self.validators, options)
    }

    /// Decodes a compact token, returning its claims if the signature is valid and all
    /// validators pass. This is an alias for [`Self::verify_and_validate()`].
    pub fn decode_token(
        &self,
        compact: &str,
        options: &ValidationOptions,
    ) -> Result<Claims, Error> {
        self.verify_and_validate(compact, options)
    }

    /// Same as [`Self::decode_token()`], additionally converting the claims into
    /// a caller-chosen record shape.
    pub fn decode_token_as<T: DeserializeOwned>(
        &self,
        compact: &str,
        options: &ValidationOptions,
    ) -> Result<T, Error> {
        let claims = self.decode_token(compact, options)?;
        Ok(claims.deserialize_into()?)
    }
}

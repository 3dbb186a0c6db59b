//! [JSON web token (JWT)][JWT] construction and verification pipeline with lazy claim
//! generation and per-claim validation.
//!
//! # Design choices
//!
//! - Signing algorithms form a closed set expressed by the [`Signer`] type, which pairs
//!   an [`AlgorithmName`] with key material. The `alg` field of the [JWT header] is filled
//!   automatically during signing; during verification, it is **never** used to choose
//!   the algorithm. The configured signer is always used instead, which eliminates
//!   [algorithm switching attacks][switching].
//! - Claims that must reflect the signing instant (e.g., `exp`, `iat`, `nbf`) are produced
//!   by claim generators, which are invoked exactly once during signing and overwrite
//!   literal claims with the same name.
//! - Claims are validated per claim name with access to the whole payload and to
//!   caller-supplied [`ValidationOptions`]; see [`ValidateClaims`]. Validation only happens
//!   after the signature is verified.
//! - There is no global state. The signer, generators, validators and codec are explicitly
//!   injected as a [`TokenConfig`] or attached to a [`Token`] builder.
//!
//! # Additional features
//!
//! - The crate supports more compact [CBOR] encoding of the claims (the `ciborium` feature,
//!   on by default). The compactly encoded JWTs have [`cty` field] (content type) in their
//!   header set to `"CBOR"`.
//! - Signer settings can be deserialized from any `serde` format via [`SignerConfig`].
//! - Diagnostic events are emitted via [`tracing`]. Key material and token contents
//!   are never logged.
//!
//! ## Supported algorithms
//!
//! | Algorithm(s) | Backend |
//! |--------------|---------|
//! | `HS256`, `HS384`, `HS512` | [`hmac`] + [`sha2`] |
//! | `RS*`, `PS*` (RSA) | [`rsa`], keys of at least 2048 bits |
//! | `ES256`, `ES384`, `ES512` | [`p256`], [`p384`], [`p521`] |
//! | `Ed25519`, `Ed25519ph` | [`ed25519-dalek`] |
//! | `none` | - |
//!
//! `Ed448` and `Ed448ph` algorithm names are recognized, but creating a signer for them fails
//! with [`KeyError::UnsupportedAlgorithm`].
//!
//! [JWT]: https://jwt.io/
//! [switching]: https://auth0.com/blog/critical-vulnerabilities-in-json-web-token-libraries/
//! [JWT header]: https://tools.ietf.org/html/rfc7519#section-5
//! [`cty` field]: https://tools.ietf.org/html/rfc7515#section-4.1.10
//! [CBOR]: https://tools.ietf.org/html/rfc7049
//! [`hmac`]: https://docs.rs/hmac/
//! [`sha2`]: https://docs.rs/sha2/
//! [`rsa`]: https://docs.rs/rsa/
//! [`p256`]: https://docs.rs/p256/
//! [`p384`]: https://docs.rs/p384/
//! [`p521`]: https://docs.rs/p521/
//! [`ed25519-dalek`]: https://docs.rs/ed25519-dalek/
//! [`tracing`]: https://docs.rs/tracing/
//!
//! # Examples
//!
//! Basic JWT lifecycle:
//!
//! ```
//! use jwt_pipeline::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! /// Custom claims encoded in the token.
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct CustomClaims {
//!     /// `sub` is a standard claim which denotes claim subject:
//!     /// https://tools.ietf.org/html/rfc7519#section-4.1.2
//!     #[serde(rename = "sub")]
//!     subject: String,
//!     exp: i64,
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! // Create a symmetric HMAC signer, which will be used both to create and verify tokens.
//! let signer = Signer::hs256(b"super_secret_key_donut_steel");
//! let config = TokenConfig::new(signer)
//!     .with_default_claims(&DefaultClaims::default().with_issuer("my-app"));
//!
//! // Create a token. `exp`, `iat`, `nbf`, `jti` and `iss` claims are generated.
//! let token_string = config.encode_token(&serde_json::json!({ "sub": "alice" }))?;
//! println!("token: {token_string}");
//!
//! // Before verifying the token, we might peek into its header, e.g. to find the key
//! // which has signed the token. The header is untrusted at this point!
//! let header = Token::peek_header(&token_string)?;
//! assert_eq!(header["alg"], "HS256");
//!
//! // Verify the token signature and validate claims.
//! let options = ValidationOptions::default();
//! let claims: CustomClaims = config.decode_token_as(&token_string, &options)?;
//! assert_eq!(claims.subject, "alice");
//! # Ok(())
//! # } // end main()
//! ```
//!
//! ## Builder and custom validation
//!
//! ```
//! # use jwt_pipeline::prelude::*;
//! # use serde_json::json;
//! # fn main() -> anyhow::Result<()> {
//! let signer = Signer::hs512(b"super_secret_key_donut_steel");
//! let token = Token::new()
//!     .with_aud("update")
//!     .with_exp()
//!     .with_validator("aud", |aud, _, options| match options.get("aud") {
//!         Some(expected) if expected == aud => Ok(()),
//!         _ => Err("Invalid audience".to_owned()),
//!     })
//!     .with_signer(signer);
//! let signed = token.sign()?;
//!
//! let options = ValidationOptions::default().with("aud", "update");
//! let claims = token.verify(signed.as_str(), &options)?;
//! assert_eq!(claims["aud"], json!("update"));
//!
//! let options = ValidationOptions::default().with("aud", "delete");
//! let err = token.verify(signed.as_str(), &options).unwrap_err();
//! assert_eq!(err.to_string(), "Invalid audience");
//! # Ok(())
//! # } // end main()
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_root_url = "https://docs.rs/jwt-pipeline/0.1.0")]
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

pub mod alg;
mod claims;
mod config;
mod error;
pub mod generator;
mod signer;
mod token;
mod traits;
mod validator;

/// Prelude to neatly import all necessary stuff from the crate.
pub mod prelude {
    pub use crate::{
        Claims, DefaultClaims, Signer, TimeOptions, Token, TokenConfig, UntrustedToken,
        ValidationOptions, Validators,
    };
}

pub use crate::{
    claims::{validate_time_claim, Claims, TimeOptions},
    config::{DefaultClaims, TokenConfig},
    error::{CreationError, Error, KeyError, ParseError, ValidationError},
    generator::{ClaimGenerator, Generators, DEFAULT_TTL_SECS},
    signer::{AlgorithmName, KeySource, Signer, SignerConfig},
    token::{verify_compact, Codec, SignedToken, Token, UntrustedToken},
    traits::{Algorithm, AlgorithmSignature},
    validator::{
        ClaimValidator, ValidateClaims, ValidationOptions, Validators, EXPIRED_MESSAGE,
        ISSUED_IN_FUTURE_MESSAGE, NOT_YET_VALID_MESSAGE,
    },
};


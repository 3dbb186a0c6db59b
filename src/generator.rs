//! Deferred claim generation.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde_json::Value;

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{Claims, TimeOptions};

/// Lifetime of tokens produced by the default `exp` generator, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 2 * 60 * 60;

/// Zero-argument function producing a claim value at signing time.
///
/// Generators may read ambient state (e.g., the wall clock), but must not depend
/// on other claims.
pub type ClaimGenerator = Arc<dyn Fn() -> Value + Send + Sync>;

/// Registry of claim generators keyed by claim name.
///
/// All registered generators are invoked exactly once when a token is signed; their values
/// overwrite literal claims with the same name.
#[derive(Clone, Default)]
pub struct Generators {
    inner: HashMap<String, ClaimGenerator>,
}

impl fmt::Debug for Generators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.inner.keys())
            .finish()
    }
}

impl Generators {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator for the specified claim, replacing a previously registered one.
    ///
    /// # Panics
    ///
    /// Panics if `claim` is empty.
    pub fn insert<F>(&mut self, claim: impl Into<String>, generator: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let claim = claim.into();
        assert!(!claim.is_empty(), "Claim name must be non-empty");
        self.inner.insert(claim, Arc::new(generator));
    }

    /// Builder-style version of [`Self::insert()`].
    #[must_use]
    pub fn with<F>(mut self, claim: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.insert(claim, generator);
        self
    }

    /// Removes the generator for the specified claim.
    pub fn remove(&mut self, claim: &str) -> bool {
        self.inner.remove(claim).is_some()
    }

    /// Checks whether a generator for `claim` is registered.
    pub fn contains(&self, claim: &str) -> bool {
        self.inner.contains_key(claim)
    }

    /// Returns the number of registered generators.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Merges generators from `other` into this registry; `other` wins on conflicts.
    pub fn extend(&mut self, other: &Self) {
        for (claim, generator) in &other.inner {
            self.inner.insert(claim.clone(), Arc::clone(generator));
        }
    }

    /// Invokes every generator once and writes the results into `claims`,
    /// overwriting existing values.
    pub fn apply(&self, claims: &mut Claims) {
        for (claim, generator) in &self.inner {
            claims.insert(claim.clone(), generator());
        }
    }
}

/// Creates a generator for the `exp` claim: the current time plus `ttl`.
pub fn expiration<F>(
    ttl: Duration,
    time_options: TimeOptions<F>,
) -> impl Fn() -> Value + Send + Sync
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    move || Value::from(time_options.now() + ttl.num_seconds())
}

/// Creates a generator for the `iat` claim: the current time.
pub fn issued_at<F>(time_options: TimeOptions<F>) -> impl Fn() -> Value + Send + Sync
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    move || Value::from(time_options.now())
}

/// Creates a generator for the `nbf` claim: one second before the current time, so that
/// a freshly signed token is immediately valid under a strict `nbf < now` check.
pub fn not_before<F>(time_options: TimeOptions<F>) -> impl Fn() -> Value + Send + Sync
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    move || Value::from(time_options.now() - 1)
}

/// Generates a random token identifier suitable for the `jti` claim (96 random bits,
/// base64url-encoded).
pub fn token_id() -> Value {
    let mut bytes = [0_u8; 12];
    OsRng.fill_bytes(&mut bytes);
    Value::from(Base64UrlUnpadded::encode_string(&bytes))
}

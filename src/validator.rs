//! Per-claim validation performed after the token signature is verified.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{validate_time_claim, Claims, TimeOptions};

/// Message produced by the built-in `exp` validator.
pub const EXPIRED_MESSAGE: &str = "Token expired";
/// Message produced by the built-in `nbf` validator.
pub const NOT_YET_VALID_MESSAGE: &str = "Token not valid yet";
/// Message produced by the built-in `iat` validator.
pub const ISSUED_IN_FUTURE_MESSAGE: &str = "Token issued in the future";

/// Options passed to every claim validator.
///
/// Besides the list of skipped claims, options may contain arbitrary application-specific
/// values (e.g., the expected audience), which are forwarded verbatim to validators.
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::ValidationOptions;
/// # use serde_json::json;
/// let options = ValidationOptions::default()
///     .skip("exp")
///     .with("aud", "update");
/// assert!(options.is_skipped("exp"));
/// assert_eq!(options.get("aud"), Some(&json!("update")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOptions {
    skip: Vec<String>,
    extra: Map<String, Value>,
}

impl ValidationOptions {
    /// Adds a claim that will not be validated. The claim is still returned in the decoded
    /// claim set unmodified.
    #[must_use]
    pub fn skip(mut self, claim: impl Into<String>) -> Self {
        self.skip.push(claim.into());
        self
    }

    /// Adds an application-specific option value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Checks whether validation of `claim` is skipped.
    pub fn is_skipped(&self, claim: &str) -> bool {
        self.skip.iter().any(|skipped| skipped == claim)
    }

    /// Gets an application-specific option value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Validation logic dispatched per claim name.
///
/// The validator receives the *entire* decoded payload so that validations may be cross-claim,
/// or may compare a claim against a value from `options`. Implementations should accept
/// claims they know nothing about.
pub trait ValidateClaims {
    /// Validates a single claim present in `payload`. Returns a human-readable message
    /// on failure.
    fn validate_claim(
        &self,
        claim: &str,
        payload: &Claims,
        options: &ValidationOptions,
    ) -> Result<(), String>;
}

/// Validation function stored in [`Validators`]. The first argument is the value
/// of the validated claim.
pub type ClaimValidator =
    Arc<dyn Fn(&Value, &Claims, &ValidationOptions) -> Result<(), String> + Send + Sync>;

/// Registry of validators keyed by claim name.
///
/// Claims without a registered validator are accepted.
#[derive(Clone, Default)]
pub struct Validators {
    inner: HashMap<String, ClaimValidator>,
}

impl fmt::Debug for Validators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.inner.keys())
            .finish()
    }
}

impl Validators {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator with access to the claim value, the whole payload and
    /// the options supplied by the caller.
    ///
    /// # Panics
    ///
    /// Panics if `claim` is empty.
    pub fn insert<F>(&mut self, claim: impl Into<String>, validator: F)
    where
        F: Fn(&Value, &Claims, &ValidationOptions) -> Result<(), String> + Send + Sync + 'static,
    {
        let claim = claim.into();
        assert!(!claim.is_empty(), "Claim name must be non-empty");
        self.inner.insert(claim, Arc::new(validator));
    }

    /// Builder-style version of [`Self::insert()`].
    #[must_use]
    pub fn with<F>(mut self, claim: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &Claims, &ValidationOptions) -> Result<(), String> + Send + Sync + 'static,
    {
        self.insert(claim, validator);
        self
    }

    /// Registers a simple predicate over the claim value. If the predicate returns `false`,
    /// validation fails with the message `Invalid claim: {claim}`.
    ///
    /// # Panics
    ///
    /// Panics if `claim` is empty.
    #[must_use]
    pub fn with_predicate<F>(self, claim: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let claim = claim.into();
        let message = format!("Invalid claim: {claim}");
        self.with(claim, move |value, _, _| {
            if predicate(value) {
                Ok(())
            } else {
                Err(message.clone())
            }
        })
    }

    /// Registers the `exp` validator: the token is rejected with [`EXPIRED_MESSAGE`]
    /// unless `exp > now - leeway`.
    #[must_use]
    pub fn with_expiration<F>(self, time_options: TimeOptions<F>) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.with("exp", move |_, payload, _| {
            let leeway = time_options.leeway_secs();
            validate_time_claim(payload, "exp", EXPIRED_MESSAGE, &time_options, |exp, now| {
                exp.saturating_add(leeway) > now
            })
        })
    }

    /// Registers the `nbf` validator: the token is rejected with [`NOT_YET_VALID_MESSAGE`]
    /// unless `nbf < now + leeway`.
    #[must_use]
    pub fn with_maturity<F>(self, time_options: TimeOptions<F>) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.with("nbf", move |_, payload, _| {
            let leeway = time_options.leeway_secs();
            validate_time_claim(
                payload,
                "nbf",
                NOT_YET_VALID_MESSAGE,
                &time_options,
                |nbf, now| nbf.saturating_sub(leeway) < now,
            )
        })
    }

    /// Registers the `iat` validator: the token is rejected with [`ISSUED_IN_FUTURE_MESSAGE`]
    /// unless `iat <= now + leeway`.
    #[must_use]
    pub fn with_issuance<F>(self, time_options: TimeOptions<F>) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.with("iat", move |_, payload, _| {
            let leeway = time_options.leeway_secs();
            validate_time_claim(
                payload,
                "iat",
                ISSUED_IN_FUTURE_MESSAGE,
                &time_options,
                |iat, now| iat.saturating_sub(leeway) <= now,
            )
        })
    }

    /// Registers a validator requiring the claim to be equal to `expected`.
    #[must_use]
    pub fn with_expected(self, claim: impl Into<String>, expected: impl Into<Value>) -> Self {
        let claim = claim.into();
        let expected = expected.into();
        let message = format!("Invalid claim: {claim}");
        self.with(claim, move |value, _, _| {
            if *value == expected {
                Ok(())
            } else {
                Err(message.clone())
            }
        })
    }

    /// Removes the validator for the specified claim.
    pub fn remove(&mut self, claim: &str) -> bool {
        self.inner.remove(claim).is_some()
    }

    /// Checks whether a validator for `claim` is registered.
    pub fn contains(&self, claim: &str) -> bool {
        self.inner.contains_key(claim)
    }

    /// Merges validators from `other` into this registry; `other` wins on conflicts.
    pub fn extend(&mut self, other: &Self) {
        for (claim, validator) in &other.inner {
            self.inner.insert(claim.clone(), Arc::clone(validator));
        }
    }
}

impl ValidateClaims for Validators {
    fn validate_claim(
        &self,
        claim: &str,
        payload: &Claims,
        options: &ValidationOptions,
    ) -> Result<(), String> {
        match (self.inner.get(claim), payload.get(claim)) {
            (Some(validator), Some(value)) => validator(value, payload, options),
            _ => Ok(()),
        }
    }
}

impl<V: ValidateClaims + ?Sized> ValidateClaims for &V {
    fn validate_claim(
        &self,
        claim: &str,
        payload: &Claims,
        options: &ValidationOptions,
    ) -> Result<(), String> {
        (**self).validate_claim(claim, payload, options)
    }
}

/// Runs `validators` for each claim in `payload` in the payload order, skipping claims
/// listed in `options`. Stops on the first failure, returning the failed claim name
/// together with the message.
pub(crate) fn run_validators<V: ValidateClaims + ?Sized>(
    validators: &V,
    payload: &Claims,
    options: &ValidationOptions,
) -> Result<(), (String, String)> {
    for claim in payload.keys() {
        if options.is_skipped(claim) {
            continue;
        }
        validators
            .validate_claim(claim, payload, options)
            .map_err(|message| (claim.clone(), message))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    use std::sync::Mutex;

    fn time_at(timestamp: i64) -> TimeOptions<impl Fn() -> DateTime<Utc> + Copy + Send + Sync> {
        let now = DateTime::from_timestamp(timestamp, 0).unwrap();
        TimeOptions::new(Duration::zero(), move || now)
    }

    #[test]
    fn expiration_validator() {
        let validators = Validators::new().with_expiration(time_at(1_000));
        let options = ValidationOptions::default();

        let claims: Claims = [("exp", json!(1_001))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("exp", json!(1_000))].into_iter().collect();
        let (claim, message) = run_validators(&validators, &claims, &options).unwrap_err();
        assert_eq!(claim, "exp");
        assert_eq!(message, EXPIRED_MESSAGE);
    }

    #[test]
    fn time_validators_saturate_on_extreme_timestamps() {
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let time = TimeOptions::new(Duration::seconds(60), move || now);
        let validators = Validators::new()
            .with_expiration(time)
            .with_maturity(time)
            .with_issuance(time);
        let options = ValidationOptions::default();

        let claims: Claims = [("exp", json!(u64::MAX))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("exp", json!(i64::MAX))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("exp", json!(i64::MIN))].into_iter().collect();
        let (_, message) = run_validators(&validators, &claims, &options).unwrap_err();
        assert_eq!(message, EXPIRED_MESSAGE);

        let claims: Claims = [("nbf", json!(i64::MIN)), ("iat", json!(i64::MIN))]
            .into_iter()
            .collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("nbf", json!(i64::MAX))].into_iter().collect();
        let (_, message) = run_validators(&validators, &claims, &options).unwrap_err();
        assert_eq!(message, NOT_YET_VALID_MESSAGE);
        let claims: Claims = [("iat", json!(-1e300))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
    }

    #[test]
    fn maturity_validator_with_leeway() {
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let time = TimeOptions::new(Duration::seconds(30), move || now);
        let validators = Validators::new().with_maturity(time);
        let options = ValidationOptions::default();

        let claims: Claims = [("nbf", json!(1_020))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("nbf", json!(1_030))].into_iter().collect();
        let (_, message) = run_validators(&validators, &claims, &options).unwrap_err();
        assert_eq!(message, NOT_YET_VALID_MESSAGE);
    }

    #[test]
    fn issuance_validator() {
        let validators = Validators::new().with_issuance(time_at(1_000));
        let options = ValidationOptions::default();
        let claims: Claims = [("iat", json!(1_000))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let claims: Claims = [("iat", json!(1_001))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &options).is_err());
    }

    #[test]
    fn absent_claims_are_not_validated() {
        let validators = Validators::new()
            .with_expiration(time_at(1_000))
            .with_predicate("sub", |_| false);
        let claims: Claims = [("name", json!("Alice"))].into_iter().collect();
        assert!(run_validators(&validators, &claims, &ValidationOptions::default()).is_ok());
    }

    #[test]
    fn predicate_failure_message() {
        let validators = Validators::new().with_predicate("sub", |sub| sub == "alice");
        let claims: Claims = [("sub", json!("bob"))].into_iter().collect();
        let (claim, message) =
            run_validators(&validators, &claims, &ValidationOptions::default()).unwrap_err();
        assert_eq!(claim, "sub");
        assert_eq!(message, "Invalid claim: sub");
    }

    #[test]
    fn skipped_claims_are_not_validated() {
        let validators = Validators::new().with_expiration(time_at(1_000));
        let claims: Claims = [("exp", json!(900))].into_iter().collect();
        let options = ValidationOptions::default().skip("exp");
        assert!(run_validators(&validators, &claims, &options).is_ok());
    }

    #[test]
    fn validators_see_options_and_whole_payload() {
        let validators = Validators::new().with("aud", |aud, payload, options| {
            if Some(aud) == options.get("aud") && payload.contains_key("sub") {
                Ok(())
            } else {
                Err("Invalid audience".to_owned())
            }
        });
        let claims: Claims = [("sub", json!("alice")), ("aud", json!("update"))]
            .into_iter()
            .collect();

        let options = ValidationOptions::default().with("aud", "update");
        assert!(run_validators(&validators, &claims, &options).is_ok());
        let options = ValidationOptions::default().with("aud", "delete");
        let (_, message) = run_validators(&validators, &claims, &options).unwrap_err();
        assert_eq!(message, "Invalid audience");
    }

    #[test]
    fn validation_stops_on_first_failure() {
        let visited = Arc::new(Mutex::new(vec![]));
        let validators = ["a", "b", "c"].into_iter().fold(Validators::new(), |acc, name| {
            let visited = Arc::clone(&visited);
            acc.with(name, move |_, _, _| {
                visited.lock().unwrap().push(name);
                if name == "b" {
                    Err(format!("{name} failed"))
                } else {
                    Ok(())
                }
            })
        });
        let claims: Claims = [("a", json!(1)), ("b", json!(2)), ("c", json!(3))]
            .into_iter()
            .collect();

        let (claim, _) =
            run_validators(&validators, &claims, &ValidationOptions::default()).unwrap_err();
        assert_eq!(claim, "b");
        assert_eq!(*visited.lock().unwrap(), ["a", "b"]);
    }
}

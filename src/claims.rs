//! Claim sets and time-related helpers.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use core::{fmt, ops};

use crate::{CreationError, ValidationError};

/// Time-related options shared by claim generators and validators.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct TimeOptions<F = fn() -> DateTime<Utc>> {
    /// Leeway to use during validation.
    pub leeway: Duration,
    /// Source of the current timestamps.
    pub clock_fn: F,
}

impl<F: Fn() -> DateTime<Utc>> TimeOptions<F> {
    /// Creates options based on the specified time leeway and clock function.
    pub fn new(leeway: Duration, clock_fn: F) -> Self {
        Self { leeway, clock_fn }
    }

    /// Returns the current UNIX timestamp (in seconds) according to the clock function.
    pub fn now(&self) -> i64 {
        (self.clock_fn)().timestamp()
    }

    pub(crate) fn leeway_secs(&self) -> i64 {
        self.leeway.num_seconds()
    }
}

impl TimeOptions {
    /// Creates options based on the specified time leeway. The clock source is [`Utc::now()`].
    pub fn from_leeway(leeway: Duration) -> Self {
        Self {
            leeway,
            clock_fn: Utc::now,
        }
    }
}

/// Zero leeway and [`Utc::now()`] as the clock source.
impl Default for TimeOptions {
    fn default() -> Self {
        Self::from_leeway(Duration::zero())
    }
}

/// Ordered claim set of a token, i.e., its JSON payload.
///
/// Claims preserve insertion order: it is the order in which they are serialized
/// and, after decoding, the order in which they are validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a structured value (e.g., a struct deriving `Serialize`) into a claim set.
    ///
    /// Returns an error if the value does not serialize to a JSON object.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, CreationError> {
        match serde_json::to_value(value).map_err(CreationError::Claims)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(CreationError::ClaimsNotAnObject),
        }
    }

    pub(crate) fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::ClaimsNotAnObject),
        }
    }

    /// Sets a claim, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Deserializes the claims into a caller-chosen record shape.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(ValidationError::MalformedClaims)
    }

    /// Returns the integer value of a claim, which is the expected representation
    /// for timestamps (`exp`, `nbf`, `iat`). Floating-point values are truncated.
    pub fn timestamp(&self, name: &str) -> Option<i64> {
        let value = self.0.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64))
    }

    /// Consumes the claims returning the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl ops::Deref for Claims {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Claims {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<_> = self.0.keys().map(String::as_str).collect();
        write!(formatter, "claims {keys:?}")
    }
}

/// Checks a time-based claim against the current time.
///
/// The claim value is compared to the current timestamp from `options` with `predicate`,
/// which receives `(claim_value, now)` in seconds. An absent claim is accepted; a claim
/// which is not a number is rejected with `failure_message`.
///
/// # Examples
///
/// ```
/// # use jwt_pipeline::{validate_time_claim, Claims, TimeOptions};
/// # use chrono::{Duration, Utc};
/// let mut claims = Claims::new();
/// claims.insert("exp", (Utc::now() - Duration::minutes(5)).timestamp());
/// let result = validate_time_claim(
///     &claims,
///     "exp",
///     "Token expired",
///     &TimeOptions::default(),
///     |exp, now| exp > now,
/// );
/// assert_eq!(result.unwrap_err(), "Token expired");
/// ```
pub fn validate_time_claim<F, P>(
    payload: &Claims,
    claim: &str,
    failure_message: &str,
    options: &TimeOptions<F>,
    predicate: P,
) -> Result<(), String>
where
    F: Fn() -> DateTime<Utc>,
    P: FnOnce(i64, i64) -> bool,
{
    if !payload.contains_key(claim) {
        return Ok(());
    }
    match payload.timestamp(claim) {
        Some(value) if predicate(value, options.now()) => Ok(()),
        _ => Err(failure_message.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct UserClaims {
        sub: String,
        admin: bool,
    }

    #[test]
    fn claims_are_converted_from_structs() {
        let claims = Claims::from_serializable(&UserClaims {
            sub: "alice".to_owned(),
            admin: true,
        })
        .unwrap();
        assert_eq!(claims["sub"], json!("alice"));
        assert_eq!(claims["admin"], json!(true));

        let restored: UserClaims = claims.deserialize_into().unwrap();
        assert_eq!(restored.sub, "alice");
    }

    #[test]
    fn non_object_claims_are_rejected() {
        assert_matches!(
            Claims::from_serializable(&[1, 2, 3]).unwrap_err(),
            CreationError::ClaimsNotAnObject
        );
        assert_matches!(
            Claims::from_value(json!("sub")).unwrap_err(),
            ValidationError::ClaimsNotAnObject
        );
    }

    #[test]
    fn claims_preserve_insertion_order() {
        let claims: Claims = [("sub", json!("alice")), ("aud", json!("api")), ("exp", json!(1))]
            .into_iter()
            .collect();
        let keys: Vec<_> = claims.keys().map(String::as_str).collect();
        assert_eq!(keys, ["sub", "aud", "exp"]);
        assert_eq!(
            serde_json::to_string(&claims).unwrap(),
            r#"{"sub":"alice","aud":"api","exp":1}"#
        );
    }

    #[test]
    fn timestamps_are_read_from_numbers() {
        let claims: Claims = [
            ("exp", json!(1_500_000_000)),
            ("nbf", json!(1.5e9)),
            ("iat", json!("now")),
        ]
        .into_iter()
        .collect();
        assert_eq!(claims.timestamp("exp"), Some(1_500_000_000));
        assert_eq!(claims.timestamp("nbf"), Some(1_500_000_000));
        assert_eq!(claims.timestamp("iat"), None);
        assert_eq!(claims.timestamp("jti"), None);
    }

    fn validate_exp<F>(claims: &Claims, options: &TimeOptions<F>) -> Result<(), String>
    where
        F: Fn() -> DateTime<Utc>,
    {
        validate_time_claim(claims, "exp", "expired", options, |exp, now| exp > now)
    }

    #[test]
    fn time_claim_validation() {
        let now = Utc::now();
        let options = TimeOptions::new(Duration::zero(), move || now);
        let mut claims = Claims::new();

        // Absent claims are accepted.
        assert!(validate_exp(&claims, &options).is_ok());

        claims.insert("exp", (now + Duration::seconds(10)).timestamp());
        assert!(validate_exp(&claims, &options).is_ok());

        claims.insert("exp", (now - Duration::seconds(10)).timestamp());
        let err = validate_exp(&claims, &options).unwrap_err();
        assert_eq!(err, "expired");

        claims.insert("exp", "tomorrow");
        assert!(validate_exp(&claims, &options).is_err());
    }
}

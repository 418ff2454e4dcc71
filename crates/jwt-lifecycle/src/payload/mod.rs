//! Validated token payloads.
//!
//! A [`Payload`] only exists once its claims passed the [`PayloadValidator`];
//! the sole way to obtain one is through [`PayloadBuilder`].

pub mod builder;
pub mod validator;

use std::fmt;

use serde_json::{Map, Value};

use crate::claims::{Claim, ClaimSet, names};

pub use builder::PayloadBuilder;
pub use validator::PayloadValidator;

/// Which set of temporal rules a payload was validated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// `exp`, `nbf` and `iat` are all enforced.
    #[default]
    Standard,
    /// `exp` is ignored; the refresh window measured from `iat` applies instead.
    Refresh,
}

impl ValidationMode {
    /// Returns the mode name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable, validated claim set.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    claims: ClaimSet,
    mode: ValidationMode,
}

impl Payload {
    pub(crate) fn new(claims: ClaimSet, mode: ValidationMode) -> Self {
        Self { claims, mode }
    }

    /// The underlying claims.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// The mode the payload was validated under.
    #[must_use]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Returns a claim value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name).map(Claim::value)
    }

    /// Returns `true` if the claim is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.claims.contains(name)
    }

    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.get(names::SUBJECT).and_then(Claim::as_str)
    }

    /// The `jti` claim.
    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.claims.get(names::JWT_ID).and_then(Claim::as_str)
    }

    /// The `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.claims.get(names::ISSUER).and_then(Claim::as_str)
    }

    /// The `iat` claim.
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.claims.get(names::ISSUED_AT).and_then(Claim::as_timestamp)
    }

    /// The `exp` claim.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.claims.get(names::EXPIRATION).and_then(Claim::as_timestamp)
    }

    /// The `nbf` claim.
    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        self.claims.get(names::NOT_BEFORE).and_then(Claim::as_timestamp)
    }

    /// Returns `true` if every given claim is present with an equal value.
    #[must_use]
    pub fn matches(&self, expected: &[(&str, Value)]) -> bool {
        !expected.is_empty()
            && expected
                .iter()
                .all(|(name, value)| self.get(name) == Some(value))
    }

    /// Like [`matches`](Self::matches), but the payload must not hold any
    /// other claim either.
    #[must_use]
    pub fn matches_strict(&self, expected: &[(&str, Value)]) -> bool {
        self.matches(expected) && self.claims.len() == expected.len()
    }

    /// The claims as an ordered JSON object map.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.claims.to_map()
    }

    /// The claims as a compact JSON string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.claims.to_json_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> Payload {
        let claims: ClaimSet = [
            Claim::new("iss", "https://issuer.example.com").unwrap(),
            Claim::new("iat", 100).unwrap(),
            Claim::new("exp", 160).unwrap(),
            Claim::new("sub", "user-1").unwrap(),
            Claim::new("jti", "abc").unwrap(),
        ]
        .into_iter()
        .collect();
        Payload::new(claims, ValidationMode::Standard)
    }

    #[test]
    fn test_accessors() {
        let payload = payload();
        assert_eq!(payload.subject(), Some("user-1"));
        assert_eq!(payload.jti(), Some("abc"));
        assert_eq!(payload.issuer(), Some("https://issuer.example.com"));
        assert_eq!(payload.issued_at(), Some(100));
        assert_eq!(payload.expires_at(), Some(160));
        assert_eq!(payload.not_before(), None);
        assert!(payload.has("exp"));
        assert!(!payload.has("nbf"));
        assert_eq!(payload.mode(), ValidationMode::Standard);
    }

    #[test]
    fn test_matches() {
        let payload = payload();
        assert!(payload.matches(&[("sub", json!("user-1")), ("iat", json!(100))]));
        assert!(!payload.matches(&[("sub", json!("user-2"))]));
        assert!(!payload.matches(&[("aud", json!("api"))]));
        assert!(!payload.matches(&[]));
    }

    #[test]
    fn test_matches_strict() {
        let payload = payload();
        assert!(!payload.matches_strict(&[("sub", json!("user-1"))]));
        assert!(payload.matches_strict(&[
            ("iss", json!("https://issuer.example.com")),
            ("iat", json!(100)),
            ("exp", json!(160)),
            ("sub", json!("user-1")),
            ("jti", json!("abc")),
        ]));
    }

    #[test]
    fn test_json_keeps_claim_order() {
        assert_eq!(
            payload().to_json_string(),
            r#"{"iss":"https://issuer.example.com","iat":100,"exp":160,"sub":"user-1","jti":"abc"}"#
        );
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(ValidationMode::Standard.to_string(), "standard");
        assert_eq!(ValidationMode::Refresh.to_string(), "refresh");
    }
}

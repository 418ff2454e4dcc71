//! Claims and ordered claim sets.
//!
//! A [`Claim`] is a named JSON value whose type is checked against the rules
//! for its name when it is constructed. A [`ClaimSet`] keeps claims in
//! insertion order (the order feeds the `jti` digest) while looking them up by
//! name.

pub mod factory;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub use factory::ClaimFactory;

/// Registered claim names.
pub mod names {
    /// Issuer.
    pub const ISSUER: &str = "iss";
    /// Subject.
    pub const SUBJECT: &str = "sub";
    /// Audience.
    pub const AUDIENCE: &str = "aud";
    /// Expiration time.
    pub const EXPIRATION: &str = "exp";
    /// Not before.
    pub const NOT_BEFORE: &str = "nbf";
    /// Issued at.
    pub const ISSUED_AT: &str = "iat";
    /// JWT ID.
    pub const JWT_ID: &str = "jti";
}

// ============================================================================
// Claim Kinds
// ============================================================================

/// The value type a claim name requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    /// Integer unix timestamp (`exp`, `iat`, `nbf`).
    Timestamp,
    /// Non-empty string (`iss`, `sub`, `jti`).
    String,
    /// String or array of strings (`aud`).
    Audience,
    /// Any JSON value (custom claims).
    Any,
}

impl ClaimKind {
    /// Returns the kind required for a claim name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            names::EXPIRATION | names::ISSUED_AT | names::NOT_BEFORE => Self::Timestamp,
            names::ISSUER | names::SUBJECT | names::JWT_ID => Self::String,
            names::AUDIENCE => Self::Audience,
            _ => Self::Any,
        }
    }

    /// Returns `true` if the value satisfies this kind.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Timestamp => value.as_i64().is_some(),
            Self::String => value.as_str().is_some_and(|s| !s.is_empty()),
            Self::Audience => match value {
                Value::String(_) => true,
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            },
            Self::Any => true,
        }
    }

    /// Human readable description used in error messages.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timestamp => "an integer unix timestamp",
            Self::String => "a non-empty string",
            Self::Audience => "a string or an array of strings",
            Self::Any => "any value",
        }
    }
}

// ============================================================================
// Claim
// ============================================================================

/// A single named claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    name: String,
    value: Value,
}

impl Claim {
    /// Creates a claim, checking the value against the rules for its name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClaimType` if the value has the wrong type.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, ValidationError> {
        let claim = Self {
            name: name.into(),
            value: value.into(),
        };
        claim.check_type()?;
        Ok(claim)
    }

    /// Creates a timestamp claim.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClaimType` if `name` is not a timestamp
    /// claim or a custom claim.
    pub fn timestamp(name: impl Into<String>, timestamp: i64) -> Result<Self, ValidationError> {
        Self::new(name, timestamp)
    }

    /// The claim name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The claim value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value as a unix timestamp, if it is one.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<i64> {
        self.value.as_i64()
    }

    /// The value as a string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// The kind this claim's name requires.
    #[must_use]
    pub fn kind(&self) -> ClaimKind {
        ClaimKind::for_name(&self.name)
    }

    /// Checks the value against the rules for the claim name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClaimType` if the value has the wrong type.
    pub fn check_type(&self) -> Result<(), ValidationError> {
        let kind = self.kind();
        if kind.accepts(&self.value) {
            Ok(())
        } else {
            Err(ValidationError::invalid_claim_type(
                &self.name,
                kind.description(),
            ))
        }
    }

    /// Consumes the claim, returning its name and value.
    #[must_use]
    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.value)
    }
}

// ============================================================================
// Claim Set
// ============================================================================

/// An insertion-ordered set of claims with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: IndexMap<String, Claim>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a claim.
    ///
    /// A claim with the same name is replaced in place, keeping its position.
    pub fn insert(&mut self, claim: Claim) -> Option<Claim> {
        self.claims.insert(claim.name.clone(), claim)
    }

    /// Inserts every claim of `other`, overriding claims with the same name.
    pub fn merge(&mut self, other: ClaimSet) {
        for (_, claim) in other.claims {
            self.insert(claim);
        }
    }

    /// Returns the claim with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Claim> {
        self.claims.get(name)
    }

    /// Returns `true` if a claim with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Returns a new set holding only the named claims, in this set's order.
    #[must_use]
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> ClaimSet {
        let claims = self
            .claims
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n.as_ref() == name.as_str()))
            .map(|(name, claim)| (name.clone(), claim.clone()))
            .collect();
        ClaimSet { claims }
    }

    /// Iterates over the claims in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// Iterates over the claim names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns `true` if the set holds no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Converts the set into an ordered JSON object map.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.claims
            .iter()
            .map(|(name, claim)| (name.clone(), claim.value.clone()))
            .collect()
    }

    /// Serializes the set as a compact JSON object in insertion order.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = indexmap::map::Values<'a, String, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.values()
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<T: IntoIterator<Item = Claim>>(iter: T) -> Self {
        let mut set = ClaimSet::new();
        for claim in iter {
            set.insert(claim);
        }
        set
    }
}

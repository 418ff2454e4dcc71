//! Default claim generation.

use std::sync::Arc;

use serde_json::Value;

use crate::claims::{Claim, names};
use crate::clock::Clock;
use crate::config::TokenConfig;
use crate::error::ValidationError;

/// Produces the default claims (`iss`, `iat`, `exp`, `nbf`) and turns raw
/// values into typed claims.
///
/// Output is fully determined by the configured issuer and ttl plus the clock
/// reading.
#[derive(Debug, Clone)]
pub struct ClaimFactory {
    issuer: String,
    ttl: Option<i64>,
    clock: Arc<dyn Clock>,
}

impl ClaimFactory {
    /// Creates a factory.
    ///
    /// # Arguments
    /// * `issuer` - Value of the `iss` claim
    /// * `ttl` - Token lifetime in seconds, `None` for tokens without `exp`
    /// * `clock` - Time source for `iat`, `nbf` and `exp`
    #[must_use]
    pub fn new(issuer: impl Into<String>, ttl: Option<i64>, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: issuer.into(),
            ttl,
            clock,
        }
    }

    /// Creates a factory from configuration.
    #[must_use]
    pub fn from_config(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.issuer.clone(), config.ttl_seconds(), clock)
    }

    /// The configured ttl in seconds.
    #[must_use]
    pub fn ttl(&self) -> Option<i64> {
        self.ttl
    }

    /// The current time as a unix timestamp.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.timestamp()
    }

    /// Filters the configured default claim names down to the ones this
    /// factory will generate. `exp` is dropped here when there is no ttl, so it
    /// is never built only to be thrown away.
    pub fn default_claim_names<'a, S: AsRef<str>>(
        &self,
        configured: &'a [S],
    ) -> impl Iterator<Item = &'a str> {
        let drop_expiry = self.ttl.is_none();
        configured
            .iter()
            .map(|name| name.as_ref())
            .filter(move |name| !(drop_expiry && *name == names::EXPIRATION))
    }

    /// Builds a default claim.
    ///
    /// Returns `None` for names that have no default value.
    #[must_use]
    pub fn make(&self, name: &str) -> Option<Claim> {
        let now = self.now();
        let value: Value = match name {
            names::ISSUER => self.issuer.clone().into(),
            names::ISSUED_AT | names::NOT_BEFORE => now.into(),
            names::EXPIRATION => now.saturating_add(self.ttl?).into(),
            _ => return None,
        };
        Claim::new(name, value).ok()
    }

    /// Builds a typed claim from a raw value.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClaimType` if the value does not fit the
    /// claim name.
    pub fn get(&self, name: &str, value: Value) -> Result<Claim, ValidationError> {
        Claim::new(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn factory(ttl: Option<i64>) -> ClaimFactory {
        ClaimFactory::new(
            "https://issuer.example.com",
            ttl,
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn test_default_claims_from_clock() {
        let factory = factory(Some(60));

        assert_eq!(
            factory.make("iss").unwrap().as_str(),
            Some("https://issuer.example.com")
        );
        assert_eq!(factory.make("iat").unwrap().as_timestamp(), Some(1_000));
        assert_eq!(factory.make("nbf").unwrap().as_timestamp(), Some(1_000));
        assert_eq!(factory.make("exp").unwrap().as_timestamp(), Some(1_060));
    }

    #[test]
    fn test_unknown_default_claim() {
        assert!(factory(Some(60)).make("sub").is_none());
    }

    #[test]
    fn test_no_ttl_drops_expiry_before_iteration() {
        let factory = factory(None);
        let configured = ["iss", "iat", "exp", "nbf"];

        let names: Vec<_> = factory.default_claim_names(&configured[..]).collect();

        assert_eq!(names, vec!["iss", "iat", "nbf"]);
        assert!(factory.make("exp").is_none());
    }

    #[test]
    fn test_ttl_keeps_expiry() {
        let factory = factory(Some(60));
        let configured = vec!["iss".to_string(), "exp".to_string()];

        let names: Vec<_> = factory.default_claim_names(&configured[..]).collect();

        assert_eq!(names, vec!["iss", "exp"]);
    }

    #[test]
    fn test_get_checks_type() {
        let factory = factory(Some(60));
        assert!(factory.get("exp", Value::from(5)).is_ok());
        assert!(factory.get("exp", Value::from("5")).is_err());
    }
}

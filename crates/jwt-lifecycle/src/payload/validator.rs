//! Claim set validation.

use crate::claims::{ClaimSet, names};
use crate::config::TokenConfig;
use crate::error::ValidationError;
use crate::payload::ValidationMode;

/// Checks claim types, required claims and temporal claims.
///
/// Checks run in that order and stop at the first failure.
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    required_claims: Vec<String>,
    expiry_required: bool,
    leeway: i64,
    refresh_ttl: Option<i64>,
}

impl PayloadValidator {
    /// Creates a validator.
    ///
    /// # Arguments
    /// * `required_claims` - Claims that must be present
    /// * `expiry_required` - Whether `exp` is enforced when listed as required
    /// * `leeway` - Clock skew tolerance in seconds
    /// * `refresh_ttl` - Refresh window in seconds, `None` for unlimited
    #[must_use]
    pub fn new(
        required_claims: Vec<String>,
        expiry_required: bool,
        leeway: i64,
        refresh_ttl: Option<i64>,
    ) -> Self {
        Self {
            required_claims,
            expiry_required,
            leeway,
            refresh_ttl,
        }
    }

    /// Creates a validator from configuration.
    ///
    /// `exp` is only enforced when the configuration issues tokens that
    /// expire.
    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.required_claims.clone(),
            config.ttl.is_some(),
            config.leeway_seconds(),
            config.refresh_ttl_seconds(),
        )
    }

    /// Validates a claim set at `now` (unix timestamp).
    ///
    /// # Errors
    /// - `InvalidClaimType` if a registered claim has the wrong type
    /// - `MissingRequiredClaim` if a required claim is absent
    /// - `Expired`, `NotYetValid` or `RefreshPeriodExpired` for temporal failures
    pub fn check(
        &self,
        claims: &ClaimSet,
        mode: ValidationMode,
        now: i64,
    ) -> Result<(), ValidationError> {
        for claim in claims {
            claim.check_type()?;
        }

        self.check_required(claims)?;

        match mode {
            ValidationMode::Standard => self.check_expiry(claims, now)?,
            ValidationMode::Refresh => self.check_refresh_window(claims, now)?,
        }

        self.check_not_in_future(claims, names::NOT_BEFORE, now)?;
        self.check_not_in_future(claims, names::ISSUED_AT, now)
    }

    fn check_required(&self, claims: &ClaimSet) -> Result<(), ValidationError> {
        let missing = self
            .required_claims
            .iter()
            .filter(|name| self.expiry_required || name.as_str() != names::EXPIRATION)
            .find(|name| !claims.contains(name));

        match missing {
            Some(name) => Err(ValidationError::missing_claim(name.as_str())),
            None => Ok(()),
        }
    }

    fn check_expiry(&self, claims: &ClaimSet, now: i64) -> Result<(), ValidationError> {
        match timestamp(claims, names::EXPIRATION) {
            Some(exp) if exp.saturating_add(self.leeway) < now => Err(ValidationError::Expired),
            _ => Ok(()),
        }
    }

    fn check_refresh_window(&self, claims: &ClaimSet, now: i64) -> Result<(), ValidationError> {
        let Some(refresh_ttl) = self.refresh_ttl else {
            return Ok(());
        };

        match timestamp(claims, names::ISSUED_AT) {
            Some(iat) if iat.saturating_add(refresh_ttl) < now.saturating_sub(self.leeway) => {
                Err(ValidationError::RefreshPeriodExpired)
            }
            _ => Ok(()),
        }
    }

    fn check_not_in_future(
        &self,
        claims: &ClaimSet,
        name: &str,
        now: i64,
    ) -> Result<(), ValidationError> {
        match timestamp(claims, name) {
            Some(value) if value > now.saturating_add(self.leeway) => {
                Err(ValidationError::not_yet_valid(name))
            }
            _ => Ok(()),
        }
    }
}

fn timestamp(claims: &ClaimSet, name: &str) -> Option<i64> {
    claims.get(name).and_then(|claim| claim.as_timestamp())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::claims::Claim;

    fn claims(iat: i64, exp: Option<i64>) -> ClaimSet {
        let mut set: ClaimSet = [
            Claim::new("iss", "https://issuer.example.com").unwrap(),
            Claim::new("iat", iat).unwrap(),
            Claim::new("nbf", iat).unwrap(),
            Claim::new("sub", "user-1").unwrap(),
            Claim::new("jti", "abc").unwrap(),
        ]
        .into_iter()
        .collect();
        if let Some(exp) = exp {
            set.insert(Claim::new("exp", exp).unwrap());
        }
        set
    }

    fn validator(leeway: u64, refresh_ttl: Option<u64>) -> PayloadValidator {
        let config = TokenConfig::default()
            .with_ttl(Some(Duration::from_secs(60)))
            .with_refresh_ttl(refresh_ttl.map(Duration::from_secs))
            .with_leeway(Duration::from_secs(leeway));
        PayloadValidator::from_config(&config)
    }

    #[test]
    fn test_valid_claims() {
        let validator = validator(0, Some(1200));
        assert!(validator.check(&claims(0, Some(60)), ValidationMode::Standard, 30).is_ok());
    }

    #[test]
    fn test_expiry_boundary() {
        let validator = validator(0, Some(1200));
        let set = claims(0, Some(60));
        assert!(validator.check(&set, ValidationMode::Standard, 60).is_ok());
        assert_eq!(
            validator.check(&set, ValidationMode::Standard, 61),
            Err(ValidationError::Expired)
        );
    }

    #[test]
    fn test_leeway_extends_expiry() {
        let validator = validator(5, Some(1200));
        let set = claims(0, Some(60));
        assert!(validator.check(&set, ValidationMode::Standard, 65).is_ok());
        assert!(validator.check(&set, ValidationMode::Standard, 66).is_err());
    }

    #[test]
    fn test_future_nbf_and_iat() {
        let validator = validator(0, Some(1200));
        let set = claims(100, Some(160));
        assert_eq!(
            validator.check(&set, ValidationMode::Standard, 99),
            Err(ValidationError::not_yet_valid("nbf"))
        );

        let mut set = claims(50, Some(160));
        set.insert(Claim::new("iat", 100).unwrap());
        assert_eq!(
            validator.check(&set, ValidationMode::Standard, 99),
            Err(ValidationError::not_yet_valid("iat"))
        );
    }

    #[test]
    fn test_refresh_mode_ignores_expiry() {
        let validator = validator(0, Some(1200));
        let set = claims(0, Some(60));
        assert!(validator.check(&set, ValidationMode::Refresh, 700).is_ok());
        assert!(validator.check(&set, ValidationMode::Refresh, 1200).is_ok());
        assert_eq!(
            validator.check(&set, ValidationMode::Refresh, 1201),
            Err(ValidationError::RefreshPeriodExpired)
        );
    }

    #[test]
    fn test_unlimited_refresh_window() {
        let validator = validator(0, None);
        let set = claims(0, Some(60));
        assert!(validator.check(&set, ValidationMode::Refresh, i64::MAX / 2).is_ok());
    }

    #[test]
    fn test_refresh_mode_still_rejects_future_claims() {
        let validator = validator(0, Some(1200));
        let set = claims(500, Some(560));
        assert_eq!(
            validator.check(&set, ValidationMode::Refresh, 400),
            Err(ValidationError::not_yet_valid("nbf"))
        );
    }

    #[test]
    fn test_missing_required_claim() {
        let validator = validator(0, Some(1200));
        let set = claims(0, None);
        assert_eq!(
            validator.check(&set, ValidationMode::Standard, 0),
            Err(ValidationError::missing_claim("exp"))
        );
    }

    #[test]
    fn test_expiry_not_required_without_ttl() {
        let config = TokenConfig::default().with_ttl(None);
        let validator = PayloadValidator::from_config(&config);
        assert!(
            validator
                .check(&claims(0, None), ValidationMode::Standard, 1_000_000)
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_claims_pass_through() {
        let validator = validator(0, Some(1200));
        let mut set = claims(0, Some(60));
        set.insert(Claim::new("tenant", "t1").unwrap());
        assert!(validator.check(&set, ValidationMode::Standard, 10).is_ok());
    }

    #[test]
    fn test_custom_required_claims() {
        let validator = PayloadValidator::new(vec!["tenant".to_string()], true, 0, None);
        let set: ClaimSet = [Claim::new("sub", "user-1").unwrap()].into_iter().collect();
        assert_eq!(
            validator.check(&set, ValidationMode::Standard, 0),
            Err(ValidationError::missing_claim("tenant"))
        );
    }
}

//! Token lifecycle configuration.
//!
//! [`TokenConfig`] carries everything the claim factory, the payload validator,
//! the blacklist and the token manager need. It deserializes with `serde`, and
//! durations use `humantime` notation (`"60m"`, `"2 weeks"`).
//!
//! Loading the configuration from files or the environment is left to the
//! embedding application.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::claims::names;
use crate::token::SigningAlgorithm;

/// Default claims added to every freshly built payload.
pub const DEFAULT_CLAIMS: [&str; 4] = [
    names::ISSUER,
    names::ISSUED_AT,
    names::EXPIRATION,
    names::NOT_BEFORE,
];

/// Claims the refresh flow sets itself; they cannot be persistent.
const REFRESH_MANAGED_CLAIMS: [&str; 4] = [
    names::ISSUED_AT,
    names::EXPIRATION,
    names::NOT_BEFORE,
    names::JWT_ID,
];

/// Claims that must be present for a payload to validate.
pub const REQUIRED_CLAIMS: [&str; 6] = [
    names::ISSUER,
    names::ISSUED_AT,
    names::EXPIRATION,
    names::NOT_BEFORE,
    names::SUBJECT,
    names::JWT_ID,
];

/// Token lifecycle configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [jwt]
/// issuer = "https://api.example.com"
/// ttl = "1h"
/// refresh_ttl = "2weeks"
/// leeway = "30s"
/// persistent_claims = ["tenant"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Issuer placed in the `iss` claim.
    pub issuer: String,

    /// Token lifetime.
    /// `None` issues tokens without an `exp` claim.
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,

    /// How long after `iat` a token may still be refreshed.
    /// `None` allows refreshing indefinitely.
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Option<Duration>,

    /// Clock skew tolerance applied to every temporal check.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Signing algorithm name.
    /// Supported: HS256, HS384, HS512, RS256, RS384, RS512, ES256, ES384
    pub algorithm: String,

    /// Claims copied from the old token into the refreshed one.
    pub persistent_claims: Vec<String>,

    /// Claims a payload must carry to validate.
    pub required_claims: Vec<String>,

    /// Claims generated for every new payload, in order.
    pub default_claims: Vec<String>,

    /// Enable the blacklist.
    /// Required for `invalidate`, and for revoking the old token on refresh.
    pub revocation_enabled: bool,

    /// Delay before a blacklisted token is actually rejected.
    /// Lets concurrent requests carrying the old token finish after a refresh.
    #[serde(with = "humantime_serde")]
    pub revocation_grace_period: Duration,

    /// Refuse to refresh tokens when the blacklist is disabled.
    pub require_revocation_on_refresh: bool,

    /// Re-stamp `iat` on refresh instead of carrying the original one over.
    pub refresh_iat: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            ttl: Some(Duration::from_secs(3600)),                 // 1 hour
            refresh_ttl: Some(Duration::from_secs(14 * 24 * 3600)), // 2 weeks
            leeway: Duration::ZERO,
            algorithm: "HS256".to_string(),
            persistent_claims: Vec::new(),
            required_claims: REQUIRED_CLAIMS.iter().map(ToString::to_string).collect(),
            default_claims: DEFAULT_CLAIMS.iter().map(ToString::to_string).collect(),
            revocation_enabled: true,
            revocation_grace_period: Duration::ZERO,
            require_revocation_on_refresh: false,
            refresh_iat: false,
        }
    }
}

impl TokenConfig {
    /// Creates a configuration with defaults and the given issuer.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Sets the token lifetime (`None` for tokens that never expire).
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the refresh window (`None` for an unlimited window).
    #[must_use]
    pub fn with_refresh_ttl(mut self, refresh_ttl: Option<Duration>) -> Self {
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Sets the signing algorithm name.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Sets the claims carried over on refresh.
    #[must_use]
    pub fn with_persistent_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the required claims.
    #[must_use]
    pub fn with_required_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables the blacklist.
    #[must_use]
    pub fn with_revocation_enabled(mut self, enabled: bool) -> Self {
        self.revocation_enabled = enabled;
        self
    }

    /// Sets the blacklist grace period.
    #[must_use]
    pub fn with_revocation_grace_period(mut self, grace: Duration) -> Self {
        self.revocation_grace_period = grace;
        self
    }

    /// Sets whether refresh requires the blacklist.
    #[must_use]
    pub fn with_require_revocation_on_refresh(mut self, required: bool) -> Self {
        self.require_revocation_on_refresh = required;
        self
    }

    /// Sets whether `iat` is re-stamped on refresh.
    #[must_use]
    pub fn with_refresh_iat(mut self, refresh_iat: bool) -> Self {
        self.refresh_iat = refresh_iat;
        self
    }

    /// Token lifetime in whole seconds.
    #[must_use]
    pub fn ttl_seconds(&self) -> Option<i64> {
        self.ttl.map(as_seconds)
    }

    /// Refresh window in whole seconds.
    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> Option<i64> {
        self.refresh_ttl.map(as_seconds)
    }

    /// Leeway in whole seconds.
    #[must_use]
    pub fn leeway_seconds(&self) -> i64 {
        as_seconds(self.leeway)
    }

    /// Grace period in whole seconds.
    #[must_use]
    pub fn grace_period_seconds(&self) -> i64 {
        as_seconds(self.revocation_grace_period)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer is empty.
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The signing algorithm is not supported
    /// - The ttl is zero, or longer than the refresh window
    /// - A default claim cannot be generated
    /// - A persistent claim is one the refresh flow sets itself
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        if self.algorithm.parse::<SigningAlgorithm>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be one of HS256, HS384, HS512, RS256, RS384, RS512, ES256, ES384",
                self.algorithm
            )));
        }

        if let Some(ttl) = self.ttl {
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue(
                    "ttl must be > 0 (omit it for tokens that never expire)".to_string(),
                ));
            }

            if self.refresh_ttl.is_some_and(|refresh_ttl| refresh_ttl < ttl) {
                return Err(ConfigError::InvalidValue(
                    "refresh_ttl cannot be shorter than ttl".to_string(),
                ));
            }
        }

        for claim in &self.default_claims {
            if !DEFAULT_CLAIMS.contains(&claim.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid default claim: '{}'. Must be one of iss, iat, exp, nbf",
                    claim
                )));
            }
        }

        if let Some(claim) = self
            .persistent_claims
            .iter()
            .find(|claim| is_refresh_managed(claim))
        {
            return Err(ConfigError::InvalidValue(format!(
                "'{}' cannot be a persistent claim, refresh sets it",
                claim
            )));
        }

        Ok(())
    }
}

/// Returns `true` for claims that refresh always sets itself.
pub(crate) fn is_refresh_managed(name: &str) -> bool {
    REFRESH_MANAGED_CLAIMS.contains(&name)
}

fn as_seconds(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

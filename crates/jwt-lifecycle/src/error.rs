//! Token lifecycle error types.
//!
//! Errors are grouped by the stage that produced them:
//!
//! - [`ValidationError`] - the claim set failed structural, type or temporal checks
//! - [`SigningError`] - the signer could not produce or verify a token
//! - [`RevocationError`] - the blacklist rejected or could not service the request
//!
//! All of them convert into [`TokenError`], which is what the public API returns.

use std::fmt;

use crate::config::ConfigError;

// ============================================================================
// Validation Errors
// ============================================================================

/// Errors raised while validating a claim set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The `exp` claim lies in the past (beyond the configured leeway).
    #[error("Token has expired")]
    Expired,

    /// A `nbf` or `iat` claim lies in the future (beyond the configured leeway).
    #[error("Token is not yet valid: {claim} is in the future")]
    NotYetValid {
        /// The claim that failed the check.
        claim: String,
    },

    /// The token is too old to be refreshed.
    #[error("Token has expired and can no longer be refreshed")]
    RefreshPeriodExpired,

    /// A claim value does not have the type its name requires.
    #[error("Invalid value for claim {claim}: expected {expected}")]
    InvalidClaimType {
        /// The offending claim name.
        claim: String,
        /// Human readable description of the expected type.
        expected: &'static str,
    },

    /// A required claim is absent.
    #[error("Missing required claim: {claim}")]
    MissingRequiredClaim {
        /// Name of the missing claim.
        claim: String,
    },
}

impl ValidationError {
    /// Creates a new `NotYetValid` error.
    #[must_use]
    pub fn not_yet_valid(claim: impl Into<String>) -> Self {
        Self::NotYetValid {
            claim: claim.into(),
        }
    }

    /// Creates a new `InvalidClaimType` error.
    #[must_use]
    pub fn invalid_claim_type(claim: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidClaimType {
            claim: claim.into(),
            expected,
        }
    }

    /// Creates a new `MissingRequiredClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingRequiredClaim {
            claim: claim.into(),
        }
    }
}

// ============================================================================
// Signing Errors
// ============================================================================

/// Errors raised by a [`Signer`](crate::token::Signer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// The signing backend failed to produce a token.
    #[error("Failed to sign token: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// The token signature does not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token is not a well-formed compact JWT.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of what is wrong with the token.
        message: String,
    },

    /// Key material required by the algorithm is absent or empty.
    #[error("Secret is not set for algorithm {algorithm}")]
    SecretMissing {
        /// The algorithm that needed the key.
        algorithm: String,
    },

    /// Key material is present but cannot be parsed.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// The algorithm name is not supported.
    #[error("Unsupported algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The rejected algorithm name.
        name: String,
    },
}

impl SigningError {
    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `SecretMissing` error.
    #[must_use]
    pub fn secret_missing(algorithm: impl Into<String>) -> Self {
        Self::SecretMissing {
            algorithm: algorithm.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(name: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { name: name.into() }
    }

    /// Returns `true` if the error is caused by missing or unusable key material.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::SecretMissing { .. } | Self::InvalidKey { .. } | Self::UnsupportedAlgorithm { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for SigningError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Revocation Errors
// ============================================================================

/// Errors raised by the blacklist or the revocation store behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevocationError {
    /// The token has been blacklisted.
    #[error("The token has been blacklisted")]
    Revoked,

    /// An operation needs the blacklist but it is disabled.
    #[error("You must have the blacklist enabled to invalidate a token")]
    RevocationDisabled,

    /// Refresh requires revocation but the blacklist is disabled.
    #[error("Token refresh is not permitted while the blacklist is disabled")]
    RefreshNotPermitted,

    /// The backing store failed.
    #[error("Revocation storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },
}

impl RevocationError {
    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Errors returned by the token lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The claim set failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The signer failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// The blacklist rejected the token or failed.
    #[error(transparent)]
    Revocation(#[from] RevocationError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TokenError {
    /// Returns `true` if the token is past its expiry or refresh window.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Validation(ValidationError::Expired | ValidationError::RefreshPeriodExpired)
        )
    }

    /// Returns `true` if the token has been blacklisted.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revocation(RevocationError::Revoked))
    }

    /// Returns `true` if the error was caused by the presented token rather than
    /// by the server side (keys, storage, configuration).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Signing(err) => matches!(
                err,
                SigningError::InvalidSignature | SigningError::Malformed { .. }
            ),
            Self::Revocation(err) => matches!(err, RevocationError::Revoked),
            Self::Config(_) => false,
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Signing(_) => ErrorCategory::Signing,
            Self::Revocation(RevocationError::Storage { .. }) => ErrorCategory::Infrastructure,
            Self::Revocation(_) => ErrorCategory::Revocation,
            Self::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Categories of token errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Claim validation errors.
    Validation,
    /// Signature creation or verification errors.
    Signing,
    /// Blacklist decisions.
    Revocation,
    /// Revocation store failures.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Signing => write!(f, "signing"),
            Self::Revocation => write!(f, "revocation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TokenError::from(ValidationError::Expired);
        assert_eq!(err.to_string(), "Token has expired");

        let err = TokenError::from(ValidationError::missing_claim("sub"));
        assert_eq!(err.to_string(), "Missing required claim: sub");

        let err = TokenError::from(SigningError::secret_missing("RS256"));
        assert_eq!(err.to_string(), "Secret is not set for algorithm RS256");

        let err = TokenError::from(RevocationError::Revoked);
        assert_eq!(err.to_string(), "The token has been blacklisted");
    }

    #[test]
    fn test_error_predicates() {
        assert!(TokenError::from(ValidationError::Expired).is_expired());
        assert!(TokenError::from(ValidationError::RefreshPeriodExpired).is_expired());
        assert!(!TokenError::from(ValidationError::not_yet_valid("nbf")).is_expired());

        assert!(TokenError::from(RevocationError::Revoked).is_revoked());
        assert!(!TokenError::from(RevocationError::RevocationDisabled).is_revoked());

        assert!(TokenError::from(SigningError::InvalidSignature).is_client_error());
        assert!(!TokenError::from(SigningError::secret_missing("HS256")).is_client_error());
        assert!(!TokenError::from(RevocationError::storage("down")).is_client_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            TokenError::from(ValidationError::Expired).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            TokenError::from(SigningError::InvalidSignature).category(),
            ErrorCategory::Signing
        );
        assert_eq!(
            TokenError::from(RevocationError::Revoked).category(),
            ErrorCategory::Revocation
        );
        assert_eq!(
            TokenError::from(RevocationError::storage("down")).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            TokenError::from(ConfigError::Missing("issuer".to_string())).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_signing_error_predicates() {
        assert!(SigningError::secret_missing("ES384").is_key_error());
        assert!(SigningError::invalid_key("bad pem").is_key_error());
        assert!(!SigningError::InvalidSignature.is_key_error());
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}

//! Payload assembly.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::claims::{ClaimFactory, ClaimSet, names};
use crate::error::ValidationError;
use crate::payload::{Payload, PayloadValidator, ValidationMode};

/// Length of the random salt mixed into generated `jti` values.
const JTI_SALT_LEN: usize = 16;

/// Length of a generated `jti` in hex characters.
const JTI_LEN: usize = 32;

/// Builds validated [`Payload`]s.
///
/// Claims are assembled in a fixed order: the default claims first, then
/// caller supplied claims (overriding defaults with the same name), then a
/// generated `jti` unless one was supplied. The result is validated before it
/// is handed out.
///
/// # Example
///
/// ```ignore
/// let payload = manager
///     .payload_builder()
///     .subject("user-1")
///     .with_claim("tenant", "acme")
///     .make(true)?;
/// ```
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    factory: ClaimFactory,
    validator: PayloadValidator,
    default_claims: Vec<String>,
    custom_claims: Map<String, Value>,
    refresh_flow: bool,
}

impl PayloadBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        factory: ClaimFactory,
        validator: PayloadValidator,
        default_claims: Vec<String>,
    ) -> Self {
        Self {
            factory,
            validator,
            default_claims,
            custom_claims: Map::new(),
            refresh_flow: false,
        }
    }

    /// Adds a claim. Overrides a default claim of the same name.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_claims.insert(name.into(), value.into());
        self
    }

    /// Adds several claims at once.
    #[must_use]
    pub fn custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims.extend(claims);
        self
    }

    /// Sets the `sub` claim.
    #[must_use]
    pub fn subject(self, subject: impl Into<String>) -> Self {
        self.with_claim(names::SUBJECT, subject.into())
    }

    /// Sets the `iss` claim.
    #[must_use]
    pub fn issuer(self, issuer: impl Into<String>) -> Self {
        self.with_claim(names::ISSUER, issuer.into())
    }

    /// Sets the `aud` claim (a string or an array of strings).
    #[must_use]
    pub fn audience(self, audience: impl Into<Value>) -> Self {
        self.with_claim(names::AUDIENCE, audience)
    }

    /// Sets the `jti` claim, disabling generation.
    #[must_use]
    pub fn jwt_id(self, jti: impl Into<String>) -> Self {
        self.with_claim(names::JWT_ID, jti.into())
    }

    /// Sets the `iat` claim.
    #[must_use]
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim(names::ISSUED_AT, timestamp)
    }

    /// Sets the `exp` claim.
    #[must_use]
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.with_claim(names::EXPIRATION, timestamp)
    }

    /// Sets the `nbf` claim.
    #[must_use]
    pub fn not_before(self, timestamp: i64) -> Self {
        self.with_claim(names::NOT_BEFORE, timestamp)
    }

    /// Validates in refresh mode instead of standard mode.
    #[must_use]
    pub fn refresh_flow(mut self, refresh_flow: bool) -> Self {
        self.refresh_flow = refresh_flow;
        self
    }

    /// Replaces the list of generated default claims.
    #[must_use]
    pub fn set_default_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if the builder validates in refresh mode.
    #[must_use]
    pub fn is_refresh_flow(&self) -> bool {
        self.refresh_flow
    }

    /// The claims supplied so far, excluding defaults.
    #[must_use]
    pub fn pending_claims(&self) -> &Map<String, Value> {
        &self.custom_claims
    }

    /// Builds and validates the payload.
    ///
    /// With `reset_claims`, the supplied claims and the refresh flag are
    /// cleared afterwards (on success and on failure), so the builder can be
    /// reused for an unrelated payload.
    ///
    /// # Errors
    /// Returns `ValidationError` if a claim has the wrong type or the claim set
    /// fails validation.
    pub fn make(&mut self, reset_claims: bool) -> Result<Payload, ValidationError> {
        let result = self.build();
        if reset_claims {
            self.custom_claims.clear();
            self.refresh_flow = false;
        }
        result
    }

    fn build(&self) -> Result<Payload, ValidationError> {
        let mut claims = ClaimSet::new();

        for name in self.factory.default_claim_names(self.default_claims.as_slice()) {
            if let Some(claim) = self.factory.make(name) {
                claims.insert(claim);
            }
        }

        for (name, value) in &self.custom_claims {
            claims.insert(self.factory.get(name, value.clone())?);
        }

        if !claims.contains(names::JWT_ID) {
            let jti = self.factory.get(names::JWT_ID, generate_jti(&claims).into())?;
            claims.insert(jti);
        }

        let mode = self.mode();
        self.validator.check(&claims, mode, self.factory.now())?;
        Ok(Payload::new(claims, mode))
    }

    /// Rebuilds a payload from verified token claims.
    ///
    /// No default claims or `jti` are generated: the token's claims are taken
    /// as they are, in their encoded order, and validated in `mode`.
    ///
    /// # Errors
    /// Returns `ValidationError` if the claims fail validation.
    pub fn restore(
        &self,
        raw: Map<String, Value>,
        mode: ValidationMode,
    ) -> Result<Payload, ValidationError> {
        let claims = raw
            .into_iter()
            .map(|(name, value)| self.factory.get(&name, value))
            .collect::<Result<ClaimSet, _>>()?;

        self.validator.check(&claims, mode, self.factory.now())?;
        Ok(Payload::new(claims, mode))
    }

    fn mode(&self) -> ValidationMode {
        if self.refresh_flow {
            ValidationMode::Refresh
        } else {
            ValidationMode::Standard
        }
    }
}

/// Derives a `jti` from the final claim content plus a random salt.
fn generate_jti(claims: &ClaimSet) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JTI_SALT_LEN)
        .map(char::from)
        .collect();
    jti_from(claims, &salt)
}

/// First 32 hex characters of SHA-256 over `"{claims_json}.{salt}"`.
fn jti_from(claims: &ClaimSet, salt: &str) -> String {
    let digest = Sha256::digest(format!("{}.{}", claims.to_json_string(), salt).as_bytes());
    let mut jti = hex::encode(digest);
    jti.truncate(JTI_LEN);
    jti
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::claims::Claim;
    use crate::clock::ManualClock;
    use crate::config::TokenConfig;

    fn builder(config: &TokenConfig) -> PayloadBuilder {
        let clock = Arc::new(ManualClock::new(1_000));
        PayloadBuilder::new(
            ClaimFactory::from_config(config, clock),
            PayloadValidator::from_config(config),
            config.default_claims.clone(),
        )
    }

    fn config() -> TokenConfig {
        TokenConfig::new("https://issuer.example.com").with_ttl(Some(Duration::from_secs(60)))
    }

    #[test]
    fn test_default_claims_then_custom_then_jti() {
        let payload = builder(&config())
            .subject("user-1")
            .with_claim("tenant", "acme")
            .make(false)
            .unwrap();

        let names: Vec<_> = payload.claims().names().collect();
        assert_eq!(names, vec!["iss", "iat", "exp", "nbf", "sub", "tenant", "jti"]);
        assert_eq!(payload.issuer(), Some("https://issuer.example.com"));
        assert_eq!(payload.issued_at(), Some(1_000));
        assert_eq!(payload.expires_at(), Some(1_060));
        assert_eq!(payload.not_before(), Some(1_000));
        assert_eq!(payload.mode(), ValidationMode::Standard);
    }

    #[test]
    fn test_custom_claims_override_defaults_in_place() {
        let payload = builder(&config())
            .subject("user-1")
            .expires_at(2_000)
            .issuer("https://other.example.com")
            .make(false)
            .unwrap();

        assert_eq!(payload.expires_at(), Some(2_000));
        assert_eq!(payload.issuer(), Some("https://other.example.com"));
        let names: Vec<_> = payload.claims().names().collect();
        assert_eq!(names[..4], ["iss", "iat", "exp", "nbf"]);
    }

    #[test]
    fn test_generated_jti_shape() {
        let payload = builder(&config()).subject("user-1").make(false).unwrap();
        let jti = payload.jti().unwrap();
        assert_eq!(jti.len(), 32);
        assert!(jti.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identical_claims_get_distinct_jti() {
        let mut builder = builder(&config()).subject("user-1");
        let first = builder.make(false).unwrap();
        let second = builder.make(false).unwrap();

        assert_ne!(first.jti(), second.jti());
        assert_eq!(first.subject(), second.subject());
        assert_eq!(first.issued_at(), second.issued_at());
    }

    #[test]
    fn test_jti_is_a_function_of_claims_and_salt() {
        let claims: ClaimSet = [
            Claim::new("sub", "user-1").unwrap(),
            Claim::new("iat", 1_000).unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(jti_from(&claims, "salt"), jti_from(&claims.clone(), "salt"));
        assert_ne!(jti_from(&claims, "salt"), jti_from(&claims, "other"));

        let mut changed = claims.clone();
        changed.insert(Claim::new("sub", "user-2").unwrap());
        assert_ne!(jti_from(&claims, "salt"), jti_from(&changed, "salt"));
    }

    #[test]
    fn test_overridden_default_hashes_like_direct_claims() {
        let payload = builder(&config())
            .subject("user-1")
            .expires_at(2_000)
            .issuer("https://other.example.com")
            .make(false)
            .unwrap();
        let built = payload.claims().only(&["iss", "iat", "exp", "nbf", "sub"]);

        let direct: ClaimSet = [
            Claim::new("iss", "https://other.example.com").unwrap(),
            Claim::new("iat", 1_000).unwrap(),
            Claim::new("exp", 2_000).unwrap(),
            Claim::new("nbf", 1_000).unwrap(),
            Claim::new("sub", "user-1").unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(built, direct);
        assert_eq!(jti_from(&built, "fixed-salt"), jti_from(&direct, "fixed-salt"));
    }

    #[test]
    fn test_explicit_jti_is_kept() {
        let payload = builder(&config())
            .subject("user-1")
            .jwt_id("my-id")
            .make(false)
            .unwrap();
        assert_eq!(payload.jti(), Some("my-id"));
    }

    #[test]
    fn test_no_ttl_means_no_expiry_claim() {
        let config = config().with_ttl(None);
        let payload = builder(&config).subject("user-1").make(false).unwrap();
        assert!(!payload.has("exp"));
        assert_eq!(payload.claims().len(), 5);
    }

    #[test]
    fn test_missing_subject_fails_validation() {
        let err = builder(&config()).make(false).unwrap_err();
        assert_eq!(err, ValidationError::missing_claim("sub"));
    }

    #[test]
    fn test_wrong_claim_type_fails() {
        let err = builder(&config())
            .subject("user-1")
            .with_claim("exp", "tomorrow")
            .make(false)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClaimType { .. }));
    }

    #[test]
    fn test_reset_claims_clears_builder_state() {
        let mut builder = builder(&config())
            .subject("user-1")
            .with_claim("tenant", "acme")
            .refresh_flow(true);

        let payload = builder.make(true).unwrap();
        assert_eq!(payload.mode(), ValidationMode::Refresh);
        assert!(payload.has("tenant"));

        assert!(builder.pending_claims().is_empty());
        assert!(!builder.is_refresh_flow());
        assert_eq!(
            builder.make(true).unwrap_err(),
            ValidationError::missing_claim("sub")
        );
    }

    #[test]
    fn test_reset_happens_on_failure_too() {
        let mut builder = builder(&config()).with_claim("exp", "bad");
        assert!(builder.make(true).is_err());
        assert!(builder.pending_claims().is_empty());
    }

    #[test]
    fn test_keep_claims_without_reset() {
        let mut builder = builder(&config()).subject("user-1");
        builder.make(false).unwrap();
        assert_eq!(builder.pending_claims().get("sub"), Some(&json!("user-1")));
    }

    #[test]
    fn test_set_default_claims() {
        let config = config().with_required_claims(["sub", "jti"]);
        let payload = builder(&config)
            .set_default_claims(["iss"])
            .subject("user-1")
            .make(false)
            .unwrap();
        let names: Vec<_> = payload.claims().names().collect();
        assert_eq!(names, vec!["iss", "sub", "jti"]);
    }

    #[test]
    fn test_custom_claims_map() {
        let mut extra = Map::new();
        extra.insert("roles".to_string(), json!(["admin"]));
        extra.insert("sub".to_string(), json!("user-9"));

        let payload = builder(&config()).custom_claims(extra).make(false).unwrap();
        assert_eq!(payload.subject(), Some("user-9"));
        assert_eq!(payload.get("roles"), Some(&json!(["admin"])));
    }

    #[test]
    fn test_audience_array() {
        let payload = builder(&config())
            .subject("user-1")
            .audience(json!(["api", "admin"]))
            .make(false)
            .unwrap();
        assert_eq!(payload.get("aud"), Some(&json!(["api", "admin"])));
    }

    #[test]
    fn test_restore_keeps_claims_verbatim() {
        let mut raw = Map::new();
        raw.insert("sub".to_string(), json!("user-1"));
        raw.insert("iss".to_string(), json!("https://issuer.example.com"));
        raw.insert("iat".to_string(), json!(990));
        raw.insert("nbf".to_string(), json!(990));
        raw.insert("exp".to_string(), json!(1_050));
        raw.insert("jti".to_string(), json!("abc"));

        let payload = builder(&config())
            .restore(raw, ValidationMode::Standard)
            .unwrap();

        assert_eq!(payload.jti(), Some("abc"));
        assert_eq!(payload.issued_at(), Some(990));
        let names: Vec<_> = payload.claims().names().collect();
        assert_eq!(names, vec!["sub", "iss", "iat", "nbf", "exp", "jti"]);
    }

    #[test]
    fn test_restore_validates_in_given_mode() {
        let mut raw = Map::new();
        raw.insert("sub".to_string(), json!("user-1"));
        raw.insert("iss".to_string(), json!("https://issuer.example.com"));
        raw.insert("iat".to_string(), json!(900));
        raw.insert("nbf".to_string(), json!(900));
        raw.insert("exp".to_string(), json!(960));
        raw.insert("jti".to_string(), json!("abc"));

        let builder = builder(&config());
        assert_eq!(
            builder.restore(raw.clone(), ValidationMode::Standard).unwrap_err(),
            ValidationError::Expired
        );
        assert!(builder.restore(raw, ValidationMode::Refresh).is_ok());
    }
}

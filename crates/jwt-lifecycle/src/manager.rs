//! Token lifecycle orchestration.
//!
//! [`TokenManager`] is the entry point applications call. It ties the payload
//! builder, the signer and the blacklist together:
//!
//! - **encode**: payload → signer → token
//! - **decode**: token → signer → payload (validated) → blacklist check
//! - **refresh**: decode in refresh mode → revoke the old token → issue a new one
//! - **invalidate**: decode without blacklist check → revoke
//!
//! The manager holds no per-token state; everything that outlives a call lives
//! in the revocation store.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::TokenResult;
use crate::claims::{ClaimFactory, names};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, TokenConfig, is_refresh_managed};
use crate::error::{RevocationError, TokenError, ValidationError};
use crate::payload::{Payload, PayloadBuilder, PayloadValidator, ValidationMode};
use crate::revocation::{Blacklist, RevocationStore};
use crate::token::{Signer, SigningAlgorithm, Token};

/// Issues, decodes, refreshes and invalidates tokens.
///
/// # Example
///
/// ```ignore
/// let signer = Arc::new(JwtSigner::hmac(SigningAlgorithm::HS256, &secret)?);
/// let manager = TokenManager::new(signer, store, TokenConfig::new("https://api.example.com"))?;
///
/// let payload = manager.payload_builder().subject("user-1").make(true)?;
/// let token = manager.encode(&payload)?;
///
/// let payload = manager.decode(&token, true).await?;
/// let token = manager.refresh(&token, false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TokenManager {
    signer: Arc<dyn Signer>,
    blacklist: Blacklist,
    config: Arc<TokenConfig>,
    clock: Arc<dyn Clock>,
    custom_claims: Map<String, Value>,
    persistent_claims: Vec<String>,
    revocation_enabled: bool,
}

impl TokenManager {
    /// Creates a manager.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or names a
    /// different algorithm than the signer uses.
    pub fn new(
        signer: Arc<dyn Signer>,
        store: Arc<dyn RevocationStore>,
        config: TokenConfig,
    ) -> TokenResult<Self> {
        config.validate()?;

        let configured: SigningAlgorithm = config
            .algorithm
            .parse()
            .map_err(|_| ConfigError::InvalidValue(config.algorithm.clone()))?;
        if configured != signer.algorithm() {
            return Err(ConfigError::InvalidValue(format!(
                "algorithm is {} but the signer uses {}",
                configured,
                signer.algorithm()
            ))
            .into());
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            signer,
            blacklist: Blacklist::new(store, &config).with_clock(clock.clone()),
            persistent_claims: config.persistent_claims.clone(),
            revocation_enabled: config.revocation_enabled,
            custom_claims: Map::new(),
            config: Arc::new(config),
            clock,
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.blacklist = self.blacklist.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Sets claims added to every payload built by this manager, including
    /// refreshed ones.
    #[must_use]
    pub fn with_custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims = claims;
        self
    }

    /// Sets the claims copied from the old token on refresh.
    #[must_use]
    pub fn with_persistent_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables the blacklist.
    #[must_use]
    pub fn with_revocation_enabled(mut self, enabled: bool) -> Self {
        self.revocation_enabled = enabled;
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// The signer.
    #[must_use]
    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    /// The blacklist.
    #[must_use]
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Claims added to every payload.
    #[must_use]
    pub fn custom_claims(&self) -> &Map<String, Value> {
        &self.custom_claims
    }

    /// Claims copied over on refresh.
    #[must_use]
    pub fn persistent_claims(&self) -> &[String] {
        &self.persistent_claims
    }

    /// Returns `true` if the blacklist is enabled.
    #[must_use]
    pub fn is_revocation_enabled(&self) -> bool {
        self.revocation_enabled
    }

    /// Returns a fresh payload builder, seeded with the manager's custom
    /// claims.
    #[must_use]
    pub fn payload_builder(&self) -> PayloadBuilder {
        self.bare_builder().custom_claims(self.custom_claims.clone())
    }

    fn bare_builder(&self) -> PayloadBuilder {
        PayloadBuilder::new(
            ClaimFactory::from_config(&self.config, self.clock.clone()),
            PayloadValidator::from_config(&self.config),
            self.config.default_claims.clone(),
        )
    }

    /// Signs a payload.
    ///
    /// # Errors
    ///
    /// Returns `SigningError` if the signer fails.
    pub fn encode(&self, payload: &Payload) -> TokenResult<Token> {
        let token = Token::new(self.signer.sign(&payload.to_map())?)?;

        tracing::debug!(
            jti = payload.jti().unwrap_or_default(),
            sub = payload.subject().unwrap_or_default(),
            "Token issued"
        );
        Ok(token)
    }

    /// Verifies and validates a token.
    ///
    /// The blacklist is consulted last, so a tampered token reports its
    /// signature failure even when its identity is blacklisted.
    ///
    /// # Errors
    ///
    /// - `SigningError::InvalidSignature` / `SigningError::Malformed` if the
    ///   token does not verify
    /// - `ValidationError` if the claims are invalid or expired
    /// - `RevocationError::Revoked` if `check_revocation` is set and the token
    ///   is blacklisted
    pub async fn decode(&self, token: &Token, check_revocation: bool) -> TokenResult<Payload> {
        self.decode_with_mode(token, ValidationMode::Standard, check_revocation)
            .await
    }

    async fn decode_with_mode(
        &self,
        token: &Token,
        mode: ValidationMode,
        check_revocation: bool,
    ) -> TokenResult<Payload> {
        let claims = self.signer.verify(token.as_str())?;

        let payload = self
            .bare_builder()
            .restore(claims, mode)
            .inspect_err(|e| tracing::debug!(error = %e, mode = %mode, "Token rejected"))?;

        if check_revocation && self.revocation_enabled {
            let revoked = self
                .blacklist
                .has(&payload)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Blacklist lookup failed"))?;
            if revoked {
                tracing::debug!(jti = payload.jti().unwrap_or_default(), "Token revoked");
                return Err(RevocationError::Revoked.into());
            }
        }

        Ok(payload)
    }

    /// Exchanges a token for a new one.
    ///
    /// The old token is decoded in refresh mode (its `exp` is ignored, the
    /// refresh window applies) and must not be blacklisted. The new token
    /// carries the manager's custom claims, the persistent claims of the old
    /// token, its `sub` and (unless `refresh_iat` is configured) its `iat`.
    /// It gets a fresh `jti`, `nbf` and `exp`.
    ///
    /// With the blacklist enabled the old token is revoked (forever with
    /// `force_forever`) before the new one is signed.
    ///
    /// # Errors
    ///
    /// - `RevocationError::RefreshNotPermitted` if the blacklist is disabled
    ///   and `require_revocation_on_refresh` is set
    /// - any error of [`decode`](Self::decode) or [`encode`](Self::encode)
    pub async fn refresh(&self, token: &Token, force_forever: bool) -> TokenResult<Token> {
        if !self.revocation_enabled {
            if self.config.require_revocation_on_refresh {
                return Err(RevocationError::RefreshNotPermitted.into());
            }
            tracing::warn!("Refreshing token with the blacklist disabled; the old token stays valid");
        }

        let old = self
            .decode_with_mode(token, ValidationMode::Refresh, true)
            .await?;

        let mut builder = self.payload_builder();
        for name in &self.persistent_claims {
            if is_refresh_managed(name) {
                continue;
            }
            if let Some(value) = old.get(name) {
                builder = builder.with_claim(name.as_str(), value.clone());
            }
        }
        if let Some(subject) = old.subject() {
            builder = builder.subject(subject);
        }
        if !self.config.refresh_iat {
            if let Some(iat) = old.issued_at() {
                builder = builder.issued_at(iat);
            }
        }
        let payload = builder.make(true)?;

        if self.revocation_enabled {
            self.revoke(&old, force_forever).await?;
        }

        let refreshed = self.encode(&payload)?;
        tracing::debug!(
            old_jti = old.jti().unwrap_or_default(),
            new_jti = payload.jti().unwrap_or_default(),
            "Token refreshed"
        );
        Ok(refreshed)
    }

    /// Blacklists a token.
    ///
    /// The token is decoded without a blacklist check, so already revoked
    /// tokens can be invalidated again. A token that still decodes in
    /// standard mode is always accepted; an expired one falls back to refresh
    /// mode and is accepted while it can still be refreshed.
    ///
    /// # Errors
    ///
    /// - `RevocationError::RevocationDisabled` if the blacklist is disabled
    /// - any decode error
    /// - `RevocationError::Storage` if the store fails
    pub async fn invalidate(&self, token: &Token, force_forever: bool) -> TokenResult<bool> {
        if !self.revocation_enabled {
            return Err(RevocationError::RevocationDisabled.into());
        }

        let payload = match self
            .decode_with_mode(token, ValidationMode::Standard, false)
            .await
        {
            Err(TokenError::Validation(ValidationError::Expired)) => {
                self.decode_with_mode(token, ValidationMode::Refresh, false)
                    .await?
            }
            result => result?,
        };
        let added = self.revoke(&payload, force_forever).await?;

        tracing::debug!(
            jti = payload.jti().unwrap_or_default(),
            forever = force_forever,
            "Token invalidated"
        );
        Ok(added)
    }

    async fn revoke(&self, payload: &Payload, force_forever: bool) -> TokenResult<bool> {
        let result = if force_forever {
            self.blacklist.add_forever(payload).await
        } else {
            self.blacklist.add(payload).await
        };
        result.inspect_err(|e| tracing::warn!(error = %e, "Blacklist update failed"))
    }

    /// Returns the subject of a token without checking the blacklist.
    ///
    /// # Errors
    ///
    /// Returns any decode error, or `ValidationError::MissingRequiredClaim`
    /// if the token has no subject.
    pub async fn subject_of(&self, token: &Token) -> TokenResult<String> {
        let payload = self.decode(token, false).await?;
        payload
            .subject()
            .map(ToString::to_string)
            .ok_or_else(|| ValidationError::missing_claim(names::SUBJECT).into())
    }
}

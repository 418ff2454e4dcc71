//! Payload level revocation on top of a [`RevocationStore`].

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::TokenResult;
use crate::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::payload::Payload;
use crate::revocation::{RevocationEntry, RevocationStore};

/// Extra time an entry is kept after the token could last have been used.
const RETENTION_MARGIN: Duration = Duration::minutes(1);

/// Revokes payloads and answers whether a payload is revoked.
///
/// Entries are keyed by the `jti` claim, falling back to a SHA-256 digest of
/// the payload JSON. A temporary entry is kept until the token can neither be
/// used nor refreshed any more: `max(exp, iat + refresh_ttl)` plus a minute.
/// Every entry only takes effect after the grace period.
#[derive(Clone)]
pub struct Blacklist {
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
    refresh_ttl: Option<i64>,
}

impl Blacklist {
    /// Creates a blacklist reading the grace period and refresh window from
    /// configuration.
    #[must_use]
    pub fn new(store: Arc<dyn RevocationStore>, config: &TokenConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            grace_period: Duration::seconds(config.grace_period_seconds()),
            refresh_ttl: config.refresh_ttl_seconds(),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The configured grace period.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// The store behind this blacklist.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    /// Derives the revocation key of a payload.
    #[must_use]
    pub fn key(&self, payload: &Payload) -> String {
        match payload.jti() {
            Some(jti) => jti.to_string(),
            None => hex::encode(Sha256::digest(payload.to_json_string().as_bytes())),
        }
    }

    /// Revokes a payload until it can no longer be used or refreshed.
    ///
    /// Payloads without `exp` or `iat` (or with an unlimited refresh window)
    /// are revoked forever. Revoking an already revoked payload keeps the
    /// existing entry.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn add(&self, payload: &Payload) -> TokenResult<bool> {
        let Some(expires_at) = self.retain_until(payload) else {
            return self.add_forever(payload).await;
        };

        let key = self.key(payload);
        let entry = RevocationEntry::temporary(self.effective_from(), expires_at);
        if !self.store.add(&key, entry).await? {
            tracing::debug!(jti = %key, "Token already blacklisted");
        }
        Ok(true)
    }

    /// Revokes a payload forever.
    ///
    /// A temporary entry is upgraded and keeps its effective time, so a
    /// revocation already in force is not suspended by a new grace period.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn add_forever(&self, payload: &Payload) -> TokenResult<bool> {
        let key = self.key(payload);
        self.store.add_forever(&key, self.effective_from()).await?;
        Ok(true)
    }

    /// Returns `true` if the payload is revoked and the grace period is over.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn has(&self, payload: &Payload) -> TokenResult<bool> {
        self.store.has(&self.key(payload), self.clock.now()).await
    }

    /// Lifts the revocation of a payload.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn remove(&self, payload: &Payload) -> TokenResult<bool> {
        self.store.remove(&self.key(payload)).await
    }

    /// Removes every revocation.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn clear(&self) -> TokenResult<()> {
        self.store.clear().await
    }

    /// Drops entries that are no longer needed.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn cleanup_expired(&self) -> TokenResult<u64> {
        self.store.cleanup_expired(self.clock.now()).await
    }

    fn effective_from(&self) -> OffsetDateTime {
        self.clock.now() + self.grace_period
    }

    /// When an entry for this payload may be dropped. `None` means never.
    ///
    /// Without `iat` the refresh window is unbounded, so such payloads are
    /// kept forever too.
    fn retain_until(&self, payload: &Payload) -> Option<OffsetDateTime> {
        let exp = payload.expires_at()?;
        let refresh_ttl = self.refresh_ttl?;
        let iat = payload.issued_at()?;

        let last_use = exp.max(iat.saturating_add(refresh_ttl));

        let at = OffsetDateTime::from_unix_timestamp(last_use).ok()?;
        Some(at + RETENTION_MARGIN)
    }
}

impl fmt::Debug for Blacklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blacklist")
            .field("grace_period", &self.grace_period)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

//! Token revocation.
//!
//! Revoked tokens are tracked by identity (their `jti`, or a digest of the
//! payload when there is none) in a [`RevocationStore`]. The [`Blacklist`]
//! sits in front of the store and decides what an entry means: when it takes
//! effect, when it may be forgotten.
//!
//! # Store Requirements
//!
//! - `add` must be an atomic insert-if-absent: two concurrent revocations of
//!   the same identity keep exactly one entry
//! - Entries whose `expires_at` has passed may be dropped at any time
//! - Forever entries are never dropped by `cleanup_expired`

pub mod blacklist;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::TokenResult;

pub use blacklist::Blacklist;

/// A stored revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationEntry {
    /// When the revocation takes effect. Before this instant the token is
    /// still accepted (grace period).
    pub valid_until: OffsetDateTime,

    /// When the entry may be forgotten. `None` keeps it forever.
    pub expires_at: Option<OffsetDateTime>,
}

impl RevocationEntry {
    /// Creates an entry that is dropped after `expires_at`.
    #[must_use]
    pub fn temporary(valid_until: OffsetDateTime, expires_at: OffsetDateTime) -> Self {
        Self {
            valid_until,
            expires_at: Some(expires_at),
        }
    }

    /// Creates an entry that is never dropped.
    #[must_use]
    pub fn forever(valid_until: OffsetDateTime) -> Self {
        Self {
            valid_until,
            expires_at: None,
        }
    }

    /// Returns `true` if the entry never expires.
    #[must_use]
    pub fn is_forever(&self) -> bool {
        self.expires_at.is_none()
    }

    /// Returns `true` if the entry has expired and may be dropped.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Returns `true` once the grace period is over.
    #[must_use]
    pub fn is_effective(&self, now: OffsetDateTime) -> bool {
        self.valid_until <= now
    }

    /// Returns `true` if the entry currently rejects its token.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.is_effective(now) && !self.is_expired(now)
    }

    /// Turns the entry into a forever entry.
    ///
    /// The earlier of the two `valid_until` values wins, so an upgrade never
    /// reopens a grace period.
    #[must_use]
    pub fn upgrade_to_forever(self, valid_until: OffsetDateTime) -> Self {
        Self::forever(self.valid_until.min(valid_until))
    }
}

/// Storage for revoked token identities.
///
/// Implementations are provided in separate crates:
/// - `jwt-lifecycle-memory` - in-process `DashMap` backend
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Returns the entry stored for an identity, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, identity: &str) -> TokenResult<Option<RevocationEntry>>;

    /// Returns `true` if an active entry exists for the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn has(&self, identity: &str, now: OffsetDateTime) -> TokenResult<bool> {
        Ok(self
            .get(identity)
            .await?
            .is_some_and(|entry| entry.is_active(now)))
    }

    /// Stores an entry unless one already exists for the identity.
    ///
    /// Returns `true` if the entry was inserted. Check and insert must be
    /// atomic.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn add(&self, identity: &str, entry: RevocationEntry) -> TokenResult<bool>;

    /// Stores a forever entry.
    ///
    /// An existing entry is upgraded in place: it stops expiring and keeps
    /// the earlier of the two `valid_until` values, so a revocation that is
    /// already effective stays effective. Returns `true` if no entry existed
    /// before.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn add_forever(&self, identity: &str, valid_until: OffsetDateTime)
    -> TokenResult<bool>;

    /// Removes the entry for an identity.
    ///
    /// Returns `true` if an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove(&self, identity: &str) -> TokenResult<bool>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn clear(&self) -> TokenResult<()>;

    /// Drops entries that expired at or before `now`.
    ///
    /// Returns the number of dropped entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> TokenResult<u64>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// `HashMap` backed store that counts writes.
    #[derive(Default)]
    pub(crate) struct MockRevocationStore {
        entries: RwLock<HashMap<String, RevocationEntry>>,
        writes: AtomicUsize,
    }

    impl MockRevocationStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub(crate) fn entry(&self, identity: &str) -> Option<RevocationEntry> {
            self.entries.read().unwrap().get(identity).copied()
        }

        pub(crate) fn len(&self) -> usize {
            self.entries.read().unwrap().len()
        }
    }

    #[async_trait]
    impl RevocationStore for MockRevocationStore {
        async fn get(&self, identity: &str) -> TokenResult<Option<RevocationEntry>> {
            Ok(self.entry(identity))
        }

        async fn add(&self, identity: &str, entry: RevocationEntry) -> TokenResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut entries = self.entries.write().unwrap();
            if entries.contains_key(identity) {
                return Ok(false);
            }
            entries.insert(identity.to_string(), entry);
            Ok(true)
        }

        async fn add_forever(
            &self,
            identity: &str,
            valid_until: OffsetDateTime,
        ) -> TokenResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut entries = self.entries.write().unwrap();
            match entries.get_mut(identity) {
                Some(existing) => {
                    *existing = existing.upgrade_to_forever(valid_until);
                    Ok(false)
                }
                None => {
                    entries.insert(identity.to_string(), RevocationEntry::forever(valid_until));
                    Ok(true)
                }
            }
        }

        async fn remove(&self, identity: &str) -> TokenResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.write().unwrap().remove(identity).is_some())
        }

        async fn clear(&self) -> TokenResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries.write().unwrap().clear();
            Ok(())
        }

        async fn cleanup_expired(&self, now: OffsetDateTime) -> TokenResult<u64> {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            Ok((before - entries.len()) as u64)
        }
    }
}

//! In-memory revocation store for jwt-lifecycle.
//!
//! This crate provides an in-process implementation of the `RevocationStore`
//! trait from `jwt-lifecycle`, using `DashMap` for concurrent access.
//! Entries do not survive a restart, so it suits single-process deployments
//! and tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use jwt_lifecycle::{JwtSigner, SigningAlgorithm, TokenConfig, TokenManager};
//! use jwt_lifecycle_memory::InMemoryRevocationStore;
//!
//! let store = Arc::new(InMemoryRevocationStore::new());
//! let signer = Arc::new(JwtSigner::hmac(SigningAlgorithm::HS256, &secret)?);
//! let manager = TokenManager::new(signer, store, TokenConfig::default())?;
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jwt_lifecycle::{RevocationEntry, RevocationStore, TokenResult};
use time::OffsetDateTime;

/// Revocation store backed by a `DashMap`.
///
/// `add` and `add_forever` go through the map's entry API, so the existence
/// check and the write happen under the same shard lock.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: DashMap<String, RevocationEntry>,
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn get(&self, identity: &str) -> TokenResult<Option<RevocationEntry>> {
        Ok(self.entries.get(identity).map(|entry| *entry.value()))
    }

    async fn add(&self, identity: &str, entry: RevocationEntry) -> TokenResult<bool> {
        match self.entries.entry(identity.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    async fn add_forever(
        &self,
        identity: &str,
        valid_until: OffsetDateTime,
    ) -> TokenResult<bool> {
        match self.entries.entry(identity.to_string()) {
            Entry::Occupied(mut occupied) => {
                let upgraded = occupied.get().upgrade_to_forever(valid_until);
                occupied.insert(upgraded);
                Ok(false)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RevocationEntry::forever(valid_until));
                Ok(true)
            }
        }
    }

    async fn remove(&self, identity: &str) -> TokenResult<bool> {
        Ok(self.entries.remove(identity).is_some())
    }

    async fn clear(&self) -> TokenResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> TokenResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len()) as u64;

        if removed > 0 {
            tracing::debug!(removed, "Dropped expired blacklist entries");
        }
        Ok(removed)
    }
}

//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use tokio::time::Instant;

use crate::cache::heap::ExpirationId;

// == Cache Entry ==
/// Represents a single cache entry with value and expiration metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Absolute deadline, None = no expiration
    pub expires_at: Option<Instant>,
    /// Handle to the live expiration record; present iff `expires_at` is scheduled
    pub(crate) expiration: Option<ExpirationId>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new entry.
    pub(crate) fn new(
        key: K,
        value: V,
        expires_at: Option<Instant>,
        expiration: Option<ExpirationId>,
    ) -> Self {
        Self {
            key,
            value,
            expires_at,
            expiration,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired as observed at `now`.
    ///
    /// The read path treats an entry as expired only once `now` is strictly
    /// past its deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }
}

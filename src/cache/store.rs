//! Cache Store Module
//!
//! The state guarded by the cache lock: LRU index and expiration heap kept in
//! step with each other. Every method takes the caller's observation of "now".

use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::heap::{ExpirationHeap, ExpirationId, ExpirationRecord};
use crate::cache::{CacheEntry, CacheStats, LruIndex};
use crate::error::{CacheError, Result};

// == Public Constants ==
/// Longest TTL honored as given; longer TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Store ==
/// Capacity-bounded LRU storage with TTL scheduling.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Recency-ordered entries plus key lookup
    index: LruIndex<K, V>,
    /// Pending expirations
    expirations: ExpirationHeap<K>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// Fails with [`CacheError::InvalidConfiguration`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self {
            index: LruIndex::new(),
            expirations: ExpirationHeap::new(),
            stats: CacheStats::new(),
            capacity,
        })
    }

    // == Get ==
    /// Retrieves a value by key, marking it most recently used.
    ///
    /// An entry whose deadline is strictly before `now` is removed and reported missing.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V>
    where
        V: Clone,
    {
        let Some((slot, entry)) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired(now) {
            if let Some(expired) = self.index.remove(slot) {
                self.release(&expired);
            }
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let value = entry.value.clone();
        self.index.move_to_front(slot);
        self.stats.record_hit();
        Some(value)
    }

    // == Set ==
    /// Inserts or updates `key`.
    ///
    /// A zero `ttl` means the entry never expires and cancels any previous
    /// deadline. A `ttl` above [`MAX_TTL`] is clamped to it; if even that
    /// deadline cannot be represented the entry never expires. Returns true when a deadline was scheduled, which is the
    /// caller's cue to wake the sweeper.
    pub fn set(&mut self, key: K, value: V, ttl: Duration, now: Instant) -> bool {
        let expires_at = deadline_after(now, ttl);

        if let Some((slot, entry)) = self.index.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            match (expires_at, entry.expiration) {
                (Some(at), Some(id)) => self.expirations.reschedule(id, at),
                (Some(at), None) => {
                    entry.expiration = Some(self.expirations.push(key, at));
                }
                (None, Some(id)) => {
                    self.expirations.cancel(id);
                    entry.expiration = None;
                }
                (None, None) => {}
            }
            self.index.move_to_front(slot);
            return expires_at.is_some();
        }

        let expiration = expires_at.map(|at| self.expirations.push(key.clone(), at));
        self.index
            .push_front(CacheEntry::new(key, value, expires_at, expiration));

        if self.index.len() > self.capacity {
            self.evict_oldest();
        }

        expires_at.is_some()
    }

    // == Delete ==
    /// Removes an entry by key. Returns false if the key was absent.
    pub fn delete(&mut self, key: &K) -> bool {
        let Some(slot) = self.index.lookup(key) else {
            return false;
        };
        match self.index.remove(slot) {
            Some(entry) => {
                self.release(&entry);
                true
            }
            None => false,
        }
    }

    // == Dump ==
    /// Clears all entries and every pending expiration.
    ///
    /// Returns the number of entries removed.
    pub fn dump(&mut self) -> usize {
        let cleared = self.index.len();
        self.index.clear();
        self.expirations.clear();
        cleared
    }

    // == Set Capacity ==
    /// Changes the capacity and evicts least recently used entries until the
    /// store fits. Returns the number of evicted entries.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<usize> {
        validate_capacity(capacity)?;
        self.capacity = capacity;

        let mut evicted = 0;
        while self.index.len() > self.capacity && self.evict_oldest() {
            evicted += 1;
        }
        Ok(evicted)
    }

    // == Next Wake-up ==
    /// Returns the earliest live deadline, or None when nothing is scheduled.
    ///
    /// Canceled records found at the root are discarded on the way.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        loop {
            let (canceled, expires_at) = match self.expirations.peek() {
                Some((_, record)) => (record.is_canceled(), record.expires_at),
                None => return None,
            };
            if !canceled {
                return Some(expires_at);
            }
            self.expirations.pop();
        }
    }

    // == Sweep Expired ==
    /// Removes every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;

        loop {
            let due = match self.expirations.peek() {
                Some((_, record)) => record.is_canceled() || record.expires_at <= now,
                None => false,
            };
            if !due {
                break;
            }
            let Some((id, record)) = self.expirations.pop() else {
                break;
            };
            if record.is_canceled() {
                continue;
            }
            if self.expire_scheduled(id, record) {
                removed += 1;
            }
        }

        removed
    }

    // == Accessors ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns live keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.index.iter().map(|entry| entry.key.clone()).collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    /// Number of records still in the expiration heap, canceled ones included.
    pub fn pending_expirations(&self) -> usize {
        self.expirations.len()
    }

    // == Internal Helpers ==
    /// Evicts the least recently used entry, canceling its expiration.
    fn evict_oldest(&mut self) -> bool {
        match self.index.remove_back() {
            Some(entry) => {
                self.release(&entry);
                self.stats.record_eviction();
                true
            }
            None => false,
        }
    }

    /// Cancels the expiration owned by an entry leaving the index.
    fn release(&mut self, entry: &CacheEntry<K, V>) {
        if let Some(id) = entry.expiration {
            self.expirations.cancel(id);
        }
    }

    /// Handles a due record popped off the heap. Returns true if an entry was removed.
    ///
    /// The entry is removed only if it still owns this record; a record whose
    /// entry was deleted, replaced or rescheduled elsewhere is stale.
    fn expire_scheduled(&mut self, id: ExpirationId, record: ExpirationRecord<K>) -> bool {
        let Some((slot, entry)) = self.index.get_mut(&record.key) else {
            return false;
        };
        if entry.expiration != Some(id) {
            return false;
        }
        // Rescheduling updates the record in place, so the deadlines agree.
        debug_assert_eq!(entry.expires_at, Some(record.expires_at));

        self.index.remove(slot);
        self.stats.record_expiration();
        true
    }
}

/// Absolute deadline for `ttl` from `now`; None when the entry never expires.
fn deadline_after(now: Instant, ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        return None;
    }
    now.checked_add(ttl.min(MAX_TTL))
}

fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(CacheError::InvalidConfiguration(
            "capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

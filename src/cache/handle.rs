//! Cache Handle Module
//!
//! The thread-safe cache: one lock around [`CacheStore`] plus the background
//! expiration sweeper that the cache owns.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweeper, Sweeper};

// == Cache ==
/// Thread-safe, capacity-bounded LRU cache with optional per-entry TTL.
///
/// Every operation holds a single exclusive lock for its full duration. Expired
/// entries disappear lazily when read and proactively through a background
/// sweeper that sleeps until the earliest deadline.
///
/// A cache must be created inside a Tokio runtime, which hosts the sweeper.
///
/// ```rust
/// use std::time::Duration;
/// use ttl_lru::Cache;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = Cache::new(2).unwrap();
///     cache.set("a", 1);
///     cache.set_with_ttl("b", 2, Duration::from_secs(60));
///
///     assert_eq!(cache.get(&"a"), Some(1));
///
///     // "b" is now least recently used
///     cache.set("c", 3);
///     assert_eq!(cache.get(&"b"), None);
///
///     cache.close();
/// }
/// ```
pub struct Cache<K, V> {
    /// Lock-protected index and expiration heap
    store: Arc<Mutex<CacheStore<K, V>>>,
    /// Time source for deadlines
    clock: Arc<dyn Clock>,
    /// Coalescing "a sooner deadline may exist" signal
    updates: mpsc::Sender<()>,
    /// Flipped to true once to stop the sweeper
    shutdown: watch::Sender<bool>,
    /// Sweeper task, taken by `shutdown`
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// Fails with [`CacheError::InvalidConfiguration`] if `capacity` is zero and
    /// with [`CacheError::RuntimeUnavailable`] outside a Tokio runtime.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(capacity))
    }

    /// Creates a cache from explicit settings using the system clock.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = CacheStore::new(config.capacity)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::RuntimeUnavailable);
        }

        let store = Arc::new(Mutex::new(store));
        let (updates, update_rx) = mpsc::channel(1);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let sweeper = spawn_sweeper(Sweeper {
            store: Arc::clone(&store),
            clock: Arc::clone(&clock),
            idle_interval: config.idle_interval,
            updates: update_rx,
            shutdown: shutdown_rx,
        });

        Ok(Self {
            store,
            clock,
            updates,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    // == Get ==
    /// Retrieves a value by key and marks it most recently used.
    ///
    /// An entry found past its deadline is removed and None is returned.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut store = self.lock();
        store.get(key, self.clock.now())
    }

    // == Set ==
    /// Inserts or updates a key with no expiration.
    ///
    /// Clears any TTL the key previously had.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, Duration::ZERO);
    }

    /// Inserts or updates a key that expires `ttl` from now.
    ///
    /// A zero `ttl` means the entry never expires.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let scheduled = {
            let mut store = self.lock();
            store.set(key, value, ttl, self.clock.now())
        };
        if scheduled {
            self.signal_update();
        }
    }

    // == Delete ==
    /// Removes a key. Returns false if it was not present.
    pub fn delete(&self, key: &K) -> bool {
        self.lock().delete(key)
    }

    // == Dump ==
    /// Removes every entry and every pending expiration.
    ///
    /// Returns how many entries were removed.
    pub fn dump(&self) -> usize {
        self.lock().dump()
    }

    // == Set Capacity ==
    /// Changes the capacity, evicting least recently used entries as needed.
    ///
    /// Returns how many entries were evicted.
    pub fn set_capacity(&self, capacity: usize) -> Result<usize> {
        let evicted = self.lock().set_capacity(capacity)?;
        if evicted > 0 {
            debug!(capacity, evicted, "Capacity reduced, evicted entries");
        }
        Ok(evicted)
    }

    // == Accessors ==
    /// Returns the number of entries currently held, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Snapshot of keys, most recently used first. Does not affect recency.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<K, V>> {
        lock_store(&self.store)
    }

    fn signal_update(&self) {
        // A full channel already carries a pending wake-up; a closed one means
        // the sweeper has stopped.
        let _ = self.updates.try_send(());
    }
}

impl<K, V> Cache<K, V> {
    // == Close ==
    /// Signals the sweeper to stop. Returns without waiting for it.
    ///
    /// The cache stays usable afterwards, but expired entries are then only
    /// removed when read.
    pub fn close(&self) {
        let was_closed = self.shutdown.send_replace(true);
        if !was_closed {
            debug!("Cache closed, expiration sweeper signaled to stop");
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Closes the cache and waits for the sweeper task to exit.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!("Expiration sweeper ended abnormally: {}", err);
            }
        }
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Acquires the store lock, recovering the data if a holder panicked.
pub(crate) fn lock_store<K, V>(store: &Mutex<CacheStore<K, V>>) -> MutexGuard<'_, CacheStore<K, V>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Expiration Sweeper Task
//!
//! Background task that removes expired cache entries. It sleeps until the
//! earliest scheduled deadline instead of polling, restarts its wait when a
//! sooner deadline may have been registered, and exits on shutdown.

use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::cache::{lock_store, CacheStore, Clock};

/// Everything the sweeper needs; built and owned by [`Cache`](crate::Cache).
pub(crate) struct Sweeper<K, V> {
    /// Store shared with the cache, locked only to peek, pop and remove
    pub(crate) store: Arc<Mutex<CacheStore<K, V>>>,
    pub(crate) clock: Arc<dyn Clock>,
    /// Wait used when no deadline is scheduled
    pub(crate) idle_interval: Duration,
    /// Coalesced "deadline changed" notifications
    pub(crate) updates: mpsc::Receiver<()>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

/// Spawns the expiration sweeper on the current Tokio runtime.
///
/// Each iteration:
/// 1. Under the lock, discards canceled records at the heap root and computes
///    the wait until the earliest live deadline (or the idle interval).
/// 2. Without the lock, waits for that deadline, an update signal (restart at 1)
///    or shutdown (exit).
/// 3. Under the lock, removes every entry that is due.
pub(crate) fn spawn_sweeper<K, V>(sweeper: Sweeper<K, V>) -> JoinHandle<()>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    tokio::spawn(sweeper.run())
}

impl<K, V> Sweeper<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    async fn run(mut self) {
        info!(
            "Starting expiration sweeper with idle interval of {} seconds",
            self.idle_interval.as_secs()
        );

        loop {
            let wait = self.next_wait();

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                update = self.updates.recv() => {
                    if update.is_none() {
                        break;
                    }
                    // A sooner deadline may exist; recompute before sleeping again.
                    continue;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let removed = {
                let mut store = lock_store(&self.store);
                store.sweep_expired(self.clock.now())
            };

            if removed > 0 {
                debug!("Expiration sweep: removed {} expired entries", removed);
            } else {
                trace!("Expiration sweep: no expired entries found");
            }
        }

        info!("Expiration sweeper stopped");
    }

    fn next_wait(&self) -> Duration {
        let mut store = lock_store(&self.store);
        match store.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(self.clock.now()),
            None => self.idle_interval,
        }
    }
}

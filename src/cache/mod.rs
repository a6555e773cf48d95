//! Cache Module
//!
//! Provides in-memory caching with LRU eviction and TTL expiration driven by a
//! min-heap of deadlines.

mod clock;
mod entry;
mod handle;
mod heap;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use handle::Cache;
pub(crate) use handle::lock_store;
pub use heap::{ExpirationHeap, ExpirationId, ExpirationRecord};
pub use lru::{LruIndex, SlotId};
pub use stats::CacheStats;
pub use store::{CacheStore, MAX_TTL};

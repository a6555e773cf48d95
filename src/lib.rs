//! ttl_lru - A concurrent in-memory LRU cache with per-entry TTL
//!
//! Entries are bounded by a capacity with least-recently-used eviction and may
//! carry a time-to-live. Expired entries are removed lazily on read and by a
//! background sweeper that sleeps until the earliest deadline.
//!
//! The crate also ships a small HTTP server (see [`api`]) exposing a
//! `Cache<String, String>`.
//!
//! ```rust
//! use std::time::Duration;
//! use ttl_lru::{Cache, CacheConfig};
//!
//! #[tokio::main]
//! async fn main() -> ttl_lru::Result<()> {
//!     let config = CacheConfig::new(100).with_idle_interval(Duration::from_secs(60));
//!     let cache = Cache::with_config(config)?;
//!
//!     cache.set_with_ttl("session".to_string(), 42u32, Duration::from_secs(30));
//!     assert_eq!(cache.get(&"session".to_string()), Some(42));
//!
//!     cache.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheStats, Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};

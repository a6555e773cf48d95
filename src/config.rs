//! Configuration Module
//!
//! Cache construction settings and server configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Sweeper wake-up period used while no entry carries a TTL.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(60 * 60);

// == Cache Config ==
/// Settings for a single [`Cache`](crate::cache::Cache) instance.
///
/// ```rust
/// use std::time::Duration;
/// use ttl_lru::CacheConfig;
///
/// let config = CacheConfig::new(128).with_idle_interval(Duration::from_secs(30));
/// assert_eq!(config.capacity, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held after every completed call
    pub capacity: usize,
    /// How long the sweeper sleeps when there is nothing scheduled to expire
    pub idle_interval: Duration,
}

impl CacheConfig {
    /// Creates a config for the given capacity with the default idle interval.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    /// Sets the sweeper's idle wake-up interval.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL in seconds applied when a request omits one (0 = never expires)
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Sweeper idle wake-up interval in seconds
    pub idle_sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 disables it (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `IDLE_SWEEP_INTERVAL` - Sweeper idle period in seconds (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            idle_sweep_interval: parse_var("IDLE_SWEEP_INTERVAL")
                .unwrap_or(defaults.idle_sweep_interval),
        }
    }

    /// Builds the cache settings described by this server config.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.max_entries)
            .with_idle_interval(Duration::from_secs(self.idle_sweep_interval))
    }

    /// Default TTL as a duration; zero means entries never expire.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 0,
            server_port: 3000,
            idle_sweep_interval: DEFAULT_IDLE_INTERVAL.as_secs(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

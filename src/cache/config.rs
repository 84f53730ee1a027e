//! Counter cache configuration.
//!
//! Derived from the `[counters]` and `[store]` sections of `tally.toml`.

use std::time::Duration;

use crate::domain::counters::{DEFAULT_KEY_PREFIX, DEFAULT_TTL};

const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct CounterCacheConfig {
    /// Namespace prepended to every logical counter id.
    pub key_prefix: String,
    /// Lifetime of fresh entries and of every remote write.
    pub default_ttl: Duration,
    /// Cadence of the reconciliation pass.
    pub flush_interval: Duration,
    /// Upper bound for a single remote store call.
    pub store_timeout: Duration,
}

impl Default for CounterCacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::Settings> for CounterCacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            key_prefix: settings.counters.key_prefix.clone(),
            default_ttl: settings.counters.default_ttl,
            flush_interval: settings.counters.flush_interval,
            store_timeout: settings.store.timeout,
        }
    }
}

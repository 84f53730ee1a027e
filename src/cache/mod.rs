//! Tally counter cache
//!
//! Counters are served from an in-memory table and written back to a
//! [`RemoteStore`](crate::application::store::RemoteStore) in the background:
//!
//! - **Load**: on start, every key under the namespace prefix is read with
//!   its remaining TTL.
//! - **Serve**: increments and reads touch memory only.
//! - **Reconcile**: every flush interval, dirty counters are written with the
//!   default TTL and expired ones are deleted and evicted.
//!
//! ## Configuration
//!
//! ```toml
//! [counters]
//! key_prefix = "counter_"
//! default_ttl_seconds = 86400
//! flush_interval_ms = 5000
//!
//! [store]
//! timeout_ms = 2000
//! ```

mod config;
mod counter_cache;
mod deadline;
mod loader;
mod reconciler;
mod table;
#[cfg(test)]
pub(crate) mod testing;

pub use config::CounterCacheConfig;
pub use counter_cache::CounterCache;
pub use reconciler::FlushReport;
pub use table::CounterTable;

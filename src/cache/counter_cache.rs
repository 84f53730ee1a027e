//! The write-back counter cache.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::application::store::RemoteStore;
use crate::domain::counters::KeyNamespace;

use super::config::CounterCacheConfig;
use super::loader::load_table;
use super::reconciler::{FlushReport, Reconciler};
use super::table::CounterTable;

const METRIC_INCREMENT_TOTAL: &str = "tally_increment_total";

/// In-memory counters that periodically reconcile with a [`RemoteStore`].
///
/// Increments and reads are served from memory. A background task pushes
/// dirty counters to the store every flush interval and evicts expired
/// ones. The table and its dirty set share one lock: increments and passes
/// take it exclusively, reads take it shared.
pub struct CounterCache {
    config: CounterCacheConfig,
    namespace: KeyNamespace,
    table: Arc<RwLock<CounterTable>>,
    reconciler: Reconciler,
    shutdown: watch::Sender<bool>,
    flusher: Mutex<Option<JoinHandle<FlushReport>>>,
}

impl CounterCache {
    /// Load every counter under the namespace from `store`, then start the
    /// background reconciliation task.
    ///
    /// Store failures during the load are logged and skipped; this never fails.
    #[instrument(skip_all, fields(prefix = %config.key_prefix))]
    pub async fn start(store: Arc<dyn RemoteStore>, config: CounterCacheConfig) -> Arc<Self> {
        let namespace = KeyNamespace::new(config.key_prefix.clone());
        let table = load_table(store.as_ref(), &namespace, &config).await;
        let table = Arc::new(RwLock::new(table));

        let reconciler = Reconciler::new(table.clone(), store, config.clone());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let flusher = tokio::spawn(reconciler.clone().run(shutdown_rx));

        info!(
            target = "tally::cache",
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "counter cache started"
        );

        Arc::new(Self {
            config,
            namespace,
            table,
            reconciler,
            shutdown,
            flusher: Mutex::new(Some(flusher)),
        })
    }

    /// Add one to the counter `id` and return the new value.
    ///
    /// Missing or expired counters restart from zero with a fresh default TTL.
    pub async fn increment(&self, id: &str) -> i64 {
        let key = self.namespace.qualify(id);
        let mut table = self.table.write().await;
        let value = table.increment(&key, Instant::now(), self.config.default_ttl);
        drop(table);

        counter!(METRIC_INCREMENT_TOTAL).increment(1);
        value
    }

    /// Current value of counter `id`, or zero when it is not in the table.
    ///
    /// Expiry is not checked here; an expired counter is reported until a
    /// reconciliation pass evicts it.
    pub async fn get(&self, id: &str) -> i64 {
        let key = self.namespace.qualify(id);
        self.table.read().await.value(&key)
    }

    /// Run a reconciliation pass now, outside the timer.
    pub async fn flush_now(&self) -> FlushReport {
        self.reconciler.run_pass().await
    }

    /// Number of counters currently held in memory.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    /// Number of counters changed since the last pass.
    pub async fn dirty_len(&self) -> usize {
        self.table.read().await.dirty_len()
    }

    pub fn config(&self) -> &CounterCacheConfig {
        &self.config
    }

    /// Stop the background task after one final pass.
    ///
    /// Returns the final pass report, or `None` when the task already stopped.
    pub async fn shutdown(&self) -> Option<FlushReport> {
        self.shutdown.send_replace(true);

        let handle = self.flusher.lock().await.take()?;
        match handle.await {
            Ok(report) => {
                info!(
                    target = "tally::cache",
                    written = report.written,
                    deleted = report.deleted,
                    failed = report.failed,
                    "counter cache stopped"
                );
                Some(report)
            }
            Err(err) => {
                warn!(target = "tally::cache", error = %err, "flusher task ended abnormally");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::testing::ScriptedStore;

    fn quiet_config() -> CounterCacheConfig {
        CounterCacheConfig {
            default_ttl: Duration::from_secs(60),
            flush_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn increments_are_namespaced_and_sequential() {
        let store = Arc::new(ScriptedStore::default());
        let cache = CounterCache::start(store.clone(), quiet_config()).await;

        assert_eq!(cache.increment("hits").await, 1);
        assert_eq!(cache.increment("hits").await, 2);
        assert_eq!(cache.get("hits").await, 2);
        assert_eq!(cache.get("never").await, 0);

        cache.flush_now().await;
        assert_eq!(store.get("counter_hits").await.expect("flushed"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_counter_reads_stale_but_increments_fresh() {
        let store = Arc::new(ScriptedStore::default());
        let cache = CounterCache::start(store, quiet_config()).await;

        for _ in 0..3 {
            cache.increment("hits").await;
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(cache.get("hits").await, 3);
        assert_eq!(cache.increment("hits").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_counters() {
        let store = Arc::new(ScriptedStore::default());
        let cache = CounterCache::start(store.clone(), quiet_config()).await;
        cache.increment("hits").await;
        assert_eq!(cache.dirty_len().await, 1);

        let report = cache.shutdown().await.expect("final report");

        assert_eq!(report.written, 1);
        assert_eq!(store.get("counter_hits").await.expect("flushed"), 1);
        assert!(cache.shutdown().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn startup_loads_existing_counters() {
        let store = Arc::new(ScriptedStore::default());
        store.inner.put_without_expiry("counter_hits", 41);

        let cache = CounterCache::start(store, quiet_config()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("hits").await, 41);
        assert_eq!(cache.increment("hits").await, 42);
    }
}

//! Periodic write-back of dirty counters and eviction of expired ones.

use std::sync::Arc;
use std::time::Instant as WallInstant;

use metrics::{counter, gauge, histogram};
use tokio::sync::{RwLock, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::store::RemoteStore;

use super::config::CounterCacheConfig;
use super::deadline::bounded;
use super::table::CounterTable;

const METRIC_FLUSH_WRITTEN_TOTAL: &str = "tally_flush_written_total";
const METRIC_FLUSH_DELETED_TOTAL: &str = "tally_flush_deleted_total";
const METRIC_FLUSH_FAILED_TOTAL: &str = "tally_flush_failed_total";
const METRIC_FLUSH_MS: &str = "tally_flush_ms";
const METRIC_DIRTY_KEYS: &str = "tally_dirty_keys";

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Live keys written to the store.
    pub written: usize,
    /// Expired or missing keys deleted from the store.
    pub deleted: usize,
    /// Remote calls that failed; those keys are not retried.
    pub failed: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.written == 0 && self.deleted == 0 && self.failed == 0
    }
}

/// Push every dirty key to `store`, then clear the dirty set.
///
/// Live entries are written with the default TTL. Expired or vanished
/// entries are deleted remotely and evicted locally. Remote failures are
/// logged and counted; the dirty set is cleared regardless.
pub(crate) async fn reconcile(
    table: &mut CounterTable,
    store: &dyn RemoteStore,
    config: &CounterCacheConfig,
) -> FlushReport {
    let mut report = FlushReport::default();
    let now = Instant::now();

    for key in table.dirty_keys() {
        match table.entry(&key).copied() {
            Some(entry) if !entry.is_expired(now) => {
                let written = bounded(
                    "set",
                    config.store_timeout,
                    store.set(&key, entry.value, config.default_ttl),
                )
                .await;
                match written {
                    Ok(()) => report.written += 1,
                    Err(err) => {
                        warn!(
                            target = "tally::cache::reconciler",
                            key = %key,
                            op = "set",
                            error = %err,
                            "failed to flush counter"
                        );
                        report.failed += 1;
                    }
                }
            }
            _ => {
                let deleted = bounded("delete", config.store_timeout, store.delete(&key)).await;
                match deleted {
                    Ok(()) => report.deleted += 1,
                    Err(err) => {
                        warn!(
                            target = "tally::cache::reconciler",
                            key = %key,
                            op = "delete",
                            error = %err,
                            "failed to delete expired counter"
                        );
                        report.failed += 1;
                    }
                }
                table.evict(&key);
            }
        }
    }

    table.clear_dirty();
    report
}

/// Owns the shared handles the background flusher needs.
#[derive(Clone)]
pub(crate) struct Reconciler {
    table: Arc<RwLock<CounterTable>>,
    store: Arc<dyn RemoteStore>,
    config: CounterCacheConfig,
}

impl Reconciler {
    pub(crate) fn new(
        table: Arc<RwLock<CounterTable>>,
        store: Arc<dyn RemoteStore>,
        config: CounterCacheConfig,
    ) -> Self {
        Self {
            table,
            store,
            config,
        }
    }

    /// One pass under the exclusive lock; readers and writers wait for it.
    pub(crate) async fn run_pass(&self) -> FlushReport {
        let started_at = WallInstant::now();
        let mut table = self.table.write().await;
        gauge!(METRIC_DIRTY_KEYS).set(table.dirty_len() as f64);

        let report = reconcile(&mut table, self.store.as_ref(), &self.config).await;
        drop(table);

        counter!(METRIC_FLUSH_WRITTEN_TOTAL).increment(report.written as u64);
        counter!(METRIC_FLUSH_DELETED_TOTAL).increment(report.deleted as u64);
        counter!(METRIC_FLUSH_FAILED_TOTAL).increment(report.failed as u64);
        histogram!(METRIC_FLUSH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        if !report.is_empty() {
            debug!(
                target = "tally::cache::reconciler",
                written = report.written,
                deleted = report.deleted,
                failed = report.failed,
                "reconciliation pass finished"
            );
        }
        report
    }

    /// Flush on every interval tick until `shutdown` fires or its sender is
    /// dropped, then run one final pass and return its report.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) -> FlushReport {
        let mut interval = tokio::time::interval(self.config.flush_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(target = "tally::cache::reconciler", "running final flush");
        self.run_pass().await
    }
}

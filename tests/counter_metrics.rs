use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use tally::application::store::{RemoteStore, StoreError};
use tally::cache::{CounterCache, CounterCacheConfig};
use tally::infra::store::MemoryStore;

/// Store that lists one key but refuses to read it.
struct UnreadableStore;

#[async_trait]
impl RemoteStore for UnreadableStore {
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(vec![format!("{prefix}broken")])
    }

    async fn get(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::transport("connection reset"))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let config = CounterCacheConfig {
        default_ttl: Duration::from_secs(60),
        flush_interval: Duration::from_secs(3600),
        ..Default::default()
    };

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let unreadable = CounterCache::start(Arc::new(UnreadableStore), config.clone()).await;
    assert!(unreadable.is_empty().await);
    unreadable.shutdown().await;

    let store = Arc::new(MemoryStore::new());
    store.put_without_expiry("counter_seeded", 1);

    let cache = CounterCache::start(store, config).await;

    cache.increment("seeded").await;
    cache.increment("fresh").await;
    let report = cache.flush_now().await;
    assert_eq!(report.written, 2);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "tally_increment_total",
        "tally_flush_written_total",
        "tally_flush_deleted_total",
        "tally_flush_failed_total",
        "tally_flush_ms",
        "tally_dirty_keys",
        "tally_load_failed_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}

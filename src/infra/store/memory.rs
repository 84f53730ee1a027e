//! Process-local store backend.
//!
//! Honors expiry the way a remote store would, against the tokio clock.
//! Useful for running without Redis and for tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::application::store::{RemoteStore, StoreError};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::store::memory";

#[derive(Debug, Clone, Copy)]
struct StoredValue {
    value: i64,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` with no expiry, as a key written without a TTL.
    pub fn put_without_expiry(&self, key: &str, value: i64) {
        rw_write(&self.entries, SOURCE, "put_without_expiry").insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: None,
            },
        );
    }

    fn live(&self, key: &str, op: &'static str) -> Option<StoredValue> {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, op)
            .get(key)
            .copied()
            .filter(|stored| stored.is_live(now))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "enumerate");
        entries.retain(|_, stored| stored.is_live(now));

        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        self.live(key, "get")
            .map(|stored| stored.value)
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        Ok(self
            .live(key, "ttl")
            .and_then(|stored| stored.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Some(Instant::now() + ttl);
        rw_write(&self.entries, SOURCE, "set")
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        rw_write(&self.entries, SOURCE, "delete").remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn values_expire_with_the_clock() {
        let store = MemoryStore::new();
        store
            .set("counter_a", 3, Duration::from_secs(10))
            .await
            .expect("set");

        assert_eq!(store.get("counter_a").await.expect("live"), 3);
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            store.ttl("counter_a").await.expect("ttl"),
            Some(Duration::from_secs(6))
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(matches!(
            store.get("counter_a").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.enumerate("counter_").await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn enumerate_filters_by_prefix() {
        let store = MemoryStore::new();
        store.put_without_expiry("counter_b", 1);
        store.put_without_expiry("counter_a", 1);
        store.put_without_expiry("session_a", 1);

        assert_eq!(
            store.enumerate("counter_").await.expect("keys"),
            vec!["counter_a", "counter_b"]
        );
        assert_eq!(store.ttl("counter_a").await.expect("ttl"), None);
    }

    #[tokio::test]
    async fn delete_of_absent_key_succeeds() {
        let store = MemoryStore::new();
        store.delete("counter_missing").await.expect("delete");
    }
}

//! Store double with per-call failure injection for cache tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::store::{RemoteStore, StoreError};
use crate::infra::store::MemoryStore;

#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub(crate) inner: MemoryStore,
    failing: Mutex<HashSet<(&'static str, String)>>,
    enumerate_fails: AtomicBool,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl ScriptedStore {
    pub(crate) fn fail(&self, op: &'static str, key: &str) {
        self.failing.lock().unwrap().insert((op, key.to_string()));
    }

    pub(crate) fn fail_enumerate(&self) {
        self.enumerate_fails.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &'static str, key: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push((op, key.to_string()));
        if self.failing.lock().unwrap().contains(&(op, key.to_string())) {
            return Err(StoreError::transport(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        if self.enumerate_fails.load(Ordering::SeqCst) {
            return Err(StoreError::transport("injected enumerate failure"));
        }
        self.inner.enumerate(prefix).await
    }

    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        self.check("get", key)?;
        self.inner.get(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.check("ttl", key)?;
        self.inner.ttl(key).await
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        self.check("set", key)?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check("delete", key)?;
        self.inner.delete(key).await
    }
}

//! Remote key-value store contract used by the counter cache.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key `{key}` not found")]
    NotFound { key: String },
    #[error("store call `{op}` timed out after {elapsed:?}")]
    Timeout { op: &'static str, elapsed: Duration },
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("failed to decode stored value for `{key}`: {message}")]
    Decode { key: String, message: String },
}

impl StoreError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Remote key-value store holding the durable copy of every counter.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All keys starting with `prefix`.
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Integer stored under `key`.
    async fn get(&self, key: &str) -> Result<i64, StoreError>;

    /// Remaining lifetime of `key`; `None` when no expiry is set or the key is unknown.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Upsert `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

//! Redis store backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, ErrorKind, RedisError, aio::ConnectionManager};
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

use crate::application::store::{RemoteStore, StoreError};
use crate::config::StoreSettings;
use crate::infra::error::InfraError;

/// Redis-backed [`RemoteStore`].
///
/// The connection is opened on first use and kept by a
/// [`ConnectionManager`], which reconnects on its own after failures. A
/// server that is down at startup therefore only fails individual calls.
pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    pub fn open(settings: &StoreSettings) -> Result<Self, InfraError> {
        let url = connection_url(
            &settings.address,
            settings.username.as_deref(),
            settings.password.as_deref(),
        )?;
        let client = redis::Client::open(url.as_str())
            .map_err(|err| InfraError::configuration(format!("invalid redis address: {err}")))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let connection = ConnectionManager::new(self.client.clone())
            .await
            .map_err(StoreError::transport)?;
        info!(target = "tally::store::redis", "connected to redis");
        *slot = Some(connection.clone());
        Ok(connection)
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn enumerate(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut connection = self.connection().await?;
        let pattern = format!("{}*", escape_glob(prefix));
        let keys: Vec<String> = connection
            .keys(pattern)
            .await
            .map_err(|err| map_redis_error(prefix, err))?;
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let mut connection = self.connection().await?;
        let value: Option<i64> = connection
            .get(key)
            .await
            .map_err(|err| map_redis_error(key, err))?;
        value.ok_or_else(|| StoreError::not_found(key))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut connection = self.connection().await?;
        let millis: i64 = connection
            .pttl(key)
            .await
            .map_err(|err| map_redis_error(key, err))?;
        Ok(remaining_from_pttl(millis))
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut connection = self.connection().await?;
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut connection)
            .await
            .map_err(|err| map_redis_error(key, err))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut connection = self.connection().await?;
        let _: () = connection
            .del(key)
            .await
            .map_err(|err| map_redis_error(key, err))?;
        Ok(())
    }
}

fn connection_url(
    address: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Url, InfraError> {
    let mut url = Url::parse(&format!("redis://{address}/")).map_err(|err| {
        InfraError::configuration(format!("invalid redis address `{address}`: {err}"))
    })?;

    if let Some(username) = username {
        url.set_username(username)
            .map_err(|_| InfraError::configuration("redis username cannot be applied to address"))?;
    }
    if let Some(password) = password {
        url.set_password(Some(password))
            .map_err(|_| InfraError::configuration("redis password cannot be applied to address"))?;
    }
    Ok(url)
}

/// `PTTL` answers -2 for a missing key and -1 for a key without expiry.
fn remaining_from_pttl(millis: i64) -> Option<Duration> {
    u64::try_from(millis)
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn map_redis_error(key: &str, err: RedisError) -> StoreError {
    match err.kind() {
        ErrorKind::TypeError => StoreError::decode(key, err.to_string()),
        _ => StoreError::transport(err),
    }
}

//! Remote store backends.

mod lock;
mod memory;
mod redis;

use std::sync::Arc;

use tracing::info;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::application::store::RemoteStore;
use crate::config::{StoreBackend, StoreSettings};

use super::error::InfraError;

/// Build the store selected by `settings.backend`.
pub fn open(settings: &StoreSettings) -> Result<Arc<dyn RemoteStore>, InfraError> {
    match settings.backend {
        StoreBackend::Redis => {
            info!(
                target = "tally::store",
                address = %settings.address,
                authenticated = settings.username.is_some() || settings.password.is_some(),
                "using redis store"
            );
            Ok(Arc::new(RedisStore::open(settings)?))
        }
        StoreBackend::Memory => {
            info!(
                target = "tally::store",
                "using in-process memory store; counters will not survive restarts"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

use std::sync::Arc;

use crate::application::error::AppError;
use crate::cache::CounterCache;
use crate::domain::counters::CounterId;

/// Request facade over the counter cache.
///
/// Rejects blank identifiers; everything else is served from memory and
/// never fails on store errors.
#[derive(Clone)]
pub struct CounterService {
    cache: Arc<CounterCache>,
}

impl CounterService {
    pub fn new(cache: Arc<CounterCache>) -> Self {
        Self { cache }
    }

    pub async fn increment(&self, raw_id: &str) -> Result<i64, AppError> {
        let id = CounterId::parse(raw_id)?;
        Ok(self.cache.increment(id.as_str()).await)
    }

    pub async fn value(&self, raw_id: &str) -> Result<i64, AppError> {
        let id = CounterId::parse(raw_id)?;
        Ok(self.cache.get(id.as_str()).await)
    }

    pub fn cache(&self) -> &Arc<CounterCache> {
        &self.cache
    }
}

use std::future::Future;
use std::time::Duration;

use crate::application::store::StoreError;

/// Run a remote store call, failing with [`StoreError::Timeout`] once `limit` elapses.
pub(crate) async fn bounded<T, F>(
    op: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { op, elapsed: limit }),
    }
}

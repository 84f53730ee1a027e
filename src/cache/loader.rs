//! Startup bulk load from the remote store.

use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::application::store::RemoteStore;
use crate::domain::counters::{CounterEntry, KeyNamespace};

use super::config::CounterCacheConfig;
use super::deadline::bounded;
use super::table::CounterTable;

const METRIC_LOAD_FAILED_TOTAL: &str = "tally_load_failed_total";

/// Build the initial table from every key under the namespace.
///
/// Best effort: enumeration failure yields an empty table, and keys whose
/// value or TTL cannot be read are skipped.
pub(crate) async fn load_table(
    store: &dyn RemoteStore,
    namespace: &KeyNamespace,
    config: &CounterCacheConfig,
) -> CounterTable {
    let mut table = CounterTable::new();

    let keys = match bounded(
        "enumerate",
        config.store_timeout,
        store.enumerate(namespace.prefix()),
    )
    .await
    {
        Ok(keys) => keys,
        Err(err) => {
            warn!(
                target = "tally::cache::loader",
                prefix = namespace.prefix(),
                error = %err,
                "failed to enumerate counters; starting empty"
            );
            counter!(METRIC_LOAD_FAILED_TOTAL).increment(1);
            return table;
        }
    };

    let now = Instant::now();
    let mut skipped = 0usize;

    for key in keys {
        let value = match bounded("get", config.store_timeout, store.get(&key)).await {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    target = "tally::cache::loader",
                    key = %key,
                    op = "get",
                    error = %err,
                    "skipping counter"
                );
                counter!(METRIC_LOAD_FAILED_TOTAL).increment(1);
                skipped += 1;
                continue;
            }
        };

        let remote_ttl = match bounded("ttl", config.store_timeout, store.ttl(&key)).await {
            Ok(ttl) => ttl,
            Err(err) => {
                warn!(
                    target = "tally::cache::loader",
                    key = %key,
                    op = "ttl",
                    error = %err,
                    "skipping counter"
                );
                counter!(METRIC_LOAD_FAILED_TOTAL).increment(1);
                skipped += 1;
                continue;
            }
        };

        let ttl = effective_ttl(remote_ttl, config.default_ttl);
        table.insert_loaded(key, CounterEntry::restored(value, now, ttl));
    }

    info!(
        target = "tally::cache::loader",
        loaded = table.len(),
        skipped,
        "counter table loaded"
    );
    table
}

/// Remote TTL when it is known and positive, otherwise the default.
fn effective_ttl(remote: Option<Duration>, default: Duration) -> Duration {
    remote.filter(|ttl| !ttl.is_zero()).unwrap_or(default)
}

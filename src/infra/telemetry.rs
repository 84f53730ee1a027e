use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the counter cache emits.
fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tally_increment_total",
            Unit::Count,
            "Total number of counter increments served."
        );
        describe_counter!(
            "tally_flush_written_total",
            Unit::Count,
            "Total number of counters written to the remote store."
        );
        describe_counter!(
            "tally_flush_deleted_total",
            Unit::Count,
            "Total number of expired counters deleted from the remote store."
        );
        describe_counter!(
            "tally_flush_failed_total",
            Unit::Count,
            "Total number of remote writes or deletes that failed during reconciliation."
        );
        describe_gauge!(
            "tally_dirty_keys",
            Unit::Count,
            "Number of dirty counters at the start of the latest reconciliation pass."
        );
        describe_histogram!(
            "tally_flush_ms",
            Unit::Milliseconds,
            "Reconciliation pass latency in milliseconds, including lock wait."
        );
        describe_counter!(
            "tally_load_failed_total",
            Unit::Count,
            "Total number of remote reads that failed during the startup load."
        );
    });
}

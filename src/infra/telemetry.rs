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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "agora_cache_hit_total",
            Unit::Count,
            "Total number of cache-aside reads answered from the cache."
        );
        describe_counter!(
            "agora_cache_miss_total",
            Unit::Count,
            "Total number of cache-aside reads that fell through to the durable store."
        );
        describe_counter!(
            "agora_cache_unavailable_total",
            Unit::Count,
            "Total number of cache lookups that failed or timed out."
        );
        describe_counter!(
            "agora_cache_populate_failed_total",
            Unit::Count,
            "Total number of cache populates that failed after a miss."
        );
        describe_counter!(
            "agora_cache_invalidation_failed_total",
            Unit::Count,
            "Total number of post-write invalidations that could not reach the cache."
        );
        describe_gauge!(
            "agora_realtime_sessions",
            Unit::Count,
            "Current number of connected viewer sessions."
        );
        describe_counter!(
            "agora_realtime_lagged_total",
            Unit::Count,
            "Total number of change events dropped for lagging viewer sessions."
        );
        describe_histogram!(
            "agora_realtime_dispatch_ms",
            Unit::Milliseconds,
            "Time spent fanning one change event out to every session."
        );
    });
}

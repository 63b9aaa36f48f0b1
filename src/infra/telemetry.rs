use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
///
/// Logs go to stderr; stdout is reserved for command output.
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "algoref_cache_hit_total",
            Unit::Count,
            "Resolves served from a fresh cache entry."
        );
        describe_counter!(
            "algoref_cache_miss_total",
            Unit::Count,
            "Resolves that issued a new request."
        );
        describe_counter!(
            "algoref_cache_join_total",
            Unit::Count,
            "Resolves that joined a request already in flight."
        );
        describe_counter!(
            "algoref_cache_superseded_total",
            Unit::Count,
            "Responses discarded because a newer request had already committed."
        );
        describe_counter!(
            "algoref_cache_evict_total",
            Unit::Count,
            "Entries dropped by invalidation or idle collection."
        );
        describe_histogram!(
            "algoref_cache_fetch_ms",
            Unit::Milliseconds,
            "Cache fetch latency in milliseconds."
        );
        describe_counter!(
            "algoref_api_request_total",
            Unit::Count,
            "Backend requests by method and status."
        );
        describe_histogram!(
            "algoref_api_latency_ms",
            Unit::Milliseconds,
            "Backend request latency in milliseconds."
        );
        describe_counter!(
            "algoref_session_rejected_total",
            Unit::Count,
            "Sessions ended because the backend rejected the credential."
        );
        describe_counter!(
            "algoref_mutation_total",
            Unit::Count,
            "Admin writes by operation and outcome."
        );
    });
}

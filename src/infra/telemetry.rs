//! Tracing subscriber and metric catalogue for the server process.

use std::io;
use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    filter::Directive,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Overrides the configured level with a full `EnvFilter` expression.
pub const LOG_FILTER_ENV: &str = "GITPRESS_LOG";

/// Dependencies that are chatty at `debug`.
const QUIET_DEPENDENCIES: [&str; 4] = ["hyper=info", "hyper_util=info", "reqwest=info", "rustls=warn"];

enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

const METRICS: &[(MetricKind, &str, &str)] = &[
    (MetricKind::Counter, "gitpress_cache_hit_total", "Repository reads served from the tag cache."),
    (MetricKind::Counter, "gitpress_cache_miss_total", "Repository reads that had to go to GitHub."),
    (MetricKind::Counter, "gitpress_cache_invalidate_total", "Cache tags invalidated."),
    (
        MetricKind::Counter,
        "gitpress_cache_stale_write_total",
        "Cache fills discarded because their tag was invalidated mid-load.",
    ),
    (MetricKind::Counter, "gitpress_webhook_total", "Webhook deliveries by outcome."),
    (MetricKind::Gauge, "gitpress_refresh_queue_len", "Pending refresh events."),
    (
        MetricKind::Counter,
        "gitpress_refresh_dropped_total",
        "Refresh events dropped due to queue overflow.",
    ),
    (MetricKind::Histogram, "gitpress_refresh_ms", "Refresh batch latency in milliseconds."),
    (
        MetricKind::Histogram,
        "gitpress_content_fetch_ms",
        "GitHub contents API latency in milliseconds.",
    ),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. Logs go to stderr.
///
/// `GITPRESS_LOG`, when set, replaces the configured level entirely.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    METRIC_DESCRIPTIONS.call_once(describe_metrics);

    let env_filter = build_filter(logging)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn build_filter(logging: &LoggingSettings) -> Result<EnvFilter, InfraError> {
    let builder = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .with_env_var(LOG_FILTER_ENV);

    if std::env::var_os(LOG_FILTER_ENV).is_some() {
        return builder
            .try_from_env()
            .map_err(|err| InfraError::telemetry(format!("invalid {LOG_FILTER_ENV}: {err}")));
    }

    let mut filter = builder.parse_lossy("");
    for directive in QUIET_DEPENDENCIES {
        let directive: Directive = directive
            .parse()
            .map_err(|err| InfraError::telemetry(format!("bad directive `{directive}`: {err}")))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn describe_metrics() {
    for (kind, name, description) in METRICS {
        let name = *name;
        let description = *description;
        match kind {
            MetricKind::Counter => describe_counter!(name, Unit::Count, description),
            MetricKind::Gauge => describe_gauge!(name, Unit::Count, description),
            MetricKind::Histogram => describe_histogram!(name, Unit::Milliseconds, description),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = METRICS.iter().map(|(_, name, _)| *name).collect();
        assert_eq!(names.len(), METRICS.len());
        assert!(names.iter().all(|name| name.starts_with("gitpress_")));
    }

    #[test]
    fn default_filter_quiets_dependencies() {
        let logging = LoggingSettings {
            level: LevelFilter::DEBUG,
            format: LogFormat::Compact,
        };
        let filter = build_filter(&logging).expect("filter");
        let rendered = filter.to_string();
        assert!(rendered.contains("hyper=info"));
        assert!(rendered.contains("debug"));
    }
}

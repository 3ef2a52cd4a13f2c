//! Log subscriber setup.
//!
//! The subscriber is a stack of three layers on one registry:
//! the env filter, the log-metric bridge, and the formatter. The bridge sits
//! behind the filter, so it counts exactly the events that get logged.

use rpcd_metrics::LogMetricsLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogConfig, LogFormat};

/// Build the env filter: `RUST_LOG` wins over the configured directive.
fn env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Install the global subscriber with the log-metric bridge attached.
///
/// Must be called once, after metrics are initialized.
pub fn init(config: &LogConfig, log_metrics: LogMetricsLayer) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(log_metrics);

    match config.format {
        LogFormat::Text => subscriber.with(fmt::layer().with_target(true)).try_init()?,
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
    }
    Ok(())
}

/// Standardized span constructors for daemon observability.
pub mod spans {
    use tracing::{Span, debug_span};

    /// Span around one scrape of the metrics endpoint.
    pub fn scrape(collectors: usize) -> Span {
        debug_span!("scrape", collectors)
    }
}

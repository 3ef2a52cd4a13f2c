//! rpcd - RPC daemon with Prometheus metrics.
//!
//! Startup order: configuration, metrics registry, log subscriber (with the
//! log-metric bridge attached), then the `/metrics` exporter.

mod config;
mod http;
mod telemetry;
mod version;

use crate::config::Config;
use anyhow::Context;
use rpcd_metrics::{MetricsOptions, MetricsSubsystem};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rpcd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    if let Err(errors) = config::validate(&config) {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("invalid configuration:\n  {}", details.join("\n  "));
    }

    // Metrics must exist before the subscriber so the bridge sees every event.
    let build = version::build_info();
    let mut options = MetricsOptions::new(&config.metrics.namespace)
        .with_log_levels(config.metrics.log_levels.clone());
    if !config.metrics.process_collector {
        options = options.without_process_collector();
    }
    if config.metrics.runtime_collector {
        options = options.with_runtime(tokio::runtime::Handle::current());
    }
    let metrics = MetricsSubsystem::init(&options, &build)
        .context("failed to initialize metrics registry")?;

    telemetry::init(&config.log, metrics.log_layer())?;

    info!(
        version = %build.version,
        commit = %build.commit,
        branch = %build.branch,
        built = %build.build_timestamp,
        rustc = %build.rustc_version,
        "Starting rpcd"
    );
    info!(
        collectors = metrics.registry().len(),
        runtime_collectors = metrics.runtime_collectors(),
        "Metrics initialized"
    );

    // Convention: port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.metrics.port();
    if metrics_port == 0 {
        info!("Metrics endpoint disabled");
    } else {
        let listener = http::bind(metrics_port).await?;
        tokio::spawn(http::run_http_server(listener, metrics.registry().clone()));
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    shutdown_signal().await;
    info!("Shutting down");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

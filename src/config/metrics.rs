//! Metrics configuration.

use rpcd_metrics::LogLevel;
use serde::Deserialize;

use super::types::default_true;

/// Metrics configuration (`[metrics]` block).
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prefix of every exported metric name (default: "rpcd").
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Prometheus metrics HTTP port (default: 9090). 0 disables the endpoint.
    pub port: Option<u16>,
    /// Register the OS process collector (Linux only).
    #[serde(default = "default_true")]
    pub process_collector: bool,
    /// Register the tokio runtime collector.
    #[serde(default = "default_true")]
    pub runtime_collector: bool,
    /// Log levels counted by `<namespace>_log_<level>_total` counters.
    #[serde(default = "default_log_levels")]
    pub log_levels: Vec<LogLevel>,
}

impl MetricsConfig {
    /// Effective HTTP port, with the default applied.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_METRICS_PORT)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            port: None,
            process_collector: true,
            runtime_collector: true,
            log_levels: default_log_levels(),
        }
    }
}

const DEFAULT_METRICS_PORT: u16 = 9090;

fn default_namespace() -> String {
    "rpcd".to_string()
}

fn default_log_levels() -> Vec<LogLevel> {
    LogLevel::ALL.to_vec()
}

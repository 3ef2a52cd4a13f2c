//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level config struct and file loading
//! - [`metrics`]: Metrics registry and exporter configuration
//! - [`log`]: Log filter and output format
//! - [`validation`]: Startup checks

mod log;
mod metrics;
mod types;
mod validation;

pub use log::{LogConfig, LogFormat};
pub use metrics::MetricsConfig;
pub use types::{Config, ConfigError};
pub use validation::{ValidationError, validate};

//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use rpcd_metrics::LogLevel;
use std::collections::HashSet;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("metrics.namespace must match [a-zA-Z_][a-zA-Z0-9_]*, got '{0}'")]
    InvalidNamespace(String),
    #[error("metrics.log_levels lists '{0}' more than once")]
    DuplicateLogLevel(LogLevel),
    #[error("log.level is not a valid filter directive: {0}")]
    InvalidLogFilter(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !rpcd_metrics::is_valid_namespace(&config.metrics.namespace) {
        errors.push(ValidationError::InvalidNamespace(
            config.metrics.namespace.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for level in &config.metrics.log_levels {
        if !seen.insert(*level) {
            errors.push(ValidationError::DuplicateLogLevel(*level));
        }
    }

    if let Err(e) = EnvFilter::try_new(&config.log.level) {
        errors.push(ValidationError::InvalidLogFilter(e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

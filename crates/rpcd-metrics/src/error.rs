//! Errors raised while building and registering collectors.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors that can occur while setting up metrics.
///
/// All of these are startup errors. Once the subsystem is initialized nothing
/// in this crate returns an error on the hot path.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A collector with the same name and label names is already registered.
    #[error("metric already registered: {identity}")]
    Duplicate {
        /// Identity (`name{label,...}`) that collided.
        identity: String,
    },

    #[error("invalid metric namespace '{0}': must match [a-zA-Z_][a-zA-Z0-9_]*")]
    InvalidNamespace(String),

    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

impl MetricsError {
    /// Whether this error is an identity collision.
    #[inline]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

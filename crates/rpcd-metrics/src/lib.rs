//! # rpcd-metrics
//!
//! Metrics registration and log-to-metric bridging for the rpcd daemon.
//!
//! - [`CollectorRegistry`]: one shared sink for every collector, rejecting
//!   duplicate metric identities.
//! - [`publish_build_info`]: a constant `*_build_info` series carrying the
//!   build identity as labels.
//! - [`RuntimeCollector`] and [`process_collector`]: tokio runtime and OS
//!   process samples.
//! - [`LogMetrics`]: one counter per log level, fed by a `tracing` layer.
//! - [`MetricsSubsystem`]: registers all of the above in one call at startup.
//!
//! ## Quick Start
//!
//! ```rust
//! use rpcd_metrics::{BuildInfo, MetricsOptions, MetricsSubsystem};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let options = MetricsOptions::new("rpcd").without_process_collector();
//! let metrics = MetricsSubsystem::init(&options, &BuildInfo::default()).unwrap();
//!
//! let subscriber = tracing_subscriber::registry().with(metrics.log_layer());
//! tracing::subscriber::with_default(subscriber, || tracing::error!("boom"));
//!
//! assert!(metrics.registry().gather_text().contains("rpcd_log_error_total 1"));
//! ```

#![deny(clippy::all)]

pub mod build_info;
pub mod error;
pub mod log_metrics;
pub mod registry;
pub mod runtime;
pub mod subsystem;

pub use self::build_info::{publish_build_info, BuildInfo, BUILD_INFO_LABELS};
pub use self::error::{MetricsError, Result};
pub use self::log_metrics::{LogLevel, LogMetrics, LogMetricsLayer, UnknownLogLevel};
pub use self::registry::{sample_value, CollectorRegistry, MetricIdentity, RegisteredCollector};
pub use self::runtime::{process_collector, RuntimeCollector};
pub use self::subsystem::{is_valid_namespace, MetricsOptions, MetricsSubsystem};

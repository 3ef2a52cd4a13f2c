//! Startup wiring for the whole metrics subsystem.

use tokio::runtime::Handle;

use crate::build_info::{publish_build_info, BuildInfo};
use crate::error::{MetricsError, Result};
use crate::log_metrics::{LogLevel, LogMetrics, LogMetricsLayer};
use crate::registry::CollectorRegistry;
use crate::runtime::{process_collector, RuntimeCollector};

/// What [`MetricsSubsystem::init`] should register.
#[derive(Debug, Clone)]
pub struct MetricsOptions {
    /// Prefix of every metric name.
    pub namespace: String,
    /// Register the OS process collector (Linux only).
    pub process_collector: bool,
    /// Runtime to sample. `None` skips the runtime collector.
    pub runtime: Option<Handle>,
    /// Levels the log bridge counts.
    pub log_levels: Vec<LogLevel>,
}

impl MetricsOptions {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            process_collector: true,
            runtime: None,
            log_levels: LogLevel::ALL.to_vec(),
        }
    }

    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn without_process_collector(mut self) -> Self {
        self.process_collector = false;
        self
    }

    pub fn with_log_levels(mut self, levels: impl Into<Vec<LogLevel>>) -> Self {
        self.log_levels = levels.into();
        self
    }
}

/// Whether `namespace` is usable as a metric name prefix.
pub fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The registry plus handles to everything registered at startup.
#[derive(Clone)]
pub struct MetricsSubsystem {
    registry: CollectorRegistry,
    log_metrics: LogMetrics,
    runtime_collectors: usize,
}

impl MetricsSubsystem {
    /// Initialize metrics into a fresh registry.
    pub fn init(options: &MetricsOptions, build: &BuildInfo) -> Result<Self> {
        Self::init_with_registry(CollectorRegistry::new(), options, build)
    }

    /// Initialize metrics into `registry`.
    ///
    /// Registers runtime/process collectors, the build info gauge and the log
    /// counters. Any registration failure aborts initialization.
    pub fn init_with_registry(
        registry: CollectorRegistry,
        options: &MetricsOptions,
        build: &BuildInfo,
    ) -> Result<Self> {
        let namespace = options.namespace.as_str();
        if !is_valid_namespace(namespace) {
            return Err(MetricsError::InvalidNamespace(options.namespace.clone()));
        }

        let mut runtime_collectors = 0;
        if options.process_collector {
            if let Some(collector) = process_collector(namespace) {
                registry.register(collector)?;
                runtime_collectors += 1;
            } else {
                tracing::debug!("Process collector unavailable on this platform");
            }
        }
        if let Some(handle) = &options.runtime {
            registry.register(RuntimeCollector::new(namespace, handle.clone())?)?;
            runtime_collectors += 1;
        }

        publish_build_info(&registry, namespace, build)?;

        let log_metrics = LogMetrics::new(namespace, &options.log_levels)?;
        log_metrics.register(&registry)?;

        tracing::debug!(
            namespace,
            collectors = registry.len(),
            "Metrics registry initialized"
        );

        Ok(Self {
            registry,
            log_metrics,
            runtime_collectors,
        })
    }

    /// Shared registry, for the exporter.
    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }

    pub fn log_metrics(&self) -> &LogMetrics {
        &self.log_metrics
    }

    /// Layer to add to the logging subscriber.
    pub fn log_layer(&self) -> LogMetricsLayer {
        self.log_metrics.layer()
    }

    /// Number of runtime/process collectors that were registered.
    pub fn runtime_collectors(&self) -> usize {
        self.runtime_collectors
    }
}

impl std::fmt::Debug for MetricsSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSubsystem")
            .field("registry", &self.registry)
            .field("log_metrics", &self.log_metrics)
            .field("runtime_collectors", &self.runtime_collectors)
            .finish_non_exhaustive()
    }
}

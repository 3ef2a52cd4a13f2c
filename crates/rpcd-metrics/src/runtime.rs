//! Runtime and process collectors.
//!
//! - [`RuntimeCollector`]: tokio scheduler gauges and process uptime, sampled
//!   on every scrape.
//! - [`process_collector`]: the OS process collector from `prometheus`
//!   (resident memory, CPU seconds, fds, threads). Linux only; `None`
//!   elsewhere or without the `process` feature.

use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntGauge, Opts};
use tokio::runtime::Handle;

use crate::error::Result;

/// Number of metric families reported by [`RuntimeCollector`].
const RUNTIME_METRICS: usize = 4;

/// Samples a tokio runtime on demand.
pub struct RuntimeCollector {
    handle: Handle,
    started: Instant,
    descs: Vec<Desc>,
    workers: IntGauge,
    alive_tasks: IntGauge,
    global_queue_depth: IntGauge,
    uptime: Gauge,
}

impl RuntimeCollector {
    /// Collector for `handle`, with metric names under `namespace`.
    pub fn new(namespace: &str, handle: Handle) -> Result<Self> {
        let workers = IntGauge::with_opts(
            Opts::new("workers", "Number of worker threads used by the runtime")
                .namespace(namespace)
                .subsystem("runtime"),
        )?;
        let alive_tasks = IntGauge::with_opts(
            Opts::new("alive_tasks", "Number of tasks currently alive in the runtime")
                .namespace(namespace)
                .subsystem("runtime"),
        )?;
        let global_queue_depth = IntGauge::with_opts(
            Opts::new(
                "global_queue_depth",
                "Number of tasks waiting in the runtime's global queue",
            )
            .namespace(namespace)
            .subsystem("runtime"),
        )?;
        let uptime = Gauge::with_opts(
            Opts::new("uptime_seconds", "Seconds since the collector was created")
                .namespace(namespace)
                .subsystem("process"),
        )?;

        let mut descs = Vec::with_capacity(RUNTIME_METRICS);
        descs.extend(workers.desc().into_iter().cloned());
        descs.extend(alive_tasks.desc().into_iter().cloned());
        descs.extend(global_queue_depth.desc().into_iter().cloned());
        descs.extend(uptime.desc().into_iter().cloned());

        Ok(Self {
            handle,
            started: Instant::now(),
            descs,
            workers,
            alive_tasks,
            global_queue_depth,
            uptime,
        })
    }
}

impl Collector for RuntimeCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let metrics = self.handle.metrics();
        self.workers.set(metrics.num_workers() as i64);
        self.alive_tasks.set(metrics.num_alive_tasks() as i64);
        self.global_queue_depth.set(metrics.global_queue_depth() as i64);
        self.uptime.set(self.started.elapsed().as_secs_f64());

        let mut families = Vec::with_capacity(RUNTIME_METRICS);
        families.extend(self.workers.collect());
        families.extend(self.alive_tasks.collect());
        families.extend(self.global_queue_depth.collect());
        families.extend(self.uptime.collect());
        families
    }
}

/// The OS process collector for this process, where supported.
#[cfg(all(feature = "process", target_os = "linux"))]
pub fn process_collector(
    namespace: &str,
) -> Option<prometheus::process_collector::ProcessCollector> {
    Some(prometheus::process_collector::ProcessCollector::new(
        std::process::id() as i32,
        namespace,
    ))
}

/// The OS process collector for this process, where supported.
#[cfg(not(all(feature = "process", target_os = "linux")))]
pub fn process_collector(_namespace: &str) -> Option<NoProcessCollector> {
    None
}

/// Placeholder type on platforms without a process collector. Never constructed.
#[cfg(not(all(feature = "process", target_os = "linux")))]
pub enum NoProcessCollector {}

#[cfg(not(all(feature = "process", target_os = "linux")))]
impl Collector for NoProcessCollector {
    fn desc(&self) -> Vec<&Desc> {
        match *self {}
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{sample_value, CollectorRegistry};

    #[test]
    fn runtime_collector_reports_workers() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let registry = CollectorRegistry::new();
        registry
            .register(RuntimeCollector::new("rpcd", runtime.handle().clone()).unwrap())
            .unwrap();

        let families = registry.gather();
        assert_eq!(sample_value(&families, "rpcd_runtime_workers", &[]), Some(2.0));
        assert!(sample_value(&families, "rpcd_runtime_alive_tasks", &[]).is_some());
        assert!(sample_value(&families, "rpcd_process_uptime_seconds", &[]).unwrap() >= 0.0);
        assert_eq!(registry.identities().len(), RUNTIME_METRICS);
    }

    #[tokio::test]
    async fn current_runtime_handle_is_sampled() {
        let registry = CollectorRegistry::new();
        registry
            .register(RuntimeCollector::new("rpcd", Handle::current()).unwrap())
            .unwrap();

        let families = registry.gather();
        assert_eq!(sample_value(&families, "rpcd_runtime_workers", &[]), Some(1.0));
    }

    #[cfg(all(feature = "process", target_os = "linux"))]
    #[test]
    fn process_collector_registers() {
        let registry = CollectorRegistry::new();
        registry.register(process_collector("rpcd").unwrap()).unwrap();
        assert!(registry.contains("rpcd_process_resident_memory_bytes"));
    }
}

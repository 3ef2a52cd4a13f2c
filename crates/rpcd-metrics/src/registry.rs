//! The process-wide collector registry.
//!
//! [`CollectorRegistry`] wraps a [`prometheus::Registry`] and adds two things
//! the exporter and the startup code rely on:
//!
//! - an explicit identity check (metric name + label names) that rejects
//!   duplicates with [`MetricsError::Duplicate`] instead of overwriting;
//! - an enumeration of every registered collector, in registration order.
//!
//! The registry is a cheap handle (`Arc` inside). Clone it into every
//! component that registers metrics at startup and into the exporter.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

use crate::error::{MetricsError, Result};

/// Identity of one metric family: fully-qualified name plus sorted label names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricIdentity {
    pub name: String,
    pub label_names: Vec<String>,
}

impl MetricIdentity {
    fn from_desc(desc: &Desc) -> Self {
        let mut label_names: Vec<String> = desc
            .const_label_pairs
            .iter()
            .map(|pair| pair.get_name().to_string())
            .chain(desc.variable_labels.iter().cloned())
            .collect();
        label_names.sort();
        Self {
            name: desc.fq_name.clone(),
            label_names,
        }
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.label_names.join(","))
    }
}

/// A collector owned by the registry, with the identities it exposes.
#[derive(Clone)]
pub struct RegisteredCollector {
    identities: Vec<MetricIdentity>,
    collector: Arc<dyn Collector>,
}

impl RegisteredCollector {
    /// Identities of the metric families this collector reports.
    pub fn identities(&self) -> &[MetricIdentity] {
        &self.identities
    }

    /// Current samples of this collector.
    pub fn collect(&self) -> Vec<MetricFamily> {
        self.collector.collect()
    }
}

impl fmt::Debug for RegisteredCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCollector")
            .field("identities", &self.identities)
            .finish_non_exhaustive()
    }
}

/// Hands a shared collector to the prometheus registry while we keep our own
/// reference for enumeration.
struct SharedCollector(Arc<dyn Collector>);

impl Collector for SharedCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.0.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.0.collect()
    }
}

#[derive(Default)]
struct Entries {
    identities: BTreeSet<MetricIdentity>,
    collectors: Vec<RegisteredCollector>,
}

struct Inner {
    prometheus: prometheus::Registry,
    entries: RwLock<Entries>,
}

/// Shared sink for every collector in the process.
#[derive(Clone)]
pub struct CollectorRegistry {
    inner: Arc<Inner>,
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                prometheus: prometheus::Registry::new(),
                entries: RwLock::new(Entries::default()),
            }),
        }
    }

    /// Register a collector.
    ///
    /// Fails with [`MetricsError::Duplicate`] if any metric family the
    /// collector describes shares its name and label names with one already
    /// registered (or with another family of the same collector). The first
    /// registration is left untouched.
    pub fn register<C>(&self, collector: C) -> Result<()>
    where
        C: Collector + 'static,
    {
        self.register_all(std::iter::once(collector))
    }

    /// Register several collectors as one unit.
    ///
    /// Either every collector is registered or none is: identities are
    /// checked for the whole batch before anything is added, and a rejection
    /// from the underlying registry rolls back the collectors already added.
    pub fn register_all<C, I>(&self, collectors: I) -> Result<()>
    where
        C: Collector + 'static,
        I: IntoIterator<Item = C>,
    {
        let prepared: Vec<(Arc<dyn Collector>, Vec<MetricIdentity>)> = collectors
            .into_iter()
            .map(|collector| {
                let collector: Arc<dyn Collector> = Arc::new(collector);
                let identities = collector
                    .desc()
                    .into_iter()
                    .map(MetricIdentity::from_desc)
                    .collect();
                (collector, identities)
            })
            .collect();

        let mut entries = self.inner.entries.write();

        let mut seen = BTreeSet::new();
        for identity in prepared.iter().flat_map(|(_, identities)| identities) {
            if entries.identities.contains(identity) || !seen.insert(identity) {
                return Err(MetricsError::Duplicate {
                    identity: identity.to_string(),
                });
            }
        }

        let mut added: Vec<Arc<dyn Collector>> = Vec::with_capacity(prepared.len());
        for (collector, identities) in &prepared {
            let result = self
                .inner
                .prometheus
                .register(Box::new(SharedCollector(Arc::clone(collector))));
            if let Err(e) = result {
                for collector in added {
                    let _ = self
                        .inner
                        .prometheus
                        .unregister(Box::new(SharedCollector(collector)));
                }
                return Err(rejection(e, identities));
            }
            added.push(Arc::clone(collector));
        }

        for (collector, identities) in prepared {
            entries.identities.extend(identities.iter().cloned());
            entries.collectors.push(RegisteredCollector {
                identities,
                collector,
            });
        }
        Ok(())
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.inner.entries.read().collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered collectors, in registration order.
    pub fn collectors(&self) -> Vec<RegisteredCollector> {
        self.inner.entries.read().collectors.clone()
    }

    /// Every registered identity, sorted.
    pub fn identities(&self) -> Vec<MetricIdentity> {
        self.inner.entries.read().identities.iter().cloned().collect()
    }

    /// Whether a metric family with this fully-qualified name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .entries
            .read()
            .identities
            .iter()
            .any(|identity| identity.name == name)
    }

    /// Collect every registered family, sorted by name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.prometheus.gather()
    }

    /// Gather all metrics and encode them in the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            return String::new();
        }
        match String::from_utf8(buffer) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
                String::new()
            }
        }
    }
}

fn rejection(error: prometheus::Error, identities: &[MetricIdentity]) -> MetricsError {
    match error {
        prometheus::Error::AlreadyReg => MetricsError::Duplicate {
            identity: identities
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
        },
        other => MetricsError::Prometheus(other),
    }
}

impl fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("collectors", &self.len())
            .finish()
    }
}

/// Read the value of a counter or gauge sample from gathered families.
///
/// `labels` must match the sample's label pairs exactly (order-insensitive).
/// Returns `None` if no such series exists.
pub fn sample_value(
    families: &[MetricFamily],
    name: &str,
    labels: &[(&str, &str)],
) -> Option<f64> {
    let family = families.iter().find(|mf| mf.get_name() == name)?;
    family.get_metric().iter().find_map(|metric| {
        let pairs = metric.get_label();
        let matches = pairs.len() == labels.len()
            && labels.iter().all(|(k, v)| {
                pairs
                    .iter()
                    .any(|pair| pair.get_name() == *k && pair.get_value() == *v)
            });
        if !matches {
            return None;
        }
        if metric.has_counter() {
            Some(metric.get_counter().get_value())
        } else if metric.has_gauge() {
            Some(metric.get_gauge().get_value())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};

    #[test]
    fn register_and_enumerate() {
        let registry = CollectorRegistry::new();
        let c = IntCounter::new("test_events_total", "events").unwrap();
        registry.register(c.clone()).unwrap();
        c.inc();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("test_events_total"));
        let collected = registry.collectors()[0].collect();
        assert_eq!(collected[0].get_metric()[0].get_counter().get_value(), 1.0);
    }

    #[test]
    fn duplicate_is_rejected_and_first_kept() {
        let registry = CollectorRegistry::new();
        let first = IntCounter::new("dup_total", "first").unwrap();
        let second = IntCounter::new("dup_total", "second").unwrap();
        first.inc_by(7);
        second.inc();

        registry.register(first).unwrap();
        let err = registry.register(second).unwrap_err();
        assert!(err.is_duplicate(), "unexpected error: {err}");
        assert_eq!(registry.len(), 1);

        let families = registry.gather();
        assert_eq!(sample_value(&families, "dup_total", &[]), Some(7.0));
    }

    #[test]
    fn same_name_different_labels_is_a_collision() {
        let registry = CollectorRegistry::new();
        registry
            .register(IntCounterVec::new(Opts::new("req_total", "requests"), &["method"]).unwrap())
            .unwrap();
        let err = registry
            .register(IntCounterVec::new(Opts::new("req_total", "requests"), &["path"]).unwrap())
            .unwrap_err();
        assert!(err.is_duplicate(), "unexpected error: {err}");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.identities()[0].label_names,
            vec!["method".to_string()]
        );
    }

    #[test]
    fn batch_with_duplicate_registers_nothing() {
        let registry = CollectorRegistry::new();
        registry
            .register(IntCounter::new("b_total", "taken").unwrap())
            .unwrap();

        let batch = vec![
            IntCounter::new("a_total", "a").unwrap(),
            IntCounter::new("b_total", "b").unwrap(),
            IntCounter::new("c_total", "c").unwrap(),
        ];
        assert!(registry.register_all(batch).unwrap_err().is_duplicate());

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("a_total"));
        assert!(!registry.contains("c_total"));
    }

    #[test]
    fn batch_rejected_midway_is_rolled_back() {
        let registry = CollectorRegistry::new();
        registry
            .register(IntCounterVec::new(Opts::new("req_total", "requests"), &["method"]).unwrap())
            .unwrap();

        let batch = vec![
            IntCounterVec::new(Opts::new("a_total", "a"), &["kind"]).unwrap(),
            IntCounterVec::new(Opts::new("req_total", "requests"), &["path"]).unwrap(),
        ];
        assert!(registry.register_all(batch).is_err());

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("a_total"));
        let families = registry.gather();
        assert!(families.iter().all(|mf| mf.get_name() != "a_total"));

        registry
            .register(IntCounterVec::new(Opts::new("a_total", "a"), &["kind"]).unwrap())
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn identity_display_lists_sorted_labels() {
        let vec = IntCounterVec::new(Opts::new("x_total", "x"), &["zeta", "alpha"]).unwrap();
        let identity = MetricIdentity::from_desc(vec.desc()[0]);
        assert_eq!(identity.to_string(), "x_total{alpha,zeta}");
    }

    #[test]
    fn gather_text_contains_help_and_value() {
        let registry = CollectorRegistry::new();
        let g = IntGauge::new("queue_depth", "Items waiting").unwrap();
        g.set(3);
        registry.register(g).unwrap();

        let text = registry.gather_text();
        assert!(text.contains("# HELP queue_depth Items waiting"));
        assert!(text.contains("queue_depth 3"));
    }

    #[test]
    fn clones_share_the_same_sink() {
        let registry = CollectorRegistry::new();
        let handle = registry.clone();
        handle
            .register(IntCounter::new("shared_total", "shared").unwrap())
            .unwrap();
        assert_eq!(registry.len(), 1);
    }
}

//! Log-to-counter bridge.
//!
//! [`LogMetrics`] owns one [`IntCounter`] per log level it was built with,
//! named `<namespace>_log_<level>_total`. The set of levels is fixed when the
//! bridge is constructed and every counter is registered at startup; events
//! at any other level are dropped rather than creating new series.
//!
//! [`LogMetricsLayer`] attaches the bridge to a `tracing` subscriber:
//!
//! ```
//! use rpcd_metrics::{CollectorRegistry, LogLevel, LogMetrics};
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let registry = CollectorRegistry::new();
//! let log_metrics = LogMetrics::new("demo", &LogLevel::ALL).unwrap();
//! log_metrics.register(&registry).unwrap();
//!
//! let subscriber = tracing_subscriber::registry().with(log_metrics.layer());
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::warn!("disk almost full");
//! });
//!
//! assert_eq!(log_metrics.count(LogLevel::Warn), Some(1));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use prometheus::{IntCounter, Opts};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::{MetricsError, Result};
use crate::registry::CollectorRegistry;

/// Log categories the bridge can count: the `tracing` levels.
///
/// Deserializes through [`FromStr`], so config files accept the same names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String"))]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Every level, most severe first.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Lowercase name, used in metric names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        if level == Level::ERROR {
            Self::Error
        } else if level == Level::WARN {
            Self::Warn
        } else if level == Level::INFO {
            Self::Info
        } else if level == Level::DEBUG {
            Self::Debug
        } else {
            Self::Trace
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogLevel(pub String);

impl fmt::Display for UnknownLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level '{}'", self.0)
    }
}

impl std::error::Error for UnknownLogLevel {}

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = UnknownLogLevel;

    fn try_from(s: String) -> std::result::Result<Self, <LogLevel as TryFrom<String>>::Error> {
        s.parse()
    }
}

struct Inner {
    counters: [Option<IntCounter>; 5],
    dropped: AtomicU64,
}

/// One counter per enabled log level.
///
/// Cloning is cheap and every clone increments the same counters.
#[derive(Clone)]
pub struct LogMetrics {
    inner: Arc<Inner>,
}

impl LogMetrics {
    /// Build counters for `levels` under `namespace`.
    ///
    /// Counters are not registered yet; call [`LogMetrics::register`].
    /// Listing the same level twice is rejected as a duplicate.
    pub fn new(namespace: &str, levels: &[LogLevel]) -> Result<Self> {
        let mut counters: [Option<IntCounter>; 5] = Default::default();
        for &level in levels {
            let slot = &mut counters[level.index()];
            if slot.is_some() {
                return Err(MetricsError::Duplicate {
                    identity: format!("{namespace}_log_{level}_total{{}}"),
                });
            }
            let opts = Opts::new(
                format!("{level}_total"),
                format!("Number of log records emitted at level {level}"),
            )
            .namespace(namespace)
            .subsystem("log");
            *slot = Some(IntCounter::with_opts(opts)?);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                counters,
                dropped: AtomicU64::new(0),
            }),
        })
    }

    /// Register every counter, or none of them if any collides.
    pub fn register(&self, registry: &CollectorRegistry) -> Result<()> {
        registry.register_all(self.inner.counters.iter().flatten().cloned())
    }

    /// Levels this bridge counts, most severe first.
    pub fn levels(&self) -> Vec<LogLevel> {
        LogLevel::ALL
            .into_iter()
            .filter(|level| self.inner.counters[level.index()].is_some())
            .collect()
    }

    /// Count one record at `level`.
    ///
    /// Records at a level without a counter only bump the internal drop tally.
    #[inline]
    pub fn record(&self, level: LogLevel) {
        match &self.inner.counters[level.index()] {
            Some(counter) => counter.inc(),
            None => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Current value of the counter for `level`, if it is counted.
    pub fn count(&self, level: LogLevel) -> Option<u64> {
        self.inner.counters[level.index()]
            .as_ref()
            .map(IntCounter::get)
    }

    /// Records seen at levels this bridge has no counter for.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// A `tracing_subscriber` layer feeding this bridge.
    pub fn layer(&self) -> LogMetricsLayer {
        LogMetricsLayer {
            metrics: self.clone(),
        }
    }
}

impl fmt::Debug for LogMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogMetrics")
            .field("levels", &self.levels())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Subscriber layer that counts every event it sees by level.
///
/// Never emits events of its own, so it cannot feed back into itself.
#[derive(Debug, Clone)]
pub struct LogMetricsLayer {
    metrics: LogMetrics,
}

impl<S> Layer<S> for LogMetricsLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.metrics.record(LogLevel::from(*event.metadata().level()));
    }
}

//! Build identity gauge.
//!
//! Publishes `<namespace>_build_info{version,rustc_version,commit,branch,build_timestamp} 1`.
//! The value only exists because a series needs one; the labels carry the
//! information.

use prometheus::{IntGaugeVec, Opts};

use crate::error::Result;
use crate::registry::CollectorRegistry;

/// Label names of the build info gauge, in value order.
pub const BUILD_INFO_LABELS: [&str; 5] = [
    "version",
    "rustc_version",
    "commit",
    "branch",
    "build_timestamp",
];

/// Identity of the running build, resolved before metrics are initialized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub branch: String,
    pub build_timestamp: String,
    pub rustc_version: String,
}

impl BuildInfo {
    /// Label values in [`BUILD_INFO_LABELS`] order.
    pub fn label_values(&self) -> [&str; 5] {
        [
            self.version.as_str(),
            self.rustc_version.as_str(),
            self.commit.as_str(),
            self.branch.as_str(),
            self.build_timestamp.as_str(),
        ]
    }

    /// Label pairs, for matching against gathered samples.
    pub fn label_pairs(&self) -> Vec<(&'static str, &str)> {
        BUILD_INFO_LABELS
            .into_iter()
            .zip(self.label_values())
            .collect()
    }
}

/// Register the build info gauge and set its single series to 1.
///
/// No handle is returned; the registry holds the only reference.
pub fn publish_build_info(
    registry: &CollectorRegistry,
    namespace: &str,
    info: &BuildInfo,
) -> Result<()> {
    let gauge = IntGaugeVec::new(
        Opts::new("info", "Build identity of the running daemon")
            .namespace(namespace)
            .subsystem("build"),
        &BUILD_INFO_LABELS,
    )?;
    registry.register(gauge.clone())?;
    gauge.with_label_values(&info.label_values()).inc();

    tracing::debug!(
        version = %info.version,
        commit = %info.commit,
        branch = %info.branch,
        "Published build info"
    );
    Ok(())
}

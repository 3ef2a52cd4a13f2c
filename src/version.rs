//! Build identity of this binary, captured by `build.rs`.

use rpcd_metrics::BuildInfo;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("RPCD_COMMIT");
pub const BRANCH: &str = env!("RPCD_BRANCH");
pub const BUILD_TIMESTAMP: &str = env!("RPCD_BUILD_TIMESTAMP");
pub const RUSTC_VERSION: &str = env!("RPCD_RUSTC_VERSION");

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        commit: COMMIT.to_string(),
        branch: BRANCH.to_string(),
        build_timestamp: BUILD_TIMESTAMP.to_string(),
        rustc_version: RUSTC_VERSION.to_string(),
    }
}

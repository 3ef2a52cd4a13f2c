use std::env;
use std::path::Path;
use std::process::Command;

use chrono::{SecondsFormat, Utc};

const UNKNOWN: &str = "unknown";

fn main() {
    for var in ["RPCD_COMMIT", "RPCD_BRANCH", "RPCD_BUILD_TIMESTAMP"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    if Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
    }

    let commit = env_or_else("RPCD_COMMIT", || {
        command_output("git", &["rev-parse", "--short=12", "HEAD"])
    });
    let branch = env_or_else("RPCD_BRANCH", || {
        command_output("git", &["rev-parse", "--abbrev-ref", "HEAD"])
    });
    let build_timestamp = env_or_else("RPCD_BUILD_TIMESTAMP", || {
        Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    });
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = command_output(&rustc, &["--version"]).unwrap_or_else(|| UNKNOWN.into());

    println!("cargo:rustc-env=RPCD_COMMIT={commit}");
    println!("cargo:rustc-env=RPCD_BRANCH={branch}");
    println!("cargo:rustc-env=RPCD_BUILD_TIMESTAMP={build_timestamp}");
    println!("cargo:rustc-env=RPCD_RUSTC_VERSION={rustc_version}");
}

fn env_or_else(var: &str, fallback: impl FnOnce() -> Option<String>) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(fallback)
        .unwrap_or_else(|| UNKNOWN.into())
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

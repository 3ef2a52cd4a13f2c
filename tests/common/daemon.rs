//! Test daemon management.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::time::sleep;

/// A running rpcd instance, killed on drop.
pub struct TestDaemon {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl TestDaemon {
    /// Spawn rpcd with the metrics endpoint on `port` and extra `[metrics]` lines.
    pub async fn spawn(port: u16, extra_metrics: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config_path = write_config(dir.path(), port, extra_metrics)?;
        let child = command(&config_path).spawn()?;

        let daemon = Self {
            child,
            port,
            _dir: dir,
        };
        daemon.wait_until_ready().await?;
        Ok(daemon)
    }

    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if self.scrape().await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("rpcd failed to serve /metrics within 5 seconds")
    }

    /// Fetch the text exposition from `/metrics`.
    pub async fn scrape(&self) -> anyhow::Result<String> {
        let body = reqwest::get(format!("http://127.0.0.1:{}/metrics", self.port))
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Run rpcd with the metrics endpoint on `port` and wait for it to exit.
///
/// Fails if it is still running after `timeout`.
#[allow(dead_code)]
pub async fn run_to_exit(port: u16, timeout: Duration) -> anyhow::Result<ExitStatus> {
    let dir = tempfile::tempdir()?;
    let config_path = write_config(dir.path(), port, "")?;
    let mut child = command(&config_path).stderr(Stdio::null()).spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!("rpcd still running after {timeout:?}");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

fn write_config(dir: &Path, port: u16, extra_metrics: &str) -> anyhow::Result<PathBuf> {
    let config_path = dir.join("rpcd.toml");
    let config_content = format!(
        r#"
[metrics]
namespace = "rpcd"
port = {port}
{extra_metrics}

[log]
level = "info"
"#
    );
    std::fs::write(&config_path, config_content)?;
    Ok(config_path)
}

fn command(config_path: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_rpcd"));
    command
        .arg(config_path)
        .env_remove("RUST_LOG")
        .stdout(Stdio::null());
    command
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Value of an unlabeled sample line `name value` in a text exposition.
#[allow(dead_code)]
pub fn sample(body: &str, name: &str) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (metric, value) = line.split_once(' ')?;
            (metric == name).then(|| value.trim().parse().ok()).flatten()
        })
}

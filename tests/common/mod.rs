//! Integration test common infrastructure.
//!
//! Spawns the rpcd binary against a temporary configuration and scrapes it.

pub mod daemon;

#[allow(unused_imports)]
pub use daemon::TestDaemon;

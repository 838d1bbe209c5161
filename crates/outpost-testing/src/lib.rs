//! Test support for Outpost.
//!
//! This crate provides testing tools including:
//! - A simulated panel collaborator whose calls return promises
//! - Instance status fixtures with serde support
//! - Logging initialization for test runs

pub mod panel_simulator;

pub use panel_simulator::{InstanceState, InstanceStatus, PanelSimulator};

use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

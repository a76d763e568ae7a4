//! Testing utilities for the contract harness
//!
//! In-memory provider, bundled fixtures, a recording timer and suite setup
//! helpers.

#![allow(missing_docs)]

mod fake_cloud;
mod fixtures;
mod timer;

pub use fake_cloud::{Call, FakeCloud};
pub use fixtures::{Ec2Fixtures, DEFAULT_SCENARIO};
pub use timer::ManualTimer;

use contract_harness::{HarnessConfig, Suite};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per process
///
/// Honors `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Default configuration pointing at the fake's long-lived instances
pub fn test_config() -> HarnessConfig {
    HarnessConfig::new()
}

/// Provider seeded with the instances `config` expects
pub fn setup_cloud(config: &HarnessConfig) -> Arc<FakeCloud> {
    Arc::new(FakeCloud::with_known_instances(
        config.running_instance.clone(),
        config.stopped_instance.clone(),
    ))
}

/// Standard suite wired to a fake provider and a recording timer
pub fn setup_standard_suite(config: HarnessConfig) -> (Suite, Arc<FakeCloud>, Arc<ManualTimer>) {
    let cloud = setup_cloud(&config);
    let timer = Arc::new(ManualTimer::new());
    let suite = Suite::standard(cloud.clone(), Arc::new(Ec2Fixtures::load()), config)
        .with_timer(timer.clone());
    (suite, cloud, timer)
}

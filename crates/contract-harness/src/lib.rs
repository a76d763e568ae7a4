//! Contract Harness
//!
//! Live contract verification for an asynchronous cloud-instance API:
//! - Provisions throwaway instances and tracks every one for cleanup
//! - Polls instances until they converge on a desired state
//! - Compares live response shapes with canned fixtures
//! - Runs ordered scenarios and reports per-scenario outcomes
//!
//! # Example
//!
//! ```rust,ignore
//! use contract_harness::{HarnessConfig, Suite};
//!
//! # async fn example(client: std::sync::Arc<dyn contract_harness::ResourceClient>,
//! #                  fixtures: std::sync::Arc<dyn contract_harness::FixtureProvider>) {
//! let suite = Suite::standard(client, fixtures, HarnessConfig::new());
//! let report = suite.run().await;
//!
//! println!("{}", report.generate_text());
//! std::process::exit(if report.passed() { 0 } else { 1 });
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod client;
pub mod config;
pub mod error;
pub mod fixture;
pub mod poller;
pub mod registry;
pub mod scenario;
pub mod scenarios;
pub mod suite;
pub mod timer;
pub mod types;

// Re-exports for convenience
pub use client::{launched_instance_id, observed_state, ResourceClient};
pub use config::HarnessConfig;
pub use error::{
    CleanupError, ClientError, ConfigError, FixtureError, HarnessError, ShapeMismatch,
};
pub use fixture::FixtureProvider;
pub use poller::{PollOutcome, StatePoller};
pub use registry::{CleanupRegistry, CleanupReport};
pub use scenario::{Provisioned, Scenario, ScenarioContext, ScenarioKind};
pub use suite::{ScenarioOutcome, Suite, SuiteReport};
pub use timer::{Timer, TokioTimer};
pub use types::{
    InstanceState, LaunchParams, NetworkInterfaceSpec, Operation, ResourceHandle, StateAction,
    Tag,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing scenarios
    pub use crate::{
        HarnessConfig, HarnessError, InstanceState, Operation, ResourceHandle, Scenario,
        ScenarioContext, Suite, Tag,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

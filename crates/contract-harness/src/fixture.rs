//! Fixture provider seam
//!
//! Fixtures are canned response documents keyed by operation and an
//! optional scenario name. The harness only ever looks at their shape.

use crate::error::FixtureError;
use crate::types::Operation;
use contract_shape::Shape;
use serde_json::Value;

/// Scenario names understood by the standard fixture set
pub mod scenario {
    pub const SINGLE_INSTANCE: &str = "single instance";
    pub const RUNNING_INSTANCE: &str = "running instance";
    pub const STOPPED_INSTANCE: &str = "stopped instance";
    pub const WINDOWS_INSTANCE: &str = "windows instance";
    pub const ECON_SPAWNER_MACHINE: &str = "econ spawner machine";
    pub const SPAWNED_MACHINE: &str = "spawned machine";
}

/// Source of canned responses
pub trait FixtureProvider: Send + Sync {
    /// Canned response for `operation`, disambiguated by `scenario`
    ///
    /// # Errors
    /// `FixtureError::Missing` when nothing is registered for the pair
    fn fixture(&self, operation: Operation, scenario: Option<&str>) -> Result<Value, FixtureError>;

    /// Shape of the canned response
    ///
    /// # Errors
    /// Same as [`FixtureProvider::fixture`]
    fn shape_for(&self, operation: Operation, scenario: Option<&str>) -> Result<Shape, FixtureError> {
        self.fixture(operation, scenario).map(|value| Shape::of(&value))
    }
}

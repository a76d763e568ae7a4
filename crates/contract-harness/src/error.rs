//! Error types for the harness
//!
//! Provides error handling for:
//! - Remote calls that fail outright
//! - Convergence polls that give up
//! - Shape, kind and state mismatches against fixtures
//! - Cleanup failures that leak billable resources

use crate::types::{InstanceState, Operation, ResourceHandle};
use contract_shape::{Shape, ShapeDiff, ValueKind};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Remote call failed; never retried
    #[error("query failed: {0}")]
    Query(#[from] ClientError),

    /// Desired state not observed within the poll bound
    #[error(
        "{handle} did not reach {desired} after {attempts} attempt(s), last observed {last_observed}"
    )]
    Timeout {
        handle: ResourceHandle,
        desired: InstanceState,
        last_observed: InstanceState,
        attempts: u32,
    },

    /// Live response shape differs from the fixture shape
    #[error("{0}")]
    ShapeMismatch(Box<ShapeMismatch>),

    /// Live response has a different top-level type than the fixture
    #[error("{operation} returned {actual}, fixture is {expected}")]
    KindMismatch {
        operation: Operation,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Known instance is not in the state the run depends on
    #[error("{handle} is {observed}, expected {expected}")]
    StateMismatch {
        handle: ResourceHandle,
        expected: InstanceState,
        observed: InstanceState,
    },

    /// Response lacks a field the harness needs
    #[error("malformed {operation} response: {detail}")]
    MalformedResponse { operation: Operation, detail: String },

    /// Fixture lookup failed
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// Configuration rejected before the run started
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scenario exceeded its time budget
    #[error("scenario timed out after {duration_ms}ms")]
    ScenarioTimeout { duration_ms: u64 },

    /// Scenario panicked
    #[error("scenario panicked: {0}")]
    Panicked(String),
}

impl HarnessError {
    /// Check if error is transient and the scenario may be rerun
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Query(_) | Self::Timeout { .. } | Self::ScenarioTimeout { .. }
        )
    }

    /// Build a shape mismatch error
    pub fn shape_mismatch(mismatch: ShapeMismatch) -> Self {
        Self::ShapeMismatch(Box::new(mismatch))
    }
}

/// Failure reported by the remote resource client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}{}", code_suffix(.code.as_deref()))]
pub struct ClientError {
    /// Operation that failed
    pub operation: Operation,
    /// Provider error code (e.g. `InvalidInstanceID.NotFound`)
    pub code: Option<String>,
    pub message: String,
}

impl ClientError {
    #[inline]
    #[must_use]
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    /// With provider error code
    #[inline]
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Fixture lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureError {
    /// No fixture registered for the operation/scenario pair
    #[error("no fixture for {operation} ({})", .scenario.as_deref().unwrap_or("default"))]
    Missing {
        operation: Operation,
        scenario: Option<String>,
    },

    /// Override pointer does not address anything in the fixture
    #[error("override {pointer} does not exist in the {operation} fixture")]
    BadOverride { operation: Operation, pointer: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Termination of tracked resources failed at run end
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{} resource(s) leaked: {}",
    .leaked.len(),
    join_handles(.leaked)
)]
pub struct CleanupError {
    /// Handles not confirmed terminated
    pub leaked: Vec<ResourceHandle>,
    /// Underlying termination failures
    pub failures: Vec<ClientError>,
}

fn join_handles(handles: &[ResourceHandle]) -> String {
    handles
        .iter()
        .map(ResourceHandle::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Diagnostic payload of a failed structural comparison
#[derive(Debug, Clone)]
pub struct ShapeMismatch {
    pub operation: Operation,
    pub scenario: Option<String>,
    /// Fixture value (after overrides)
    pub expected: Value,
    /// Live response
    pub actual: Value,
    pub expected_shape: Shape,
    pub actual_shape: Shape,
    pub diff: ShapeDiff,
}

impl ShapeMismatch {
    #[must_use]
    pub fn new(
        operation: Operation,
        scenario: Option<&str>,
        expected: Value,
        actual: Value,
    ) -> Self {
        let expected_shape = Shape::of(&expected);
        let actual_shape = Shape::of(&actual);
        let diff = expected_shape.diff(&actual_shape);
        Self {
            operation,
            scenario: scenario.map(str::to_string),
            expected,
            actual,
            expected_shape,
            actual_shape,
            diff,
        }
    }
}

impl Display for ShapeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} response does not match fixture ({}):",
            self.operation,
            self.scenario.as_deref().unwrap_or("default")
        )?;
        writeln!(f, "expected: {}", self.expected)?;
        writeln!(f, "actual:   {}", self.actual)?;
        writeln!(f, "shape diff (- missing, + unexpected):")?;
        write!(f, "{}", self.diff)
    }
}

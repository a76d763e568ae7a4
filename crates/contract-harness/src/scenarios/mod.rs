//! Built-in scenarios
//!
//! Two preflight checks that the long-lived instances are where the run
//! expects them, then one contract check per instance API operation.

mod instances;
mod preflight;

pub use instances::{
    CreateTagsShape, DescribeAllKind, DescribeRunningShape, DescribeStoppedShape,
    PasswordDataShape, RunInstancesShape, StartInstancesShape, StopInstancesShape,
    TerminateInstancesShape,
};
pub use preflight::{RunningInstanceAvailable, StoppedInstanceAvailable};

use crate::scenario::Scenario;

/// Preflight checks followed by every contract scenario, in run order
#[must_use]
pub fn standard() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(RunningInstanceAvailable),
        Box::new(StoppedInstanceAvailable),
        Box::new(CreateTagsShape),
        Box::new(DescribeAllKind),
        Box::new(DescribeRunningShape),
        Box::new(DescribeStoppedShape),
        Box::new(PasswordDataShape),
        Box::new(RunInstancesShape),
        Box::new(StartInstancesShape),
        Box::new(StopInstancesShape),
        Box::new(TerminateInstancesShape),
    ]
}

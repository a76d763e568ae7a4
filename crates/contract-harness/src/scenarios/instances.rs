//! Contract scenarios for the instance API
//!
//! Each scenario drives live calls and compares response shapes with the
//! fixture for the same operation. Instances launched here are registered
//! by `provision` and terminated by the suite at run end.

use crate::error::HarnessError;
use crate::fixture::scenario;
use crate::scenario::{Scenario, ScenarioContext};
use crate::types::{InstanceState, Operation, Tag};
use async_trait::async_trait;
use serde_json::json;

/// Pointer to the first described instance's tags
const FIRST_INSTANCE_TAGS: &str = "/Reservations/0/Instances/0/Tags";

/// Tagging a fresh machine returns the `CreateTags` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTagsShape;

#[async_trait]
impl Scenario for CreateTagsShape {
    fn name(&self) -> &str {
        "create tags matches expected structure"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.spawn_test_machine().await?;
        let response = ctx.tag(&handle, &[Tag::new("Name", "foo")]).await?;
        ctx.expect_shape(Operation::CreateTags, None, &response)
    }
}

/// Describing without ids returns the same kind of document as the fixture
#[derive(Debug, Clone, Copy, Default)]
pub struct DescribeAllKind;

#[async_trait]
impl Scenario for DescribeAllKind {
    fn name(&self) -> &str {
        "describe instances matches type of naked call"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let response = ctx.describe(&[]).await?;
        ctx.expect_kind(Operation::DescribeInstances, None, &response)
    }
}

/// The long-lived running instance has the single-instance shape
///
/// The running instance carries no tags, so the fixture's tag list is
/// emptied before comparing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescribeRunningShape;

#[async_trait]
impl Scenario for DescribeRunningShape {
    fn name(&self) -> &str {
        "describe instances matches structure for a running machine"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.config().running_instance.clone();
        let response = ctx.describe(&[handle]).await?;
        ctx.expect_shape_with_overrides(
            Operation::DescribeInstances,
            Some(scenario::SINGLE_INSTANCE),
            &[(FIRST_INSTANCE_TAGS, json!([]))],
            &response,
        )
    }
}

/// The long-lived stopped instance has the stopped-instance shape
#[derive(Debug, Clone, Copy, Default)]
pub struct DescribeStoppedShape;

#[async_trait]
impl Scenario for DescribeStoppedShape {
    fn name(&self) -> &str {
        "describe instances matches structure for a stopped machine"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.config().stopped_instance.clone();
        let response = ctx.describe(&[handle]).await?;
        ctx.expect_shape(
            Operation::DescribeInstances,
            Some(scenario::STOPPED_INSTANCE),
            &response,
        )
    }
}

/// Password data of the running instance has the Windows-instance shape
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordDataShape;

#[async_trait]
impl Scenario for PasswordDataShape {
    fn name(&self) -> &str {
        "get password data matches expected structure"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.config().running_instance.clone();
        let response = ctx.password_data(&handle).await?;
        ctx.expect_shape(
            Operation::GetPasswordData,
            Some(scenario::WINDOWS_INSTANCE),
            &response,
        )
    }
}

/// A fully specified launch returns the econ-spawner shape
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInstancesShape;

#[async_trait]
impl Scenario for RunInstancesShape {
    fn name(&self) -> &str {
        "run instances matches structure on econ-style spawn"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let params = ctx.config().econ_spawn.clone();
        let launched = ctx.provision(&params).await?;
        ctx.expect_shape(
            Operation::RunInstances,
            Some(scenario::ECON_SPAWNER_MACHINE),
            &launched.response,
        )
    }
}

/// Starting a stopped machine returns the `StartInstances` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct StartInstancesShape;

#[async_trait]
impl Scenario for StartInstancesShape {
    fn name(&self) -> &str {
        "start instances matches expected structure"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.spawn_test_machine().await?;
        ctx.wait_until(&handle, InstanceState::Running).await?;
        ctx.stop(&handle).await?;
        ctx.wait_until(&handle, InstanceState::Stopped).await?;
        let response = ctx.start(&handle).await?;
        ctx.expect_shape(
            Operation::StartInstances,
            Some(scenario::STOPPED_INSTANCE),
            &response,
        )
    }
}

/// Stopping a running machine returns the `StopInstances` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct StopInstancesShape;

#[async_trait]
impl Scenario for StopInstancesShape {
    fn name(&self) -> &str {
        "stop instances matches expected structure"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.spawn_test_machine().await?;
        ctx.wait_until(&handle, InstanceState::Running).await?;
        let response = ctx.stop(&handle).await?;
        ctx.expect_shape(
            Operation::StopInstances,
            Some(scenario::RUNNING_INSTANCE),
            &response,
        )
    }
}

/// Terminating a fresh machine returns the `TerminateInstances` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminateInstancesShape;

#[async_trait]
impl Scenario for TerminateInstancesShape {
    fn name(&self) -> &str {
        "terminate instances matches expected structure"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.spawn_test_machine().await?;
        let response = ctx.terminate(&handle).await?;
        ctx.expect_shape(
            Operation::TerminateInstances,
            Some(scenario::SPAWNED_MACHINE),
            &response,
        )
    }
}

use crate::error::HarnessError;
use crate::scenario::{Scenario, ScenarioContext, ScenarioKind};
use crate::types::InstanceState;
use async_trait::async_trait;

/// The configured running instance reports `running`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningInstanceAvailable;

#[async_trait]
impl Scenario for RunningInstanceAvailable {
    fn name(&self) -> &str {
        "environment has a running instance"
    }

    fn kind(&self) -> ScenarioKind {
        ScenarioKind::Preflight
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.config().running_instance.clone();
        ctx.expect_state(&handle, InstanceState::Running).await
    }
}

/// The configured stopped instance reports `stopped`
#[derive(Debug, Clone, Copy, Default)]
pub struct StoppedInstanceAvailable;

#[async_trait]
impl Scenario for StoppedInstanceAvailable {
    fn name(&self) -> &str {
        "environment has a stopped instance"
    }

    fn kind(&self) -> ScenarioKind {
        ScenarioKind::Preflight
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError> {
        let handle = ctx.config().stopped_instance.clone();
        ctx.expect_state(&handle, InstanceState::Stopped).await
    }
}

//! Scenario orchestration
//!
//! A [`Scenario`] is an ordered list of steps run against one
//! [`ScenarioContext`]. Each step issues exactly one client operation and
//! then either checks the response shape against a fixture or waits for a
//! state transition. Steps compose with `?`: the first failure ends the
//! scenario, and any handle provisioned so far stays registered for the
//! run-wide cleanup.

use crate::client::{launched_instance_id, ResourceClient};
use crate::config::HarnessConfig;
use crate::error::{FixtureError, HarnessError, ShapeMismatch};
use crate::fixture::FixtureProvider;
use crate::poller::{PollOutcome, StatePoller};
use crate::registry::CleanupRegistry;
use crate::timer::Timer;
use crate::types::{
    InstanceState, LaunchParams, Operation, ResourceHandle, StateAction, Tag,
};
use async_trait::async_trait;
use contract_shape::{apply_override, kind_of, Shape};
use serde_json::Value;
use std::sync::Arc;

/// Time budget class of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// Quick environment check; uses the preflight timeout
    Preflight,
    /// Full contract check; uses the scenario timeout
    Contract,
}

/// One end-to-end check
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Human-readable name used in logs and reports
    fn name(&self) -> &str;

    fn kind(&self) -> ScenarioKind {
        ScenarioKind::Contract
    }

    /// Run every step in order
    ///
    /// # Errors
    /// The first step error or comparison failure
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), HarnessError>;
}

/// A freshly provisioned instance
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// Registered handle
    pub handle: ResourceHandle,
    /// Raw `RunInstances` response
    pub response: Value,
}

/// Everything a scenario step needs
#[derive(Clone)]
pub struct ScenarioContext {
    scenario: String,
    client: Arc<dyn ResourceClient>,
    fixtures: Arc<dyn FixtureProvider>,
    timer: Arc<dyn Timer>,
    registry: Arc<CleanupRegistry>,
    config: Arc<HarnessConfig>,
    poller: StatePoller,
}

impl ScenarioContext {
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        client: Arc<dyn ResourceClient>,
        fixtures: Arc<dyn FixtureProvider>,
        timer: Arc<dyn Timer>,
        registry: Arc<CleanupRegistry>,
        config: Arc<HarnessConfig>,
    ) -> Self {
        let poller = StatePoller::from_config(Arc::clone(&client), Arc::clone(&timer), &config);
        Self {
            scenario: scenario.into(),
            client,
            fixtures,
            timer,
            registry,
            config,
            poller,
        }
    }

    #[inline]
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &CleanupRegistry {
        &self.registry
    }

    /// Launch an instance and register it before returning
    ///
    /// After registration the step waits the configured settle delay.
    ///
    /// # Errors
    /// - `HarnessError::Query` if the launch fails
    /// - `HarnessError::MalformedResponse` if no instance id is returned
    pub async fn provision(&self, params: &LaunchParams) -> Result<Provisioned, HarnessError> {
        let response = self.client.create(params).await?;
        let handle =
            launched_instance_id(&response).ok_or_else(|| HarnessError::MalformedResponse {
                operation: Operation::RunInstances,
                detail: "no instance id in launch response".to_string(),
            })?;
        self.registry.register(handle.clone());
        tracing::info!(scenario = %self.scenario, %handle, image = %params.image_id, "provisioned");

        let settle = self.config.provision_settle();
        if !settle.is_zero() {
            self.timer.sleep(settle).await;
        }
        Ok(Provisioned { handle, response })
    }

    /// Launch the configured test machine
    ///
    /// # Errors
    /// Same as [`ScenarioContext::provision`]
    pub async fn spawn_test_machine(&self) -> Result<ResourceHandle, HarnessError> {
        let params = self.config.test_machine.clone();
        Ok(self.provision(&params).await?.handle)
    }

    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn describe(&self, ids: &[ResourceHandle]) -> Result<Value, HarnessError> {
        tracing::debug!(scenario = %self.scenario, ids = ?ids, "describe");
        Ok(self.client.describe(ids).await?)
    }

    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn tag(&self, handle: &ResourceHandle, tags: &[Tag]) -> Result<Value, HarnessError> {
        tracing::info!(scenario = %self.scenario, %handle, count = tags.len(), "tag");
        Ok(self.client.tag(std::slice::from_ref(handle), tags).await?)
    }

    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn stop(&self, handle: &ResourceHandle) -> Result<Value, HarnessError> {
        self.change_state(handle, StateAction::Stop).await
    }

    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn start(&self, handle: &ResourceHandle) -> Result<Value, HarnessError> {
        self.change_state(handle, StateAction::Start).await
    }

    async fn change_state(
        &self,
        handle: &ResourceHandle,
        action: StateAction,
    ) -> Result<Value, HarnessError> {
        tracing::info!(scenario = %self.scenario, %handle, operation = %action.operation(), "change state");
        Ok(self
            .client
            .change_state(std::slice::from_ref(handle), action)
            .await?)
    }

    /// Terminate one instance immediately
    ///
    /// The handle stays registered; terminating an already terminated
    /// instance again at cleanup is accepted by the provider.
    ///
    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn terminate(&self, handle: &ResourceHandle) -> Result<Value, HarnessError> {
        tracing::info!(scenario = %self.scenario, %handle, "terminate");
        Ok(self.client.terminate(std::slice::from_ref(handle)).await?)
    }

    /// # Errors
    /// `HarnessError::Query` if the call fails
    pub async fn password_data(&self, handle: &ResourceHandle) -> Result<Value, HarnessError> {
        Ok(self.client.password_data(handle).await?)
    }

    /// Wait for `handle` to report `desired`
    ///
    /// # Errors
    /// See [`StatePoller::wait_until_state`]
    pub async fn wait_until(
        &self,
        handle: &ResourceHandle,
        desired: InstanceState,
    ) -> Result<PollOutcome, HarnessError> {
        tracing::info!(scenario = %self.scenario, %handle, %desired, "waiting for state");
        self.poller.wait_until_state(handle, desired).await
    }

    /// Check that `handle` currently reports `expected`
    ///
    /// # Errors
    /// - `HarnessError::StateMismatch` if it reports something else
    /// - query errors from the describe call
    pub async fn expect_state(
        &self,
        handle: &ResourceHandle,
        expected: InstanceState,
    ) -> Result<(), HarnessError> {
        let observed = self.poller.observe(handle).await?;
        if observed == expected {
            Ok(())
        } else {
            Err(HarnessError::StateMismatch {
                handle: handle.clone(),
                expected,
                observed,
            })
        }
    }

    /// Compare the shape of `actual` with the fixture for `operation`/`scenario`
    ///
    /// # Errors
    /// - `HarnessError::ShapeMismatch` carrying both documents and the path diff
    /// - `HarnessError::Fixture` if no fixture exists
    pub fn expect_shape(
        &self,
        operation: Operation,
        scenario: Option<&str>,
        actual: &Value,
    ) -> Result<(), HarnessError> {
        self.expect_shape_with_overrides(operation, scenario, &[], actual)
    }

    /// Like [`ScenarioContext::expect_shape`], replacing fixture values first
    ///
    /// Each override is a JSON pointer into the fixture and the value to put
    /// there.
    ///
    /// # Errors
    /// As `expect_shape`, plus `FixtureError::BadOverride` for a dangling pointer
    pub fn expect_shape_with_overrides(
        &self,
        operation: Operation,
        scenario: Option<&str>,
        overrides: &[(&str, Value)],
        actual: &Value,
    ) -> Result<(), HarnessError> {
        let mut expected = self.fixtures.fixture(operation, scenario)?;
        for (pointer, replacement) in overrides {
            if !apply_override(&mut expected, pointer, replacement.clone()) {
                return Err(FixtureError::BadOverride {
                    operation,
                    pointer: (*pointer).to_string(),
                }
                .into());
            }
        }

        if Shape::of(&expected).matches(&Shape::of(actual)) {
            tracing::info!(scenario = %self.scenario, %operation, "shape matches fixture");
            Ok(())
        } else {
            let mismatch = ShapeMismatch::new(operation, scenario, expected, actual.clone());
            tracing::warn!(
                scenario = %self.scenario,
                %operation,
                missing = ?mismatch.diff.missing,
                unexpected = ?mismatch.diff.unexpected,
                "shape mismatch"
            );
            Err(HarnessError::shape_mismatch(mismatch))
        }
    }

    /// Compare only the top-level type of `actual` with the fixture
    ///
    /// # Errors
    /// `HarnessError::KindMismatch` or `HarnessError::Fixture`
    pub fn expect_kind(
        &self,
        operation: Operation,
        scenario: Option<&str>,
        actual: &Value,
    ) -> Result<(), HarnessError> {
        let expected = kind_of(&self.fixtures.fixture(operation, scenario)?);
        let actual = kind_of(actual);
        if expected == actual {
            Ok(())
        } else {
            Err(HarnessError::KindMismatch {
                operation,
                expected,
                actual,
            })
        }
    }
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("scenario", &self.scenario)
            .field("registered", &self.registry.len())
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockResourceClient;
    use crate::error::ClientError;
    use crate::timer::TokioTimer;
    use serde_json::json;
    use std::collections::HashMap;

    struct MapFixtures(HashMap<Operation, Value>);

    impl FixtureProvider for MapFixtures {
        fn fixture(&self, operation: Operation, scenario: Option<&str>) -> Result<Value, FixtureError> {
            self.0.get(&operation).cloned().ok_or(FixtureError::Missing {
                operation,
                scenario: scenario.map(str::to_string),
            })
        }
    }

    fn context(mock: MockResourceClient, fixtures: HashMap<Operation, Value>) -> ScenarioContext {
        ScenarioContext::new(
            "unit",
            Arc::new(mock),
            Arc::new(MapFixtures(fixtures)),
            Arc::new(TokioTimer),
            Arc::new(CleanupRegistry::new()),
            Arc::new(HarnessConfig::new().with_provision_settle(std::time::Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn provision_registers_before_returning() {
        let mut mock = MockResourceClient::new();
        mock.expect_create()
            .times(1)
            .returning(|_| Ok(json!({"Instances": [{"InstanceId": "i-new"}]})));

        let ctx = context(mock, HashMap::new());
        let provisioned = ctx.spawn_test_machine().await.unwrap();

        assert_eq!(provisioned, ResourceHandle::new("i-new"));
        assert_eq!(ctx.registry().handles(), vec![ResourceHandle::new("i-new")]);
    }

    #[tokio::test]
    async fn provision_without_id_is_malformed() {
        let mut mock = MockResourceClient::new();
        mock.expect_create()
            .times(1)
            .returning(|_| Ok(json!({"Instances": []})));

        let ctx = context(mock, HashMap::new());
        let err = ctx.spawn_test_machine().await.unwrap_err();

        assert!(matches!(err, HarnessError::MalformedResponse { .. }));
        assert!(ctx.registry().is_empty());
    }

    #[tokio::test]
    async fn failed_launch_registers_nothing() {
        let mut mock = MockResourceClient::new();
        mock.expect_create().times(1).returning(|_| {
            Err(ClientError::new(Operation::RunInstances, "insufficient capacity"))
        });

        let ctx = context(mock, HashMap::new());
        assert!(matches!(
            ctx.spawn_test_machine().await,
            Err(HarnessError::Query(_))
        ));
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn expect_shape_ignores_values() {
        let fixtures = HashMap::from([(
            Operation::CreateTags,
            json!({"RequestId": "fixture", "Return": true}),
        )]);
        let ctx = context(MockResourceClient::new(), fixtures);

        let live = json!({"RequestId": "59dbff89-35bd", "Return": false});
        assert!(ctx.expect_shape(Operation::CreateTags, None, &live).is_ok());
    }

    #[test]
    fn expect_shape_reports_mismatch() {
        let fixtures = HashMap::from([(
            Operation::CreateTags,
            json!({"RequestId": "fixture", "Return": true}),
        )]);
        let ctx = context(MockResourceClient::new(), fixtures);

        let err = ctx
            .expect_shape(Operation::CreateTags, None, &json!({"Return": true}))
            .unwrap_err();
        match err {
            HarnessError::ShapeMismatch(mismatch) => {
                assert_eq!(mismatch.diff.missing, vec!["RequestId".to_string()]);
                assert!(mismatch.diff.unexpected.is_empty());
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn dangling_override_is_a_fixture_error() {
        let fixtures = HashMap::from([(Operation::DescribeInstances, json!({"Reservations": []}))]);
        let ctx = context(MockResourceClient::new(), fixtures);

        let err = ctx
            .expect_shape_with_overrides(
                Operation::DescribeInstances,
                None,
                &[("/Reservations/0/Instances/0/Tags", json!([]))],
                &json!({"Reservations": []}),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Fixture(FixtureError::BadOverride { .. })
        ));
    }

    #[test]
    fn expect_kind_compares_top_level_type() {
        let fixtures = HashMap::from([(Operation::DescribeInstances, json!({"Reservations": []}))]);
        let ctx = context(MockResourceClient::new(), fixtures);

        assert!(ctx
            .expect_kind(Operation::DescribeInstances, None, &json!({"Anything": 1}))
            .is_ok());
        assert!(matches!(
            ctx.expect_kind(Operation::DescribeInstances, None, &json!([])),
            Err(HarnessError::KindMismatch { .. })
        ));
    }
}

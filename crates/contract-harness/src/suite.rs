//! Suite runner
//!
//! A [`Suite`] is one run: it owns the cleanup registry, runs its scenarios
//! one after another, and drains the registry exactly once after the last
//! scenario has finished, whatever the outcomes were.

use crate::client::ResourceClient;
use crate::config::HarnessConfig;
use crate::error::{CleanupError, HarnessError};
use crate::fixture::FixtureProvider;
use crate::registry::{CleanupReport, CleanupRegistry};
use crate::scenario::{Scenario, ScenarioContext, ScenarioKind};
use crate::scenarios;
use crate::timer::{Timer, TokioTimer};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Result of one scenario
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: Result<(), HarnessError>,
    pub duration_ms: u64,
}

impl ScenarioOutcome {
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of a full run
#[derive(Debug)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
    pub cleanup: Result<CleanupReport, CleanupError>,
}

impl SuiteReport {
    /// Every scenario passed and every tracked resource was terminated
    #[must_use]
    pub fn passed(&self) -> bool {
        self.cleanup.is_ok() && self.outcomes.iter().all(ScenarioOutcome::passed)
    }

    /// Scenarios that failed
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    /// Outcome of the named scenario
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Contract Suite Report ===\n\n");
        for outcome in &self.outcomes {
            let status = if outcome.passed() { "PASS" } else { "FAIL" };
            report.push_str(&format!(
                "[{status}] {} ({}ms)\n",
                outcome.name, outcome.duration_ms
            ));
            if let Err(err) = &outcome.result {
                for line in err.to_string().lines() {
                    report.push_str(&format!("       {line}\n"));
                }
            }
        }

        report.push_str("\n=== Cleanup ===\n");
        match &self.cleanup {
            Ok(cleanup) if cleanup.terminated.is_empty() => {
                report.push_str("nothing to clean up\n");
            }
            Ok(cleanup) => report.push_str(&format!(
                "terminated {} resource(s) in {} request(s)\n",
                cleanup.terminated.len(),
                cleanup.requests
            )),
            Err(err) => {
                report.push_str(&format!("!!! CLEANUP FAILED: {err}\n"));
                report.push_str("These resources may still be running and billing.\n");
            }
        }

        let failed = self.failures().count();
        report.push_str(&format!(
            "\nStatus: {} ({} passed, {failed} failed)\n",
            if self.passed() { "PASSED" } else { "FAILED" },
            self.outcomes.len() - failed
        ));
        report
    }
}

/// One contract-verification run
pub struct Suite {
    client: Arc<dyn ResourceClient>,
    fixtures: Arc<dyn FixtureProvider>,
    timer: Arc<dyn Timer>,
    config: Arc<HarnessConfig>,
    registry: Arc<CleanupRegistry>,
    scenarios: Vec<Box<dyn Scenario>>,
}

impl Suite {
    /// Create an empty suite on the tokio clock
    #[must_use]
    pub fn new(
        client: Arc<dyn ResourceClient>,
        fixtures: Arc<dyn FixtureProvider>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            client,
            fixtures,
            timer: Arc::new(TokioTimer),
            config: Arc::new(config),
            registry: Arc::new(CleanupRegistry::new()),
            scenarios: Vec::new(),
        }
    }

    /// Create a suite with the preflight checks and every contract scenario
    #[must_use]
    pub fn standard(
        client: Arc<dyn ResourceClient>,
        fixtures: Arc<dyn FixtureProvider>,
        config: HarnessConfig,
    ) -> Self {
        let mut suite = Self::new(client, fixtures, config);
        suite.scenarios = scenarios::standard();
        suite
    }

    /// Create a standard suite after validating `config`
    ///
    /// # Errors
    /// `HarnessError::Config` if a configured value is out of range
    pub fn try_standard(
        client: Arc<dyn ResourceClient>,
        fixtures: Arc<dyn FixtureProvider>,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self::standard(client, fixtures, config))
    }

    /// Create a standard suite from a TOML configuration document
    ///
    /// # Errors
    /// `HarnessError::Config` if the document does not parse or validate
    pub fn from_toml_str(
        client: Arc<dyn ResourceClient>,
        fixtures: Arc<dyn FixtureProvider>,
        source: &str,
    ) -> Result<Self, HarnessError> {
        let config = HarnessConfig::from_toml_str(source)?;
        Ok(Self::standard(client, fixtures, config))
    }

    /// With a custom timer
    #[inline]
    #[must_use]
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    /// With an additional scenario
    #[inline]
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Scenario + 'static) -> Self {
        self.scenarios.push(Box::new(scenario));
        self
    }

    /// Append a scenario
    pub fn add(&mut self, scenario: Box<dyn Scenario>) {
        self.scenarios.push(scenario);
    }

    /// Registry shared by every scenario of this run
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<CleanupRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Names of the scenarios, in run order
    #[must_use]
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Context for a scenario of this run
    #[must_use]
    pub fn context(&self, scenario: &str) -> ScenarioContext {
        ScenarioContext::new(
            scenario,
            Arc::clone(&self.client),
            Arc::clone(&self.fixtures),
            Arc::clone(&self.timer),
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
        )
    }

    /// Run every scenario, then clean up
    ///
    /// Scenario failures, timeouts and panics are recorded and do not stop
    /// the run. Cleanup is attempted exactly once at the end on every path.
    pub async fn run(&self) -> SuiteReport {
        tracing::info!(scenarios = self.scenarios.len(), "starting contract suite");

        let mut outcomes = Vec::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            outcomes.push(self.run_scenario(scenario.as_ref()).await);
        }

        let cleanup = self.registry.cleanup_all(self.client.as_ref()).await;

        let report = SuiteReport { outcomes, cleanup };
        if report.passed() {
            tracing::info!("contract suite passed");
        } else {
            tracing::warn!(
                failed = report.failures().count(),
                cleanup_ok = report.cleanup.is_ok(),
                "contract suite failed"
            );
        }
        report
    }

    async fn run_scenario(&self, scenario: &dyn Scenario) -> ScenarioOutcome {
        let name = scenario.name().to_string();
        let ctx = self.context(&name);
        let limit = match scenario.kind() {
            ScenarioKind::Preflight => self.config.preflight_timeout(),
            ScenarioKind::Contract => self.config.scenario_timeout(),
        };
        let span = tracing::info_span!("scenario", name = %name);

        let started = Instant::now();
        let guarded = AssertUnwindSafe(scenario.run(&ctx)).catch_unwind();
        let result = match tokio::time::timeout(limit, guarded).instrument(span).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(HarnessError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(HarnessError::ScenarioTimeout {
                duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(()) => tracing::info!(scenario = %name, duration_ms, "scenario passed"),
            Err(err) => tracing::warn!(scenario = %name, duration_ms, error = %err, "scenario failed"),
        }

        ScenarioOutcome {
            name,
            result,
            duration_ms,
        }
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("scenarios", &self.scenario_names())
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

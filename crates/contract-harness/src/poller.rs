//! State-convergence poller
//!
//! Repeatedly describes an instance until it reports the desired state:
//! - Fixed interval between queries, no backoff, no jitter
//! - Query failures propagate immediately and are never retried
//! - Unbounded by default; the enclosing scenario timeout is the real bound

use crate::client::{observed_state, ResourceClient};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::timer::Timer;
use crate::types::{InstanceState, Operation, ResourceHandle};
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful convergence poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Number of state queries issued
    pub attempts: u32,
    /// State observed on the final query
    pub final_state: InstanceState,
}

/// Polls instance state until it converges
#[derive(Clone)]
pub struct StatePoller {
    client: Arc<dyn ResourceClient>,
    timer: Arc<dyn Timer>,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl StatePoller {
    /// Create an unbounded poller
    #[must_use]
    pub fn new(client: Arc<dyn ResourceClient>, timer: Arc<dyn Timer>, interval: Duration) -> Self {
        Self {
            client,
            timer,
            interval,
            max_attempts: None,
        }
    }

    /// Create a poller using the configured interval and bound
    #[must_use]
    pub fn from_config(
        client: Arc<dyn ResourceClient>,
        timer: Arc<dyn Timer>,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            client,
            timer,
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts.map(|max| max.max(1)),
        }
    }

    /// Give up after `attempts` queries (at least one)
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Query the current state of `handle` once
    ///
    /// # Errors
    /// - `HarnessError::Query` if the describe call fails
    /// - `HarnessError::MalformedResponse` if the response carries no state
    pub async fn observe(&self, handle: &ResourceHandle) -> Result<InstanceState, HarnessError> {
        let response = self.client.describe(std::slice::from_ref(handle)).await?;
        observed_state(&response).ok_or_else(|| HarnessError::MalformedResponse {
            operation: Operation::DescribeInstances,
            detail: format!("no state reported for {handle}"),
        })
    }

    /// Wait until `handle` reports `desired`
    ///
    /// Completes after the first query that observes `desired`. Every
    /// mismatch is logged with the observed and desired state, then followed
    /// by exactly one interval delay.
    ///
    /// # Errors
    /// - `HarnessError::Query` / `MalformedResponse` from the first failing query
    /// - `HarnessError::Timeout` only when a maximum attempt count is set
    pub async fn wait_until_state(
        &self,
        handle: &ResourceHandle,
        desired: InstanceState,
    ) -> Result<PollOutcome, HarnessError> {
        let mut attempts = 0u32;

        loop {
            let observed = self.observe(handle).await?;
            attempts += 1;

            if observed == desired {
                tracing::debug!(%handle, state = %observed, attempts, "state converged");
                return Ok(PollOutcome {
                    attempts,
                    final_state: observed,
                });
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(HarnessError::Timeout {
                    handle: handle.clone(),
                    desired,
                    last_observed: observed,
                    attempts,
                });
            }

            tracing::info!(
                %handle,
                %observed,
                %desired,
                attempt = attempts,
                retry_in_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
                "machine not ready, retrying"
            );
            self.timer.sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for StatePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePoller")
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

//! Harness configuration
//!
//! Poll cadence, time budgets, the long-lived instances the preflight
//! checks rely on, and the launch parameters used for ephemeral machines.
//! Credentials and region belong to the client implementation.

use crate::error::ConfigError;
use crate::types::{LaunchParams, NetworkInterfaceSpec, ResourceHandle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Fixed delay between state polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Give up polling after this many queries (unbounded when absent)
    pub max_poll_attempts: Option<u32>,
    /// Time budget for each contract scenario, in milliseconds
    pub scenario_timeout_ms: u64,
    /// Time budget for each preflight check, in milliseconds
    pub preflight_timeout_ms: u64,
    /// Pause after a successful provisioning call, in milliseconds
    pub provision_settle_ms: u64,
    /// Long-lived instance expected to be running
    pub running_instance: ResourceHandle,
    /// Long-lived instance expected to be stopped
    pub stopped_instance: ResourceHandle,
    /// Throwaway machine launched by lifecycle scenarios
    pub test_machine: LaunchParams,
    /// Fully specified launch (key pair, network interface, user data)
    pub econ_spawn: LaunchParams,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing keys take their defaults
    ///
    /// # Errors
    /// - `ConfigError::Parse` if the document is not valid TOML for this type
    /// - `ConfigError::InvalidValue` if a value is out of range
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::InvalidValue` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenario_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scenario_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.preflight_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "preflight_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_poll_attempts",
                reason: "must allow at least one query".to_string(),
            });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    #[must_use]
    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_millis(self.preflight_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn provision_settle(&self) -> Duration {
        Duration::from_millis(self.provision_settle_ms)
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_millis(interval);
        self
    }

    /// With bounded polling; at least one query is always issued
    #[inline]
    #[must_use]
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = Some(attempts.max(1));
        self
    }

    /// With scenario time budget
    #[inline]
    #[must_use]
    pub fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout_ms = duration_millis(timeout);
        self
    }

    /// With preflight time budget
    #[inline]
    #[must_use]
    pub fn with_preflight_timeout(mut self, timeout: Duration) -> Self {
        self.preflight_timeout_ms = duration_millis(timeout);
        self
    }

    /// With settle delay after provisioning
    #[inline]
    #[must_use]
    pub fn with_provision_settle(mut self, settle: Duration) -> Self {
        self.provision_settle_ms = duration_millis(settle);
        self
    }

    /// With the long-lived running/stopped instances
    #[inline]
    #[must_use]
    pub fn with_known_instances(
        mut self,
        running: impl Into<ResourceHandle>,
        stopped: impl Into<ResourceHandle>,
    ) -> Self {
        self.running_instance = running.into();
        self.stopped_instance = stopped.into();
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
            max_poll_attempts: None,
            scenario_timeout_ms: 10 * 60 * 1_000,
            preflight_timeout_ms: 10_000,
            provision_settle_ms: 1_000,
            running_instance: ResourceHandle::new("i-cb7b2946"),
            stopped_instance: ResourceHandle::new("i-32ac1f8a"),
            test_machine: LaunchParams::new("ami-3faf9f48", "t1.micro"),
            econ_spawn: LaunchParams::new("ami-3faf9f48", "t1.micro")
                .with_key_name("kon-tiki-development")
                .with_network_interface(NetworkInterfaceSpec {
                    associate_public_ip_address: true,
                    subnet_id: "subnet-3a3b177c".to_string(),
                    device_index: 0,
                    groups: vec!["sg-9040a2f5".to_string()],
                })
                // "<powershell>ls</powershell>"
                .with_user_data("PHBvd2Vyc2hlbGw+bHM8L3Bvd2Vyc2hlbGw+"),
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HarnessConfig::new();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.scenario_timeout(), Duration::from_secs(600));
        assert_eq!(config.preflight_timeout(), Duration::from_secs(10));
        assert!(config.max_poll_attempts.is_none());
        assert_eq!(config.econ_spawn.network_interfaces.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml_str(
            r#"
            poll_interval_ms = 500
            running_instance = "i-0abc"

            [test_machine]
            image_id = "ami-1234"
            instance_type = "t3.nano"
            min_count = 1
            max_count = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.running_instance.as_str(), "i-0abc");
        assert_eq!(config.stopped_instance.as_str(), "i-32ac1f8a");
        assert_eq!(config.test_machine.instance_type, "t3.nano");
        assert!(config.test_machine.key_name.is_none());
    }

    #[test]
    fn rejects_zero_poll_attempts() {
        let err = HarnessConfig::from_toml_str("max_poll_attempts = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "max_poll_attempts", .. }
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            HarnessConfig::from_toml_str("poll_interval_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builders() {
        let config = HarnessConfig::new()
            .with_poll_interval(Duration::from_millis(10))
            .with_max_poll_attempts(4)
            .with_known_instances("i-run", "i-stop");

        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.max_poll_attempts, Some(4));
        assert_eq!(config.stopped_instance, ResourceHandle::new("i-stop"));
    }

    #[test]
    fn zero_poll_attempts_builder_still_queries_once() {
        let config = HarnessConfig::new().with_max_poll_attempts(0);
        assert_eq!(config.max_poll_attempts, Some(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn timeouts_keep_sub_second_precision() {
        let config = HarnessConfig::new()
            .with_scenario_timeout(Duration::from_millis(1_500))
            .with_preflight_timeout(Duration::from_millis(500));

        assert_eq!(config.scenario_timeout(), Duration::from_millis(1_500));
        assert_eq!(config.preflight_timeout(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = HarnessConfig::new()
            .with_scenario_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "scenario_timeout_ms", .. }
        ));
    }
}

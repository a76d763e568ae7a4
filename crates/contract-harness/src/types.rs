//! Core types for the harness
//!
//! Defines the vocabulary shared by the client, poller, registry and
//! scenarios:
//! - Resource handles and instance states
//! - The API operations fixtures are keyed by
//! - Launch parameters and tags

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Opaque identifier of a provisioned instance (`i-…`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    /// Wrap a raw instance id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw instance id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of an instance, as reported in `State.Name`
///
/// Unknown wire values are kept verbatim in [`InstanceState::Other`] so new
/// provider states can still be waited on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    Other(String),
}

impl InstanceState {
    /// Wire name of the state
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Other(name) => name,
        }
    }

    /// Numeric state code reported alongside the name
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Pending => Some(0),
            Self::Running => Some(16),
            Self::ShuttingDown => Some(32),
            Self::Terminated => Some(48),
            Self::Stopping => Some(64),
            Self::Stopped => Some(80),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for InstanceState {
    fn from(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for InstanceState {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        state.as_str().to_string()
    }
}

impl Display for InstanceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API operations exercised by the harness
///
/// Fixtures are looked up by operation and an optional scenario name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    CreateTags,
    DescribeInstances,
    GetPasswordData,
    RunInstances,
    StartInstances,
    StopInstances,
    TerminateInstances,
}

impl Operation {
    /// All operations, in declaration order
    pub const ALL: [Operation; 7] = [
        Self::CreateTags,
        Self::DescribeInstances,
        Self::GetPasswordData,
        Self::RunInstances,
        Self::StartInstances,
        Self::StopInstances,
        Self::TerminateInstances,
    ];

    /// API name of the operation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateTags => "CreateTags",
            Self::DescribeInstances => "DescribeInstances",
            Self::GetPasswordData => "GetPasswordData",
            Self::RunInstances => "RunInstances",
            Self::StartInstances => "StartInstances",
            Self::StopInstances => "StopInstances",
            Self::TerminateInstances => "TerminateInstances",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State change requested through `change_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateAction {
    Start,
    Stop,
}

impl StateAction {
    /// Operation issued for this action
    #[inline]
    #[must_use]
    pub fn operation(self) -> Operation {
        match self {
            Self::Start => Operation::StartInstances,
            Self::Stop => Operation::StopInstances,
        }
    }
}

/// Key/value tag attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Network interface attached at launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceSpec {
    pub associate_public_ip_address: bool,
    pub subnet_id: String,
    pub device_index: u32,
    pub groups: Vec<String>,
}

/// Parameters for provisioning instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    /// Machine image to boot
    pub image_id: String,
    /// Instance size
    pub instance_type: String,
    pub min_count: u32,
    pub max_count: u32,
    /// Key pair name, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterfaceSpec>,
    /// Base64-encoded user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

impl LaunchParams {
    /// Launch exactly one instance of the given image and type
    #[must_use]
    pub fn new(image_id: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            instance_type: instance_type.into(),
            min_count: 1,
            max_count: 1,
            key_name: None,
            network_interfaces: Vec::new(),
            user_data: None,
        }
    }

    /// With key pair
    #[inline]
    #[must_use]
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    /// With an additional network interface
    #[inline]
    #[must_use]
    pub fn with_network_interface(mut self, interface: NetworkInterfaceSpec) -> Self {
        self.network_interfaces.push(interface);
        self
    }

    /// With base64-encoded user data
    #[inline]
    #[must_use]
    pub fn with_user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = Some(user_data.into());
        self
    }
}

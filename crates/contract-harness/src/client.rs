//! Remote resource client seam
//!
//! The harness never talks to the provider directly; it drives an
//! implementation of [`ResourceClient`] supplied by the caller. Every
//! operation completes exactly once with either the raw response document or
//! a [`ClientError`].

use crate::error::ClientError;
use crate::types::{InstanceState, LaunchParams, ResourceHandle, StateAction, Tag};
use async_trait::async_trait;
use serde_json::Value;

/// Asynchronous instance API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Launch instances (`RunInstances`)
    async fn create(&self, params: &LaunchParams) -> Result<Value, ClientError>;

    /// Describe instances (`DescribeInstances`); an empty slice describes all
    async fn describe(&self, ids: &[ResourceHandle]) -> Result<Value, ClientError>;

    /// Start or stop instances (`StartInstances` / `StopInstances`)
    async fn change_state(
        &self,
        ids: &[ResourceHandle],
        action: StateAction,
    ) -> Result<Value, ClientError>;

    /// Terminate instances (`TerminateInstances`)
    async fn terminate(&self, ids: &[ResourceHandle]) -> Result<Value, ClientError>;

    /// Attach tags (`CreateTags`)
    async fn tag(&self, ids: &[ResourceHandle], tags: &[Tag]) -> Result<Value, ClientError>;

    /// Fetch the encrypted administrator password (`GetPasswordData`)
    async fn password_data(&self, id: &ResourceHandle) -> Result<Value, ClientError>;

    /// Whether `terminate` accepts several ids in one request
    fn supports_batch_terminate(&self) -> bool {
        true
    }
}

/// Id of the first instance in a `RunInstances` response
#[must_use]
pub fn launched_instance_id(response: &Value) -> Option<ResourceHandle> {
    response
        .pointer("/Instances/0/InstanceId")
        .and_then(Value::as_str)
        .map(ResourceHandle::from)
}

/// State of the first instance in a `DescribeInstances` response
#[must_use]
pub fn observed_state(response: &Value) -> Option<InstanceState> {
    response
        .pointer("/Reservations/0/Instances/0/State/Name")
        .and_then(Value::as_str)
        .map(InstanceState::from)
}

//! Resource lifecycle tracking
//!
//! Every handle produced by a provisioning call is registered here before
//! anything else happens to it. At run teardown the registry is drained
//! with as few termination requests as the client allows:
//! - Empty registry: no request at all
//! - Duplicate registrations: terminated once
//! - Batch-capable client: one request for every handle
//! - Otherwise: one request per handle, issued concurrently

use crate::client::ResourceClient;
use crate::error::{ClientError, CleanupError};
use crate::types::ResourceHandle;
use futures::future::join_all;
use indexmap::IndexSet;
use parking_lot::Mutex;

/// Summary of a successful cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Handles terminated, in first-registration order
    pub terminated: Vec<ResourceHandle>,
    /// Registrations dropped as duplicates
    pub duplicates_skipped: usize,
    /// Number of termination requests issued
    pub requests: usize,
}

/// Run-scoped set of provisioned resources
///
/// Append-only while scenarios run; safe to share across tasks.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    handles: Mutex<Vec<ResourceHandle>>,
}

impl CleanupRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly provisioned handle
    pub fn register(&self, handle: ResourceHandle) {
        tracing::debug!(%handle, "registered for cleanup");
        self.handles.lock().push(handle);
    }

    /// Snapshot of every registration, duplicates included
    #[must_use]
    pub fn handles(&self) -> Vec<ResourceHandle> {
        self.handles.lock().clone()
    }

    /// Distinct handles awaiting cleanup, in first-registration order
    #[must_use]
    pub fn pending(&self) -> Vec<ResourceHandle> {
        self.handles
            .lock()
            .iter()
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of registrations, duplicates included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Terminate every tracked resource
    ///
    /// Terminated handles are removed from the registry, so a second call
    /// after success is a no-op. Failures are returned, not retried, and the
    /// handles they concern stay registered.
    ///
    /// # Errors
    /// `CleanupError` listing every handle that may still be running
    pub async fn cleanup_all(
        &self,
        client: &dyn ResourceClient,
    ) -> Result<CleanupReport, CleanupError> {
        let (pending, registrations) = {
            let guard = self.handles.lock();
            let distinct: IndexSet<ResourceHandle> = guard.iter().cloned().collect();
            (distinct, guard.len())
        };

        if pending.is_empty() {
            tracing::debug!("nothing to clean up");
            return Ok(CleanupReport::default());
        }

        let ids: Vec<ResourceHandle> = pending.into_iter().collect();
        let duplicates_skipped = registrations - ids.len();

        let (leaked, failures, requests) = if client.supports_batch_terminate() {
            match client.terminate(&ids).await {
                Ok(_) => (Vec::new(), Vec::new(), 1),
                Err(err) => (ids.clone(), vec![err], 1),
            }
        } else {
            terminate_individually(client, &ids).await
        };

        let terminated: Vec<ResourceHandle> = ids
            .iter()
            .filter(|id| !leaked.contains(id))
            .cloned()
            .collect();
        self.handles.lock().retain(|h| !terminated.contains(h));

        if leaked.is_empty() {
            tracing::info!(
                count = terminated.len(),
                requests,
                duplicates_skipped,
                handles = ?terminated,
                "cleaned up"
            );
            Ok(CleanupReport {
                terminated,
                duplicates_skipped,
                requests,
            })
        } else {
            for failure in &failures {
                tracing::error!(error = %failure, "termination request failed");
            }
            tracing::error!(
                leaked = ?leaked,
                "cleanup failed, resources may still be running and billing"
            );
            Err(CleanupError { leaked, failures })
        }
    }
}

async fn terminate_individually(
    client: &dyn ResourceClient,
    ids: &[ResourceHandle],
) -> (Vec<ResourceHandle>, Vec<ClientError>, usize) {
    let results = join_all(
        ids.iter()
            .map(|id| client.terminate(std::slice::from_ref(id))),
    )
    .await;

    let mut leaked = Vec::new();
    let mut failures = Vec::new();
    for (id, result) in ids.iter().zip(results) {
        if let Err(err) = result {
            leaked.push(id.clone());
            failures.push(err);
        }
    }
    (leaked, failures, ids.len())
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        let handles = self.handles.get_mut();
        if !handles.is_empty() {
            tracing::error!(
                leaked = ?handles,
                "cleanup registry dropped with resources still registered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockResourceClient;
    use crate::types::Operation;
    use serde_json::json;
    use std::sync::Arc;

    fn h(id: &str) -> ResourceHandle {
        ResourceHandle::new(id)
    }

    fn ok_terminate() -> serde_json::Value {
        json!({"TerminatingInstances": []})
    }

    #[tokio::test]
    async fn empty_registry_issues_no_request() {
        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(true);
        mock.expect_terminate().times(0);

        let registry = CleanupRegistry::new();
        let report = registry.cleanup_all(&mock).await.unwrap();

        assert_eq!(report, CleanupReport::default());
        assert_eq!(report.requests, 0);
    }

    #[tokio::test]
    async fn duplicates_are_terminated_once_in_one_batch() {
        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(true);
        mock.expect_terminate()
            .withf(|ids| ids == [h("i-1"), h("i-2")])
            .times(1)
            .returning(|_| Ok(ok_terminate()));

        let registry = CleanupRegistry::new();
        registry.register(h("i-1"));
        registry.register(h("i-2"));
        registry.register(h("i-1"));

        let report = registry.cleanup_all(&mock).await.unwrap();

        assert_eq!(report.terminated, vec![h("i-1"), h("i-2")]);
        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(report.requests, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn second_cleanup_is_noop() {
        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(true);
        mock.expect_terminate()
            .times(1)
            .returning(|_| Ok(ok_terminate()));

        let registry = CleanupRegistry::new();
        registry.register(h("i-1"));

        registry.cleanup_all(&mock).await.unwrap();
        let second = registry.cleanup_all(&mock).await.unwrap();
        assert!(second.terminated.is_empty());
    }

    #[tokio::test]
    async fn batch_failure_is_surfaced_and_handles_kept() {
        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(true);
        mock.expect_terminate().times(1).returning(|_| {
            Err(ClientError::new(Operation::TerminateInstances, "access denied")
                .with_code("UnauthorizedOperation"))
        });

        let registry = CleanupRegistry::new();
        registry.register(h("i-1"));
        registry.register(h("i-2"));

        let err = registry.cleanup_all(&mock).await.unwrap_err();

        assert_eq!(err.leaked, vec![h("i-1"), h("i-2")]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(registry.pending(), vec![h("i-1"), h("i-2")]);
    }

    #[tokio::test]
    async fn without_batch_support_terminates_each_and_aggregates() {
        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(false);
        mock.expect_terminate()
            .withf(|ids| ids.len() == 1)
            .times(3)
            .returning(|ids| {
                if ids[0].as_str() == "i-2" {
                    Err(ClientError::new(Operation::TerminateInstances, "not found")
                        .with_code("InvalidInstanceID.NotFound"))
                } else {
                    Ok(ok_terminate())
                }
            });

        let registry = CleanupRegistry::new();
        for id in ["i-1", "i-2", "i-3"] {
            registry.register(h(id));
        }

        let err = registry.cleanup_all(&mock).await.unwrap_err();

        assert_eq!(err.leaked, vec![h("i-2")]);
        assert_eq!(registry.pending(), vec![h("i-2")]);
    }

    #[tokio::test]
    async fn concurrent_registration_is_safe() {
        let registry = Arc::new(CleanupRegistry::new());

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    for k in 0..25 {
                        registry.register(h(&format!("i-{n}-{k}")));
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len(), 200);
        assert_eq!(registry.pending().len(), 200);

        let mut mock = MockResourceClient::new();
        mock.expect_supports_batch_terminate().return_const(true);
        mock.expect_terminate()
            .withf(|ids| ids.len() == 200)
            .times(1)
            .returning(|_| Ok(ok_terminate()));
        registry.cleanup_all(&mock).await.unwrap();
        assert!(registry.is_empty());
    }
}

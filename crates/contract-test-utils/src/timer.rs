use async_trait::async_trait;
use contract_harness::Timer;
use parking_lot::Mutex;
use std::time::Duration;

/// Timer that records requested delays and returns at once
///
/// Each sleep still yields to the runtime so a scenario waiting on it can
/// be cancelled by an enclosing timeout.
#[derive(Debug, Default)]
pub struct ManualTimer {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Timer for ManualTimer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

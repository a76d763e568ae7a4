//! Injectable delays
//!
//! The poller and the provisioning step wait through a [`Timer`] so tests
//! can count delays without spending wall-clock time.

use async_trait::async_trait;
use std::time::Duration;

/// Source of delays
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delays on the tokio clock
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_advances_clock() {
        let start = tokio::time::Instant::now();
        TokioTimer.sleep(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}

//! Inter-record pacing.
//!
//! The runner waits through a [`Pacer`] between records, so the pacing
//! strategy can be swapped without touching orchestration logic. Production
//! uses [`FixedDelay`]; tests and the `--no-delay` override use [`NoDelay`].

use std::time::Duration;

use async_trait::async_trait;

/// Strategy for waiting before the next record is started.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Fixed, non-adaptive delay. It never shrinks or grows based on observed
/// latency or remote error signals.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// No waiting at all.
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}

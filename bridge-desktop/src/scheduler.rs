//! Timer Scheduler using Tokio

use async_trait::async_trait;
use bridge_traits::scheduler::TimerScheduler;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wall-clock timers backed by `tokio::time`
///
/// Deadlines are converted to a relative sleep at call time, so a system
/// clock step while sleeping shifts the wake-up by the same amount.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimerScheduler for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

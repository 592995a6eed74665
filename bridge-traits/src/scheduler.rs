//! Timer Abstraction
//!
//! The sync loop and the playback loop both wait on wall-clock deadlines.
//! Routing those waits through [`TimerScheduler`] lets tests drive time
//! with [`ManualScheduler`] instead of sleeping for real.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::time::{Clock, ManualClock};

/// Timer scheduler trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::scheduler::TimerScheduler;
///
/// async fn wait_for_boundary(timers: &dyn TimerScheduler, ms: u64) {
///     timers.sleep(std::time::Duration::from_millis(ms)).await;
/// }
/// ```
#[async_trait]
pub trait TimerScheduler: Send + Sync {
    /// Current time as seen by this scheduler
    fn now(&self) -> DateTime<Utc>;

    /// Resolve once `deadline` has passed. Past deadlines resolve immediately.
    async fn sleep_until(&self, deadline: DateTime<Utc>);

    /// Resolve after `duration`
    async fn sleep(&self, duration: Duration) {
        let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        let deadline = self.now() + delta;
        self.sleep_until(deadline).await;
    }
}

/// Fixed-period ticker built on a [`TimerScheduler`].
///
/// The first tick resolves immediately. Later ticks are scheduled from the
/// previous deadline, not from when `tick` was called, so a slow consumer
/// does not drift. Missed periods are skipped rather than replayed.
pub struct Interval {
    scheduler: Arc<dyn TimerScheduler>,
    period: Duration,
    next: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn new(scheduler: Arc<dyn TimerScheduler>, period: Duration) -> Self {
        Self {
            scheduler,
            period,
            next: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick and return its scheduled time
    pub async fn tick(&mut self) -> DateTime<Utc> {
        let period = chrono::Duration::from_std(self.period).unwrap_or(chrono::Duration::zero());
        let deadline = match self.next {
            None => self.scheduler.now(),
            Some(next) => {
                self.scheduler.sleep_until(next).await;
                next
            }
        };

        let mut next = deadline + period;
        let now = self.scheduler.now();
        if period > chrono::Duration::zero() {
            while next <= now {
                next += period;
            }
        }
        self.next = Some(next);
        deadline
    }

    /// Move the next tick to `delay` from now. Later ticks follow the
    /// period from there.
    pub fn reset_after(&mut self, delay: Duration) {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        self.next = Some(self.scheduler.now() + delay);
    }
}

/// Build an [`Interval`] for `scheduler`
pub fn interval(scheduler: Arc<dyn TimerScheduler>, period: Duration) -> Interval {
    Interval::new(scheduler, period)
}

/// Deterministic scheduler for tests.
///
/// Every sleep jumps the backing [`ManualClock`] forward to the requested
/// deadline and yields once to the runtime, so loops make progress without
/// real waiting. Requested deadlines are recorded for assertions.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    deadlines: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            deadlines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Deadlines requested so far, in call order
    pub fn recorded_deadlines(&self) -> Vec<DateTime<Utc>> {
        self.deadlines
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TimerScheduler for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(mut deadlines) = self.deadlines.lock() {
            deadlines.push(deadline);
        }
        if deadline.timestamp_millis() > self.clock.unix_timestamp_millis() {
            self.clock.set_millis(deadline.timestamp_millis());
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_sleep_advances_clock() {
        let clock = Arc::new(ManualClock::from_millis(10_000));
        let scheduler = ManualScheduler::new(Arc::clone(&clock));

        scheduler.sleep(Duration::from_millis(1_500)).await;
        assert_eq!(clock.unix_timestamp_millis(), 11_500);

        // Past deadlines never move time backwards
        let past = DateTime::<Utc>::from_timestamp_millis(5_000).unwrap();
        scheduler.sleep_until(past).await;
        assert_eq!(clock.unix_timestamp_millis(), 11_500);
        assert_eq!(scheduler.recorded_deadlines().len(), 2);
    }

    #[tokio::test]
    async fn test_interval_first_tick_is_immediate() {
        let clock = Arc::new(ManualClock::from_millis(0));
        let scheduler: Arc<dyn TimerScheduler> = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
        let mut ticker = interval(scheduler, Duration::from_secs(60));

        let first = ticker.tick().await;
        assert_eq!(first.timestamp_millis(), 0);

        let second = ticker.tick().await;
        assert_eq!(second.timestamp_millis(), 60_000);
        assert_eq!(clock.unix_timestamp_millis(), 60_000);
    }

    #[tokio::test]
    async fn test_interval_reset_after_pulls_next_tick_in() {
        let clock = Arc::new(ManualClock::from_millis(0));
        let scheduler: Arc<dyn TimerScheduler> = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
        let mut ticker = interval(scheduler, Duration::from_secs(300));

        ticker.tick().await;
        ticker.reset_after(Duration::from_secs(60));

        assert_eq!(ticker.tick().await.timestamp_millis(), 60_000);
        assert_eq!(ticker.tick().await.timestamp_millis(), 360_000);
    }

    #[tokio::test]
    async fn test_interval_skips_missed_periods() {
        let clock = Arc::new(ManualClock::from_millis(0));
        let scheduler: Arc<dyn TimerScheduler> = Arc::new(ManualScheduler::new(Arc::clone(&clock)));
        let mut ticker = Interval::new(scheduler, Duration::from_secs(10));

        ticker.tick().await;
        // Consumer stalls for 35 seconds
        clock.advance(Duration::from_secs(35));

        let next = ticker.tick().await;
        assert_eq!(next.timestamp_millis(), 10_000);
        let after = ticker.tick().await;
        assert_eq!(after.timestamp_millis(), 40_000);
    }
}

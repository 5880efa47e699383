//! Fixed minimum spacing between calls.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use testscribe_core::{SharedClock, until};
use tracing::debug;

/// Enforces `60 / requests_per_minute` seconds between consecutive calls.
///
/// Used for providers that report no quota metadata of their own. A zero
/// interval disables pacing.
///
/// # Examples
///
/// ```
/// use testscribe_core::{ManualClock, SharedClock};
/// use testscribe_rate_limit::Pacer;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock = ManualClock::default();
/// let mut pacer = Pacer::from_rpm(30, Arc::new(clock.clone()) as SharedClock);
///
/// assert_eq!(pacer.wait().await, Duration::ZERO);
/// assert_eq!(pacer.wait().await, Duration::from_secs(2));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<DateTime<Utc>>,
    clock: SharedClock,
}

impl Pacer {
    /// Pacer with an explicit interval.
    pub fn new(interval: Duration, clock: SharedClock) -> Self {
        Self {
            interval,
            last: None,
            clock,
        }
    }

    /// Pacer for a requests-per-minute figure; `0` disables pacing.
    pub fn from_rpm(requests_per_minute: u32, clock: SharedClock) -> Self {
        let interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / f64::from(requests_per_minute))
        };
        Self::new(interval, clock)
    }

    /// Minimum spacing.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the interval since the previous call has passed, then
    /// mark a call. Returns the time slept.
    pub async fn wait(&mut self) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }

        let now = self.clock.now();
        let wait = match (self.last, TimeDelta::from_std(self.interval)) {
            (Some(last), Ok(interval)) => until(last + interval, now),
            _ => Duration::ZERO,
        };

        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Pacing before next call");
            self.clock.sleep(wait).await;
        }
        self.last = Some(self.clock.now());
        wait
    }
}

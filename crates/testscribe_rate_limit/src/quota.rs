//! Sliding-window consumption tracking for one limited resource.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use testscribe_core::until;

/// Answer of a capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// No limit configured (unset or zero)
    Unlimited,
    /// The requested amount fits now
    Available,
    /// The oldest consumption must age out first
    Wait(Duration),
    /// Limit reached in a window too long to wait out
    Exhausted,
}

impl Capacity {
    /// Wait implied by this answer; `None` for exhaustion.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Capacity::Unlimited | Capacity::Available => Some(Duration::ZERO),
            Capacity::Wait(wait) => Some(*wait),
            Capacity::Exhausted => None,
        }
    }
}

/// Sliding record of `(timestamp, amount)` pairs.
///
/// Entries at least one window old are pruned before every capacity check, so
/// answers never rest on stale consumption.
///
/// # Examples
///
/// ```
/// use testscribe_rate_limit::{Capacity, QuotaWindow};
/// use chrono::{TimeDelta, Utc};
///
/// let mut window = QuotaWindow::per_minute();
/// let start = Utc::now();
/// for _ in 0..5 {
///     window.record(1, start);
/// }
///
/// assert!(matches!(window.capacity_available(Some(5), 1, start), Capacity::Wait(_)));
/// let later = start + TimeDelta::seconds(60);
/// assert_eq!(window.capacity_available(Some(5), 1, later), Capacity::Available);
/// ```
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    span: TimeDelta,
    terminal: bool,
    entries: VecDeque<(DateTime<Utc>, u64)>,
}

impl QuotaWindow {
    /// Window of `span`. A `terminal` window reports [`Capacity::Exhausted`]
    /// instead of a wait when full.
    pub fn new(span: TimeDelta, terminal: bool) -> Self {
        Self {
            span,
            terminal,
            entries: VecDeque::new(),
        }
    }

    /// 60 second window that can be waited out.
    pub fn per_minute() -> Self {
        Self::new(TimeDelta::seconds(60), false)
    }

    /// 86400 second window that is terminal when full.
    pub fn per_day() -> Self {
        Self::new(TimeDelta::seconds(86_400), true)
    }

    /// Window length.
    pub fn span(&self) -> TimeDelta {
        self.span
    }

    /// Add consumption at `at`.
    pub fn record(&mut self, amount: u64, at: DateTime<Utc>) {
        if amount == 0 {
            return;
        }
        // Keep entries ordered even if a caller records a slightly older sample.
        let position = self
            .entries
            .iter()
            .rposition(|(ts, _)| *ts <= at)
            .map_or(0, |idx| idx + 1);
        self.entries.insert(position, (at, amount));
    }

    /// Drop entries at least one window old.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        while let Some((ts, _)) = self.entries.front() {
            if now - *ts >= self.span {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Consumption inside the window ending at `now`.
    pub fn usage(&mut self, now: DateTime<Utc>) -> u64 {
        self.prune(now);
        self.entries.iter().map(|(_, amount)| amount).sum()
    }

    /// Whether `requested` more fits under `limit` at `now`.
    ///
    /// A request larger than the whole limit is admitted once the window is
    /// empty; it could never fit otherwise.
    pub fn capacity_available(
        &mut self,
        limit: Option<u64>,
        requested: u64,
        now: DateTime<Utc>,
    ) -> Capacity {
        let limit = match limit {
            None | Some(0) => return Capacity::Unlimited,
            Some(limit) => limit,
        };

        let used = self.usage(now);
        if used == 0 || used + requested <= limit {
            return Capacity::Available;
        }
        if self.terminal {
            return Capacity::Exhausted;
        }

        let needed = (used + requested - limit).min(used);
        let mut freed = 0;
        for (ts, amount) in &self.entries {
            freed += amount;
            if freed >= needed {
                return Capacity::Wait(until(*ts + self.span, now));
            }
        }
        // Unreachable with needed <= used; fall back to the newest entry.
        let newest = self.entries.back().map_or(now, |(ts, _)| *ts);
        Capacity::Wait(until(newest + self.span, now))
    }

    /// Forget all consumption.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True when no consumption is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

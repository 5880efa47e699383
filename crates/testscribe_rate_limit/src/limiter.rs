//! Per-model rate limiter composed of three quota windows.

use crate::{Capacity, QuotaWindow};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use testscribe_core::BudgetConfig;
use tracing::debug;

/// Quota of one (provider, model) pair. `None` means unlimited.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Getters,
)]
pub struct RateLimits {
    /// Requests per minute
    requests_per_minute: Option<u32>,
    /// Tokens per minute
    tokens_per_minute: Option<u64>,
    /// Requests per day
    requests_per_day: Option<u32>,
}

impl RateLimits {
    /// Limits from the three dimensions.
    pub fn new(
        requests_per_minute: Option<u32>,
        tokens_per_minute: Option<u64>,
        requests_per_day: Option<u32>,
    ) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute,
            requests_per_day,
        }
    }

    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// True when no dimension is limited.
    pub fn is_unlimited(&self) -> bool {
        let limited = |value: Option<u64>| value.is_some_and(|v| v > 0);
        !limited(self.requests_per_minute.map(u64::from))
            && !limited(self.tokens_per_minute)
            && !limited(self.requests_per_day.map(u64::from))
    }

    /// Limits scaled down by budget multipliers.
    pub fn with_budget(&self, budget: &BudgetConfig) -> Self {
        Self {
            requests_per_minute: budget.scale_rpm(self.requests_per_minute),
            tokens_per_minute: budget.scale_tpm(self.tokens_per_minute),
            requests_per_day: budget.scale_rpd(self.requests_per_day),
        }
    }
}

/// Limits for every model of a provider: a default plus per-model overrides.
///
/// # Examples
///
/// ```
/// use testscribe_rate_limit::{ModelLimits, RateLimits};
///
/// let limits = ModelLimits::uniform(RateLimits::new(Some(10), None, Some(250)))
///     .with_model("gemini-2.5-pro", RateLimits::new(Some(2), None, Some(50)));
///
/// assert_eq!(*limits.for_model("gemini-2.5-pro").requests_per_day(), Some(50));
/// assert_eq!(*limits.for_model("gemini-2.0-flash").requests_per_day(), Some(250));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelLimits {
    default: RateLimits,
    overrides: HashMap<String, RateLimits>,
}

impl ModelLimits {
    /// Same limits for every model.
    pub fn uniform(default: RateLimits) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Override the limits of one model.
    pub fn with_model(mut self, model: impl Into<String>, limits: RateLimits) -> Self {
        self.overrides.insert(model.into(), limits);
        self
    }

    /// Limits that apply to `model`.
    pub fn for_model(&self, model: &str) -> RateLimits {
        self.overrides.get(model).copied().unwrap_or(self.default)
    }
}

/// Admission decision for one prospective call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// Call may proceed now
    Granted,
    /// Per-minute request or token window is full; retry after the wait
    MinuteThrottled(Duration),
    /// Daily request cap reached; pick another model or stop
    DailyExhausted,
}

impl Admission {
    /// Wait before the call may proceed; `None` when the daily cap is spent.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Admission::Granted => Some(Duration::ZERO),
            Admission::MinuteThrottled(wait) => Some(*wait),
            Admission::DailyExhausted => None,
        }
    }
}

/// Request, token and daily windows of one (provider, model) pair.
///
/// Admission is checked against an estimate; consumption is committed with
/// [`record_request`](Self::record_request) once the call is made and
/// [`record_tokens`](Self::record_tokens) once the real usage is known.
///
/// # Examples
///
/// ```
/// use testscribe_rate_limit::{Admission, RateLimiter, RateLimits};
/// use chrono::Utc;
///
/// let mut limiter = RateLimiter::new(RateLimits::new(Some(1), None, Some(2)));
/// let now = Utc::now();
///
/// assert_eq!(limiter.next_available_in(100, now), Admission::Granted);
/// limiter.record_request(now);
/// assert!(matches!(limiter.next_available_in(100, now), Admission::MinuteThrottled(_)));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: RateLimits,
    requests: QuotaWindow,
    tokens: QuotaWindow,
    daily: QuotaWindow,
}

impl RateLimiter {
    /// Limiter with empty windows.
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            requests: QuotaWindow::per_minute(),
            tokens: QuotaWindow::per_minute(),
            daily: QuotaWindow::per_day(),
        }
    }

    /// Configured limits.
    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    /// How long until a call estimated at `estimated_tokens` may proceed.
    ///
    /// The per-minute wait is the longest of the request and token waits,
    /// since both constraints must clear.
    pub fn next_available_in(&mut self, estimated_tokens: u64, now: DateTime<Utc>) -> Admission {
        let daily = self.daily.capacity_available(
            self.limits.requests_per_day.map(u64::from),
            1,
            now,
        );
        if daily == Capacity::Exhausted {
            debug!(rpd = ?self.limits.requests_per_day, "Daily request cap reached");
            return Admission::DailyExhausted;
        }

        let request_wait = self
            .requests
            .capacity_available(self.limits.requests_per_minute.map(u64::from), 1, now)
            .wait()
            .unwrap_or_default();
        let token_wait = self
            .tokens
            .capacity_available(self.limits.tokens_per_minute, estimated_tokens, now)
            .wait()
            .unwrap_or_default();

        let wait = request_wait.max(token_wait);
        if wait.is_zero() {
            Admission::Granted
        } else {
            debug!(
                request_wait_ms = request_wait.as_millis() as u64,
                token_wait_ms = token_wait.as_millis() as u64,
                "Per-minute window full"
            );
            Admission::MinuteThrottled(wait)
        }
    }

    /// Commit one request against the minute and day windows.
    pub fn record_request(&mut self, now: DateTime<Utc>) {
        self.requests.record(1, now);
        self.daily.record(1, now);
    }

    /// Commit token usage against the minute window.
    pub fn record_tokens(&mut self, tokens: u64, now: DateTime<Utc>) {
        self.tokens.record(tokens, now);
    }

    /// Requests in the last minute, tokens in the last minute, requests today.
    pub fn usage(&mut self, now: DateTime<Utc>) -> (u64, u64, u64) {
        (
            self.requests.usage(now),
            self.tokens.usage(now),
            self.daily.usage(now),
        )
    }

    /// True when no consumption is recorded in any window.
    pub fn is_fresh(&self) -> bool {
        self.requests.is_empty() && self.tokens.is_empty() && self.daily.is_empty()
    }

    /// Forget all consumption.
    pub fn reset(&mut self) {
        self.requests.clear();
        self.tokens.clear();
        self.daily.clear();
    }
}

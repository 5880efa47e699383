//! Bounded, classified retries around one provider call.

use derive_getters::Getters;
use derive_setters::Setters;
use std::future::Future;
use std::time::Duration;
use testscribe_core::SharedClock;
use testscribe_error::{
    LimitScope, ProviderError, ProviderErrorKind, RetryClass, RetryableError,
};
use tracing::{debug, instrument, warn};

/// Upper bound on configured attempts.
pub const MAX_ATTEMPTS: u32 = 10;

/// Backoff parameters of the [`RetryController`].
///
/// Rate-limited calls honour the server's retry-after (capped at
/// `max_retry_after`) or double `rate_limit_base` per attempt up to
/// `rate_limit_cap`. Transient failures wait `transient_step × attempt`.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct RetryPolicy {
    /// Attempts per call, including the first (1..=10)
    max_attempts: u32,
    /// First exponential delay after a 429
    rate_limit_base: Duration,
    /// Longest computed delay after a 429
    rate_limit_cap: Duration,
    /// Linear step for transient failures
    transient_step: Duration,
    /// Longest server-directed delay honoured
    max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(5),
            rate_limit_cap: Duration::from_secs(60),
            transient_step: Duration::from_secs(2),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Default delays with `max_attempts` clamped to 1..=10.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            ..Self::default()
        }
    }

    /// Delay after the `attempt`-th (1-based) rate-limited try.
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(delay) => delay.min(self.max_retry_after),
            None => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.rate_limit_base
                    .saturating_mul(factor)
                    .min(self.rate_limit_cap)
            }
        }
    }

    /// Delay after the `attempt`-th (1-based) transient failure.
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        self.transient_step.saturating_mul(attempt)
    }
}

fn rate_limit_message(kind: &ProviderErrorKind) -> String {
    match kind {
        ProviderErrorKind::RateLimited { message, .. }
        | ProviderErrorKind::HttpStatus { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Runs a provider call with the retry rules of a [`RetryPolicy`].
///
/// - fatal errors (parse failures, 4xx other than 429) return after one try
/// - per-day rate limits return immediately so the model pool can rotate
/// - per-minute rate limits back off and, at the ceiling, become
///   [`ProviderErrorKind::RateLimitExceeded`]
/// - transient errors back off linearly and, at the ceiling, become
///   [`ProviderErrorKind::RetriesExhausted`]
///
/// All sleeping goes through the injected clock.
#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
    clock: SharedClock,
}

impl RetryController {
    /// Controller sleeping on `clock`.
    pub fn new(policy: RetryPolicy, clock: SharedClock) -> Self {
        Self { policy, clock }
    }

    /// Backoff parameters.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds or the policy gives up. The closure gets
    /// the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the fatal or day-scoped error unchanged, or the ceiling error
    /// for rate-limited and transient failures.
    #[instrument(skip(self, call), fields(max_attempts = self.policy.max_attempts))]
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.policy.max_attempts.clamp(1, MAX_ATTEMPTS);
        let mut attempt = 1;

        loop {
            let error = match call(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match error.retry_class() {
                RetryClass::Fatal => {
                    debug!(attempt, error = %error.kind, "Fatal error, not retrying");
                    return Err(error);
                }
                RetryClass::RateLimited {
                    scope: LimitScope::Day,
                    ..
                } => {
                    warn!(attempt, error = %error.kind, "Daily limit reached, not retrying");
                    return Err(error);
                }
                RetryClass::RateLimited { retry_after, .. } => {
                    if attempt >= max_attempts {
                        warn!(attempt, "Rate limit persisted through every attempt");
                        return Err(ProviderError::new(ProviderErrorKind::RateLimitExceeded {
                            attempts: attempt,
                            message: rate_limit_message(&error.kind),
                            retry_after,
                        }));
                    }
                    self.policy.rate_limit_delay(attempt, retry_after)
                }
                RetryClass::Transient => {
                    if attempt >= max_attempts {
                        warn!(attempt, error = %error.kind, "Transient failure persisted");
                        return Err(ProviderError::new(ProviderErrorKind::RetriesExhausted {
                            attempts: attempt,
                            last_error: error.kind.to_string(),
                        }));
                    }
                    self.policy.transient_delay(attempt)
                }
            };

            warn!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error.kind,
                "Retrying provider call"
            );
            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}

//! Provider error types and retry classification.

use std::time::Duration;

/// Time scope of a rate limit signalled by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum LimitScope {
    /// Requests or tokens per minute; waiting clears it
    #[display("per-minute")]
    Minute,
    /// Requests per day; the model is unusable until the quota period rolls over
    #[display("per-day")]
    Day,
}

/// Conditions raised while talking to an LLM provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// Required credential missing from the environment
    #[display("{} is not set", _0)]
    MissingApiKey(String),
    /// Provider support was not compiled into this build
    #[display("Provider support missing: {}", _0)]
    DependencyMissing(String),
    /// Provider answered with a rate-limit signal (HTTP 429 or equivalent)
    #[display("Rate limited ({}): {}", scope, message)]
    RateLimited {
        /// Provider message
        message: String,
        /// Server directed delay before the next attempt
        retry_after: Option<Duration>,
        /// Whether the limit is per-minute or per-day
        scope: LimitScope,
    },
    /// Retry ceiling reached while the provider kept rate limiting
    #[display("Rate limit exceeded after {} attempt(s): {}", attempts, message)]
    RateLimitExceeded {
        /// Attempts made before giving up
        attempts: u32,
        /// Last provider message
        message: String,
        /// Last server directed delay, if any
        retry_after: Option<Duration>,
    },
    /// Every candidate model has used its daily allotment
    #[display("Daily quota exhausted: {}", _0)]
    DailyQuotaExhausted(String),
    /// Connection level failure
    #[display("Network error: {}", _0)]
    Network(String),
    /// Call exceeded the configured timeout
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// Non-success HTTP status other than 429
    #[display("HTTP {} error: {}", status_code, message)]
    HttpStatus {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason
        message: String,
    },
    /// Response text did not contain a JSON object
    #[display("Failed to parse LLM response: {}", _0)]
    UnparseableResponse(String),
    /// Response JSON had the wrong shape
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
    /// Prompt rejected as exceeding the model context window
    #[display("Context too long: {}", _0)]
    ContextTooLong(String),
    /// Listing the provider's models failed
    #[display("Model discovery failed: {}", _0)]
    ModelDiscovery(String),
    /// Transient failures persisted through every retry
    #[display("Failed after {} attempt(s): {}", attempts, last_error)]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },
    /// Model pool gave up after cycling through every candidate
    #[display("No model available after {} selection cycle(s): {}", cycles, last_error)]
    PoolExhausted {
        /// Selection cycles attempted
        cycles: u32,
        /// Message of the final failure
        last_error: String,
    },
}

/// How a failed call should be treated by the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryClass {
    /// Back off (server directed or exponential) and retry the same model,
    /// unless the scope is per-day
    RateLimited {
        /// Server directed delay
        retry_after: Option<Duration>,
        /// Scope of the limit
        scope: LimitScope,
    },
    /// Network failure, timeout or 5xx: linear backoff and retry
    Transient,
    /// Retrying the same prompt cannot help
    Fatal,
}

impl ProviderErrorKind {
    /// Classify this error for the retry controller.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            ProviderErrorKind::RateLimited {
                retry_after, scope, ..
            } => RetryClass::RateLimited {
                retry_after: *retry_after,
                scope: *scope,
            },
            ProviderErrorKind::HttpStatus { status_code, .. } => match *status_code {
                429 => RetryClass::RateLimited {
                    retry_after: None,
                    scope: LimitScope::Minute,
                },
                408 | 500 | 502 | 503 | 504 => RetryClass::Transient,
                _ => RetryClass::Fatal,
            },
            ProviderErrorKind::Network(_) | ProviderErrorKind::Timeout(_) => RetryClass::Transient,
            _ => RetryClass::Fatal,
        }
    }

    /// True for conditions that stop the whole run for this provider
    /// (missing credentials or compiled-out support).
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::MissingApiKey(_) | ProviderErrorKind::DependencyMissing(_)
        )
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use testscribe_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::MissingApiKey("GEMINI_API_TOKEN".into()));
/// assert!(format!("{}", err).contains("GEMINI_API_TOKEN is not set"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Errors that know whether a retry can help.
///
/// # Examples
///
/// ```
/// use testscribe_error::{ProviderError, ProviderErrorKind, RetryClass, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::HttpStatus {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// assert_eq!(err.retry_class(), RetryClass::Transient);
/// ```
pub trait RetryableError {
    /// Classify the error.
    fn retry_class(&self) -> RetryClass;

    /// Returns true if retrying the same request may succeed.
    fn is_retryable(&self) -> bool {
        !matches!(self.retry_class(), RetryClass::Fatal)
    }
}

impl RetryableError for ProviderError {
    fn retry_class(&self) -> RetryClass {
        self.kind.retry_class()
    }
}

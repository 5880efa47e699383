//! Rate-limit signals extracted from provider responses.
//!
//! Providers announce back-off in different places: the standard
//! `Retry-After` header (integer or fractional seconds), or Google's
//! `RetryInfo.retryDelay` field (`"30s"`) in the error body. Quota violations
//! naming a per-day metric mark the model as exhausted rather than throttled.

use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::LazyLock;
use std::time::Duration;
use testscribe_error::LimitScope;
use tracing::debug;

static RETRY_DELAY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""retryDelay"\s*:\s*"(\d+(?:\.\d+)?)s""#).ok());

fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Server-directed delay from a `Retry-After` header given in seconds.
///
/// HTTP-date values are ignored; callers fall back to computed backoff.
///
/// # Examples
///
/// ```
/// use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
/// use std::time::Duration;
/// use testscribe_rate_limit::retry_after_from_headers;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
/// assert_eq!(retry_after_from_headers(&headers), Some(Duration::from_millis(1500)));
/// ```
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let delay = parse_seconds(value);
    debug!(header = value, ?delay, "Parsed Retry-After header");
    delay
}

/// Server-directed delay from a Google `RetryInfo` error body.
pub fn retry_delay_from_body(body: &str) -> Option<Duration> {
    let regex = RETRY_DELAY.as_ref()?;
    let captures = regex.captures(body)?;
    parse_seconds(captures.get(1)?.as_str())
}

/// Scope of a 429 response judged from its body.
pub fn limit_scope_from_body(body: &str) -> LimitScope {
    let lowered = body.to_ascii_lowercase();
    if lowered.contains("perday") || lowered.contains("per day") || lowered.contains("daily") {
        LimitScope::Day
    } else {
        LimitScope::Minute
    }
}

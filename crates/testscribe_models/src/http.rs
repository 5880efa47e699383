//! HTTP plumbing shared by the backends: client construction and failure
//! classification.

use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use testscribe_error::{HttpError, ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_rate_limit::{limit_scope_from_body, retry_after_from_headers, retry_delay_from_body};
use tracing::{debug, warn};

/// Phrases providers use when a prompt overflows the context window.
const CONTEXT_OVERFLOW_MARKERS: &[&str] = &[
    "context_length_exceeded",
    "maximum context length",
    "exceeds the maximum number of tokens",
    "context window",
];

/// Client with the per-call timeout applied.
///
/// # Errors
///
/// Returns an [`HttpError`] if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> ScribeResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)).into())
}

/// Classify a failure that happened before any response arrived.
pub fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout(err.to_string()))
    } else {
        ProviderError::new(ProviderErrorKind::Network(err.to_string()))
    }
}

/// Classify a non-success response from its status, headers and body.
///
/// # Examples
///
/// ```
/// use reqwest::StatusCode;
/// use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
/// use std::time::Duration;
/// use testscribe_error::{LimitScope, ProviderErrorKind};
/// use testscribe_models::classify_status;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
///
/// let err = classify_status(StatusCode::TOO_MANY_REQUESTS, &headers, "slow down");
/// assert_eq!(
///     err.kind,
///     ProviderErrorKind::RateLimited {
///         message: "slow down".to_string(),
///         retry_after: Some(Duration::from_secs(12)),
///         scope: LimitScope::Minute,
///     }
/// );
///
/// let err = classify_status(StatusCode::BAD_REQUEST, &HeaderMap::new(), "context_length_exceeded");
/// assert!(matches!(err.kind, ProviderErrorKind::ContextTooLong(_)));
/// ```
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after_from_headers(headers).or_else(|| retry_delay_from_body(body));
        let scope = limit_scope_from_body(body);
        warn!(?retry_after, %scope, "Provider rate limited the request");
        return ProviderError::new(ProviderErrorKind::RateLimited {
            message: body.to_string(),
            retry_after,
            scope,
        });
    }

    if status == StatusCode::BAD_REQUEST {
        let lowered = body.to_ascii_lowercase();
        if CONTEXT_OVERFLOW_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            return ProviderError::new(ProviderErrorKind::ContextTooLong(body.to_string()));
        }
    }

    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.to_string()
    };
    ProviderError::new(ProviderErrorKind::HttpStatus {
        status_code: status.as_u16(),
        message,
    })
}

/// Consume a non-success response into a classified error.
pub async fn error_from_response(response: Response) -> ProviderError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body_len = body.len(), "Provider returned error");
    classify_status(status, &headers, &body)
}

/// First non-empty environment variable among `names`.
pub fn env_key(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

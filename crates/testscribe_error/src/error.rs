//! Top-level error wrapper types.

use crate::{
    BuilderError, CacheError, ConfigError, ContextError, HttpError, JsonError, ProviderError,
    ProviderErrorKind, RetryClass, RetryableError,
};

/// Every error family testscribe can raise.
///
/// # Examples
///
/// ```
/// use testscribe_error::{ScribeError, HttpError};
///
/// let err: ScribeError = HttpError::new("failed to build client").into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ScribeErrorKind {
    /// HTTP transport error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Annotation cache error
    #[from(CacheError)]
    Cache(CacheError),
    /// Context assembly error
    #[from(ContextError)]
    Context(ContextError),
    /// Builder validation error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// LLM provider error
    #[from(ProviderError)]
    Provider(ProviderError),
}

/// testscribe error with kind discrimination.
///
/// # Examples
///
/// ```
/// use testscribe_error::{ConfigError, ScribeResult};
///
/// fn validate() -> ScribeResult<()> {
///     Err(ConfigError::new("unknown provider 'foo'"))?
/// }
///
/// let err = validate().unwrap_err();
/// assert_eq!(err.user_message(), "unknown provider 'foo'");
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("testscribe Error: {}", _0)]
pub struct ScribeError(Box<ScribeErrorKind>);

impl ScribeError {
    /// Create a new error from a kind.
    pub fn new(kind: ScribeErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ScribeErrorKind {
        &self.0
    }

    /// Provider error kind, when this is a provider failure.
    pub fn provider_kind(&self) -> Option<&ProviderErrorKind> {
        match self.kind() {
            ScribeErrorKind::Provider(err) => Some(&err.kind),
            _ => None,
        }
    }

    /// Message without source location, suitable for reports and summaries.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ScribeErrorKind::Http(err) => err.message.clone(),
            ScribeErrorKind::Json(err) => err.message.clone(),
            ScribeErrorKind::Config(err) => err.message.clone(),
            ScribeErrorKind::Cache(err) => err.kind.to_string(),
            ScribeErrorKind::Context(err) => err.kind.to_string(),
            ScribeErrorKind::Builder(err) => err.kind.to_string(),
            ScribeErrorKind::Provider(err) => err.kind.to_string(),
        }
    }
}

impl RetryableError for ScribeError {
    fn retry_class(&self) -> RetryClass {
        match self.kind() {
            ScribeErrorKind::Provider(err) => err.retry_class(),
            ScribeErrorKind::Http(_) => RetryClass::Transient,
            _ => RetryClass::Fatal,
        }
    }
}

// Generic From implementation for any type that converts to ScribeErrorKind
impl<T> From<T> for ScribeError
where
    T: Into<ScribeErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for testscribe operations.
pub type ScribeResult<T> = std::result::Result<T, ScribeError>;

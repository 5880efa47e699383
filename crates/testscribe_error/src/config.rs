//! Configuration error types.

/// Invalid or unreadable configuration.
///
/// Configuration errors are fatal: they surface at startup before any test is
/// annotated.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use testscribe_error::ConfigError;
    ///
    /// let err = ConfigError::new("max_retries must be between 1 and 10, got 0");
    /// assert!(err.message.contains("max_retries"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}

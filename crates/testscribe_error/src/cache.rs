//! Annotation cache error types.

/// Kinds of annotation cache failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// Failed to create the cache directory
    #[display("Failed to create cache directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a cache entry
    #[display("Failed to write cache entry: {}", _0)]
    Write(String),
    /// Failed to read a cache entry
    #[display("Failed to read cache entry: {}", _0)]
    Read(String),
    /// Entry exists but cannot be decoded
    #[display("Corrupt cache entry: {}", _0)]
    Corrupt(String),
    /// Failed to remove an entry or directory
    #[display("Failed to remove cache entry: {}", _0)]
    Remove(String),
}

/// Annotation cache error with location tracking.
///
/// Cache errors never fail an annotation run; callers log them and treat the
/// lookup as a miss.
///
/// # Examples
///
/// ```
/// use testscribe_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::Corrupt("ab/abcd.json".to_string()));
/// assert!(format!("{}", err).contains("Corrupt cache entry"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

//! Context assembly errors.

/// Kinds of context assembly failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ContextErrorKind {
    /// The test function could not be located in its file
    #[display("Test source not found: {}", _0)]
    SourceNotFound(String),
    /// A source or context file could not be read
    #[display("Failed to read {}: {}", path, reason)]
    Read {
        /// Path that failed
        path: String,
        /// Underlying I/O message
        reason: String,
    },
    /// An exclusion pattern could not be compiled
    #[display("Invalid exclude pattern '{}': {}", pattern, reason)]
    InvalidPattern {
        /// The offending glob
        pattern: String,
        /// Compiler message
        reason: String,
    },
}

/// Context assembly error with location tracking.
///
/// A context error affects only the test being assembled; the run records it
/// against that test and moves on.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Context Error: {} at line {} in {}", kind, line, file)]
pub struct ContextError {
    /// The kind of error that occurred
    pub kind: ContextErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ContextError {
    /// Create a new context error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ContextErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

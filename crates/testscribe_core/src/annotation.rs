//! Annotations produced for tests.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Confidence attached to every structurally valid annotation.
///
/// Providers expose no finer signal, so the value is constant.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Natural-language explanation of what a test verifies.
///
/// Either the descriptive fields or `error` is meaningful; an errored
/// annotation may still carry partial data for diagnostics. Annotations are
/// never mutated once created.
///
/// # Examples
///
/// ```
/// use testscribe_core::{Annotation, DEFAULT_CONFIDENCE};
///
/// let ok = Annotation::new(
///     "Adds two numbers",
///     "Guards the arithmetic core",
///     vec!["result == 3".to_string()],
/// );
/// assert_eq!(*ok.confidence(), Some(DEFAULT_CONFIDENCE));
/// assert!(!ok.is_error());
///
/// let failed = Annotation::failed("Request timed out: 30s");
/// assert!(failed.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters)]
pub struct Annotation {
    /// What the test exercises
    #[serde(default)]
    scenario: String,
    /// Why the test matters
    #[serde(default)]
    why_needed: String,
    /// The assertions that carry the test
    #[serde(default)]
    key_assertions: Vec<String>,
    /// Confidence of a successful parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    /// Why no annotation could be produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Annotation {
    /// Create a successful annotation.
    pub fn new(
        scenario: impl Into<String>,
        why_needed: impl Into<String>,
        key_assertions: Vec<String>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            why_needed: why_needed.into(),
            key_assertions,
            confidence: Some(DEFAULT_CONFIDENCE),
            error: None,
        }
    }

    /// Create an annotation recording a failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when this annotation records a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

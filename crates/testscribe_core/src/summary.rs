//! Run summary handed to the report writer.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Outcome counts for one annotation run.
///
/// Only messages reach the summary, never stack traces or source locations,
/// so reports stay stable between runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct RunSummary {
    /// Provider name (`none`, `ollama`, `litellm`, `gemini`)
    provider: String,
    /// Configured model string
    model: String,
    /// Tests that received an annotation, errored or not
    annotations_count: usize,
    /// Annotations carrying an error
    annotations_errors: usize,
    /// Message of the first error
    first_error: Option<String>,
    /// Annotations served from the cache
    cache_hits: usize,
    /// Provider calls made
    live_calls: usize,
}

impl RunSummary {
    /// Start an empty summary.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Count an annotation served from the cache.
    pub fn record_cache_hit(&mut self) {
        self.annotations_count += 1;
        self.cache_hits += 1;
    }

    /// Count a provider call that produced an annotation.
    pub fn record_live_success(&mut self) {
        self.annotations_count += 1;
        self.live_calls += 1;
    }

    /// Count a failed annotation; `called` says whether the provider was invoked.
    pub fn record_error(&mut self, message: &str, called: bool) {
        self.annotations_count += 1;
        self.annotations_errors += 1;
        if called {
            self.live_calls += 1;
        }
        if self.first_error.is_none() {
            self.first_error = Some(message.to_string());
        }
    }

    /// Human-readable one-liner.
    pub fn headline(&self) -> String {
        format!(
            "Annotated {} test(s) via {} ({} error(s))",
            self.annotations_count, self.provider, self.annotations_errors
        )
    }
}

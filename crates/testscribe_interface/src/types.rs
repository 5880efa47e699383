//! Request and response types shared across the provider seam.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use testscribe_core::{ContextFile, RequestBudget, TokenUsage};

/// Prompt sent to a completion backend.
///
/// # Examples
///
/// ```
/// use testscribe_interface::PromptRequest;
///
/// let request = PromptRequest::new("Answer in JSON", "Test: tests/test_a.py::test_one");
/// assert!(*request.budget().estimated_tokens() > 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct PromptRequest {
    /// Fixed system instruction
    system: String,
    /// User prompt embedding the test source and context
    prompt: String,
    /// Admission estimate derived from both texts
    budget: RequestBudget,
}

impl PromptRequest {
    /// Request with its budget estimated from the prompt texts.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        let system = system.into();
        let prompt = prompt.into();
        let budget = RequestBudget::for_prompt(&system, &prompt);
        Self {
            system,
            prompt,
            budget,
        }
    }
}

/// Text returned by a completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Completion {
    /// Raw response text
    text: String,
    /// Usage reported by the provider, when it reports any
    usage: Option<TokenUsage>,
}

impl Completion {
    /// Create a completion.
    pub fn new(text: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Test source and supporting snippets for one test.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct AssembledContext {
    /// Exact source text of the test
    source: String,
    /// Ordered supporting snippets, already bounded
    context: Vec<ContextFile>,
}

impl AssembledContext {
    /// Create an assembled context.
    pub fn new(source: impl Into<String>, context: Vec<ContextFile>) -> Self {
        Self {
            source: source.into(),
            context,
        }
    }
}

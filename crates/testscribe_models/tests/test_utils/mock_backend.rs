//! Mock completion backend for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use testscribe_core::TokenUsage;
use testscribe_error::{ProviderError, ProviderErrorKind};
use testscribe_interface::{Completion, CompletionBackend, PromptRequest};

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return success with the given text
    Success(String),
    /// Always return the specified error
    Error(ProviderErrorKind),
    /// Fail N times with the error, then succeed with the text
    FailThenSucceed {
        fail_count: usize,
        error: ProviderErrorKind,
        success_text: String,
    },
    /// Return a sequence of responses (errors or success)
    Sequence(Vec<MockResponse>),
}

/// A single mock response (success or error).
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(ProviderErrorKind),
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub model: String,
    pub prompt: String,
}

/// Scripted backend recording every call.
///
/// Behavior can differ per model; clones share the call log.
#[derive(Debug, Clone)]
pub struct MockBackend {
    default: MockBehavior,
    per_model: HashMap<String, MockBehavior>,
    listed_models: Result<Vec<String>, ProviderErrorKind>,
    usage: Option<TokenUsage>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    listings: Arc<Mutex<usize>>,
}

impl MockBackend {
    /// Create a mock backend with custom behavior for every model.
    pub fn new_with_behavior(behavior: MockBehavior) -> Self {
        Self {
            default: behavior,
            per_model: HashMap::new(),
            listed_models: Ok(Vec::new()),
            usage: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            listings: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a mock backend that always succeeds with the given text.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new_with_behavior(MockBehavior::Success(text.into()))
    }

    /// Create a mock backend that always fails with the given error.
    #[allow(dead_code)]
    pub fn new_error(error: ProviderErrorKind) -> Self {
        Self::new_with_behavior(MockBehavior::Error(error))
    }

    /// Override the behavior of one model.
    #[allow(dead_code)]
    pub fn with_model(mut self, model: &str, behavior: MockBehavior) -> Self {
        self.per_model.insert(model.to_string(), behavior);
        self
    }

    /// Models returned by `list_models`.
    #[allow(dead_code)]
    pub fn with_listing(mut self, models: &[&str]) -> Self {
        self.listed_models = Ok(models.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Make `list_models` fail.
    #[allow(dead_code)]
    pub fn with_failing_listing(mut self) -> Self {
        self.listed_models = Err(ProviderErrorKind::ModelDiscovery("listing failed".to_string()));
        self
    }

    /// Usage reported with every success.
    #[allow(dead_code)]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of times complete() was called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Models called, in order.
    #[allow(dead_code)]
    pub fn called_models(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.model).collect()
    }

    /// Number of `list_models` calls.
    #[allow(dead_code)]
    pub fn listing_count(&self) -> usize {
        *self.listings.lock().unwrap()
    }

    /// Get the next response for `model` based on the configured behavior.
    fn next_response(&self, model: &str, prompt: &str) -> Result<String, ProviderErrorKind> {
        let mut calls = self.calls.lock().unwrap();
        let current_count = calls.iter().filter(|call| call.model == model).count();
        calls.push(MockCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        match self.per_model.get(model).unwrap_or(&self.default) {
            MockBehavior::Success(text) => Ok(text.clone()),
            MockBehavior::Error(kind) => Err(kind.clone()),
            MockBehavior::FailThenSucceed {
                fail_count,
                error,
                success_text,
            } => {
                if current_count < *fail_count {
                    Err(error.clone())
                } else {
                    Ok(success_text.clone())
                }
            }
            MockBehavior::Sequence(responses) => match responses.get(current_count) {
                Some(MockResponse::Success(text)) => Ok(text.clone()),
                Some(MockResponse::Error(kind)) => Err(kind.clone()),
                // Past end of sequence, return error
                None => Err(ProviderErrorKind::InvalidResponse(format!(
                    "Mock sequence exhausted (call {} beyond {} responses)",
                    current_count + 1,
                    responses.len()
                ))),
            },
        }
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &'static str {
        "mock-default"
    }

    async fn complete(
        &self,
        model: &str,
        request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        self.next_response(model, request.prompt())
            .map(|text| Completion::new(text, self.usage))
            .map_err(ProviderError::new)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        *self.listings.lock().unwrap() += 1;
        self.listed_models.clone().map_err(ProviderError::new)
    }
}

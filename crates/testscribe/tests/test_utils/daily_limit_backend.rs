//! Completion backend whose server always reports a spent daily quota.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use testscribe::{
    Completion, CompletionBackend, LimitScope, PromptRequest, ProviderError, ProviderErrorKind,
};

/// Answers every request with a day-scoped 429; clones share the call count.
#[derive(Debug, Clone, Default)]
pub struct DailyLimitBackend {
    calls: Arc<Mutex<usize>>,
}

impl DailyLimitBackend {
    /// Requests that reached the backend.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionBackend for DailyLimitBackend {
    fn name(&self) -> &'static str {
        "daily-limited"
    }

    fn default_model(&self) -> &'static str {
        "limited-model"
    }

    async fn complete(
        &self,
        _model: &str,
        _request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        Err(ProviderError::new(ProviderErrorKind::RateLimited {
            message: "Quota exceeded: GenerateRequestsPerDay".to_string(),
            retry_after: None,
            scope: LimitScope::Day,
        }))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.default_model().to_string()])
    }
}

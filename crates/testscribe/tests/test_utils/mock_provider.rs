//! Mock annotation provider for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use testscribe::{
    Annotation, AnnotationProvider, ContextFile, ProviderError, ProviderErrorKind, RateLimits,
    ScribeResult, TestUnit,
};

/// Scripted provider recording every call.
///
/// Scripted outcomes are consumed in order; once the script runs out every
/// call succeeds. Clones share the script and the call log.
#[derive(Debug, Clone)]
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<Result<Annotation, ProviderErrorKind>>>>,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
    not_ready: Option<ProviderErrorKind>,
    limits: Option<RateLimits>,
}

impl MockProvider {
    /// Provider that always succeeds.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            not_ready: None,
            limits: None,
        }
    }

    /// Queue outcomes for the next calls.
    #[allow(dead_code)]
    pub fn with_script(self, outcomes: Vec<Result<Annotation, ProviderErrorKind>>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    /// Fail the readiness check with `kind`.
    #[allow(dead_code)]
    pub fn with_not_ready(mut self, kind: ProviderErrorKind) -> Self {
        self.not_ready = Some(kind);
        self
    }

    /// Publish rate limits.
    #[allow(dead_code)]
    pub fn with_limits(mut self, limits: RateLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Node ids passed to `annotate`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(nodeid, _)| nodeid.clone())
            .collect()
    }

    /// Context file counts passed to `annotate`, in order.
    #[allow(dead_code)]
    pub fn context_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    /// Number of `annotate` calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AnnotationProvider for MockProvider {
    async fn annotate(
        &self,
        test: &TestUnit,
        _source: &str,
        context: &[ContextFile],
    ) -> ScribeResult<Annotation> {
        self.calls
            .lock()
            .unwrap()
            .push((test.nodeid().clone(), context.len()));
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(annotation)) => Ok(annotation),
            Some(Err(kind)) => Err(ProviderError::new(kind).into()),
            None => Ok(Annotation::new(
                format!("Checks {}", test.function_name()),
                "Guards against regressions",
                vec!["result == expected".to_string()],
            )),
        }
    }

    async fn is_available(&self) -> bool {
        self.not_ready.is_none()
    }

    fn rate_limits(&self) -> Option<RateLimits> {
        self.limits
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn check_ready(&self) -> ScribeResult<()> {
        match &self.not_ready {
            Some(kind) => Err(ProviderError::new(kind.clone()).into()),
            None => Ok(()),
        }
    }
}

//! Providers that never reach a model.

use async_trait::async_trait;
use testscribe_core::{Annotation, ContextFile, TestUnit};
use testscribe_error::{ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::AnnotationProvider;
use testscribe_rate_limit::RateLimits;

/// Provider used when annotation is disabled. Returns an empty annotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

#[async_trait]
impl AnnotationProvider for NoopProvider {
    async fn annotate(
        &self,
        _test: &TestUnit,
        _source: &str,
        _context: &[ContextFile],
    ) -> ScribeResult<Annotation> {
        Ok(Annotation::default())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn rate_limits(&self) -> Option<RateLimits> {
        None
    }

    fn provider_name(&self) -> &'static str {
        "none"
    }

    fn model_name(&self) -> &str {
        ""
    }
}

/// Stand-in for a provider that cannot run in this build or environment.
///
/// Every call fails with the stored condition, so the orchestrator reports
/// it once for the whole run.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: &'static str,
    model: String,
    reason: ProviderErrorKind,
}

impl UnavailableProvider {
    /// Provider `name` that always fails with `reason`.
    pub fn new(name: &'static str, model: impl Into<String>, reason: ProviderErrorKind) -> Self {
        Self {
            name,
            model: model.into(),
            reason,
        }
    }

    /// Why the provider cannot run.
    pub fn reason(&self) -> &ProviderErrorKind {
        &self.reason
    }

    fn error(&self) -> ProviderError {
        ProviderError::new(self.reason.clone())
    }
}

#[async_trait]
impl AnnotationProvider for UnavailableProvider {
    async fn annotate(
        &self,
        _test: &TestUnit,
        _source: &str,
        _context: &[ContextFile],
    ) -> ScribeResult<Annotation> {
        Err(self.error().into())
    }

    async fn is_available(&self) -> bool {
        false
    }

    fn rate_limits(&self) -> Option<RateLimits> {
        None
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn check_ready(&self) -> ScribeResult<()> {
        Err(self.error().into())
    }
}

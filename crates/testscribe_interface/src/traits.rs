//! Trait definitions for providers and collaborators.

use crate::{AssembledContext, Completion, PromptRequest};
use async_trait::async_trait;
use std::fmt::Debug;
use testscribe_core::{Annotation, ContextFile, TestUnit};
use testscribe_error::{ProviderError, ScribeResult};
use testscribe_rate_limit::RateLimits;

/// Capability set of an annotation provider.
///
/// A provider turns one test's source and context into an [`Annotation`].
/// Failures come back as errors; the orchestrator records them on the test
/// and carries on.
#[async_trait]
pub trait AnnotationProvider: Send + Sync {
    /// Annotate one test.
    async fn annotate(
        &self,
        test: &TestUnit,
        source: &str,
        context: &[ContextFile],
    ) -> ScribeResult<Annotation>;

    /// Whether the provider can be reached right now.
    async fn is_available(&self) -> bool;

    /// Quota of the primary model, or `None` when the provider publishes
    /// none; the orchestrator then applies its own pacing floor.
    fn rate_limits(&self) -> Option<RateLimits>;

    /// Provider name (`none`, `ollama`, `litellm`, `gemini`).
    fn provider_name(&self) -> &'static str;

    /// Configured model string.
    fn model_name(&self) -> &str;

    /// Run-level preconditions such as credentials. An error here applies to
    /// every test of the run.
    async fn check_ready(&self) -> ScribeResult<()> {
        Ok(())
    }

    /// Models this provider would rotate through.
    async fn candidate_models(&self) -> ScribeResult<Vec<String>> {
        Ok(vec![self.model_name().to_string()])
    }
}

/// One HTTP API that completes a prompt.
///
/// Backends classify failures into [`ProviderError`] kinds so the retry
/// controller and model pool can react; they never retry on their own.
#[async_trait]
pub trait CompletionBackend: Send + Sync + Debug {
    /// Backend name used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Model used when configuration names none.
    fn default_model(&self) -> &'static str;

    /// Send `request` to `model`.
    async fn complete(&self, model: &str, request: &PromptRequest)
    -> Result<Completion, ProviderError>;

    /// Models the backend can serve, in listing order.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Credentials and other preconditions.
    async fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Whether the endpoint answers.
    async fn is_reachable(&self) -> bool {
        self.check_ready().await.is_ok()
    }
}

/// Supplies the source text and supporting snippets of a test.
pub trait ContextAssembler: Send + Sync {
    /// Assemble the prompt material for `test`.
    ///
    /// # Errors
    ///
    /// Returns an error when the test source cannot be located.
    fn assemble(&self, test: &TestUnit) -> ScribeResult<AssembledContext>;
}

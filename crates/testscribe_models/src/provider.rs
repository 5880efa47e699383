//! Single-model providers over a [`CompletionBackend`].

use crate::{SYSTEM_PROMPT, build_prompt, parse_annotation};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use testscribe_core::{Annotation, ContextFile, SharedClock, TestUnit};
use testscribe_error::{LimitScope, ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::{AnnotationProvider, Completion, CompletionBackend, PromptRequest};
use testscribe_rate_limit::{Admission, RateLimiter, RateLimits, RetryController};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "ollama")]
use crate::OllamaBackend;

#[cfg(feature = "litellm")]
use crate::OpenAiCompatBackend;

/// Provider for a local HTTP model server.
#[cfg(feature = "ollama")]
pub type LocalHttpProvider = HttpProvider<OllamaBackend>;

/// Provider for an OpenAI-compatible proxy fronting many backends.
#[cfg(feature = "litellm")]
pub type MultiBackendProvider = HttpProvider<OpenAiCompatBackend>;

/// Build the request for one test and hand it to `complete`; when the
/// backend rejects the prompt as too long, try once more without context.
pub(crate) async fn annotate_via<F, Fut>(
    test: &TestUnit,
    source: &str,
    context: &[ContextFile],
    mut complete: F,
) -> Result<Annotation, ProviderError>
where
    F: FnMut(PromptRequest) -> Fut,
    Fut: std::future::Future<Output = Result<Completion, ProviderError>>,
{
    let request = PromptRequest::new(SYSTEM_PROMPT, build_prompt(test, source, context));
    let completion = match complete(request).await {
        Err(err) if matches!(err.kind, ProviderErrorKind::ContextTooLong(_)) && !context.is_empty() => {
            warn!(test = %test.nodeid(), "Prompt too long, retrying without context");
            let request = PromptRequest::new(SYSTEM_PROMPT, build_prompt(test, source, &[]));
            complete(request).await?
        }
        other => other?,
    };
    parse_annotation(completion.text())
}

/// A provider that calls one configured model through `B`.
///
/// Calls go through a [`RetryController`]. When the model has published
/// limits, a [`RateLimiter`] gates each attempt; otherwise
/// [`rate_limits`](AnnotationProvider::rate_limits) is `None` and the
/// orchestrator paces calls itself.
///
/// A day-scoped 429 from the server leaves no model to fall back on, so it
/// surfaces as [`ProviderErrorKind::DailyQuotaExhausted`] and later calls
/// fail without a request until a day has passed.
#[derive(Debug)]
pub struct HttpProvider<B: CompletionBackend> {
    backend: B,
    model: String,
    retry: RetryController,
    clock: SharedClock,
    limits: RateLimits,
    limiter: Option<Mutex<RateLimiter>>,
    exhausted_at: Mutex<Option<DateTime<Utc>>>,
}

impl<B: CompletionBackend> HttpProvider<B> {
    /// Provider for `model` (the backend default when empty).
    pub fn new(
        backend: B,
        model: impl Into<String>,
        limits: RateLimits,
        retry: RetryController,
        clock: SharedClock,
    ) -> Self {
        let model = model.into();
        let model = if model.trim().is_empty() {
            backend.default_model().to_string()
        } else {
            model.trim().to_string()
        };
        let limiter = (!limits.is_unlimited()).then(|| Mutex::new(RateLimiter::new(limits)));

        info!(backend = backend.name(), %model, limited = limiter.is_some(), "Created provider");
        Self {
            backend,
            model,
            retry,
            clock,
            limits,
            limiter,
            exhausted_at: Mutex::new(None),
        }
    }

    /// Wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Wait for the limiter, then commit one request.
    async fn admit(&self, request: &PromptRequest) -> Result<(), ProviderError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let estimate = *request.budget().estimated_tokens();

        loop {
            let now = self.clock.now();
            let mut guard = limiter.lock().await;
            match guard.next_available_in(estimate, now) {
                Admission::Granted => {
                    guard.record_request(now);
                    return Ok(());
                }
                Admission::MinuteThrottled(wait) => {
                    drop(guard);
                    debug!(wait_ms = wait.as_millis() as u64, "Waiting for quota");
                    self.clock.sleep(wait).await;
                }
                Admission::DailyExhausted => {
                    return Err(ProviderError::new(ProviderErrorKind::DailyQuotaExhausted(
                        self.model.clone(),
                    )));
                }
            }
        }
    }

    fn daily_exhausted(&self) -> ProviderError {
        ProviderError::new(ProviderErrorKind::DailyQuotaExhausted(self.model.clone()))
    }

    /// Fail fast while the server-reported daily limit is in force.
    async fn check_exhausted(&self) -> Result<(), ProviderError> {
        let mut exhausted_at = self.exhausted_at.lock().await;
        let Some(since) = *exhausted_at else {
            return Ok(());
        };
        if self.clock.now() - since < TimeDelta::hours(24) {
            return Err(self.daily_exhausted());
        }

        info!(model = %self.model, "Daily quota period over, resuming calls");
        *exhausted_at = None;
        if let Some(limiter) = &self.limiter {
            limiter.lock().await.reset();
        }
        Ok(())
    }

    async fn complete(&self, request: PromptRequest) -> Result<Completion, ProviderError> {
        self.check_exhausted().await?;

        let this = self;
        let pending = &request;
        let result = self
            .retry
            .run(&self.model, move |_| async move {
                this.admit(pending).await?;
                this.backend.complete(&this.model, pending).await
            })
            .await;

        let completion = match result {
            Ok(completion) => completion,
            Err(err)
                if matches!(
                    err.kind,
                    ProviderErrorKind::RateLimited {
                        scope: LimitScope::Day,
                        ..
                    }
                ) =>
            {
                warn!(model = %self.model, error = %err.kind, "Server reports daily limit reached");
                *self.exhausted_at.lock().await = Some(self.clock.now());
                return Err(self.daily_exhausted());
            }
            Err(err) => return Err(err),
        };

        if let Some(limiter) = &self.limiter {
            let tokens = request.budget().reconcile(completion.usage().as_ref());
            limiter.lock().await.record_tokens(tokens, self.clock.now());
        }
        Ok(completion)
    }
}

#[async_trait]
impl<B: CompletionBackend> AnnotationProvider for HttpProvider<B> {
    #[instrument(skip(self, source, context), fields(test = %test.nodeid(), model = %self.model))]
    async fn annotate(
        &self,
        test: &TestUnit,
        source: &str,
        context: &[ContextFile],
    ) -> ScribeResult<Annotation> {
        Ok(annotate_via(test, source, context, move |request| self.complete(request)).await?)
    }

    async fn is_available(&self) -> bool {
        self.backend.is_reachable().await
    }

    fn rate_limits(&self) -> Option<RateLimits> {
        self.limiter.as_ref().map(|_| self.limits)
    }

    fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn check_ready(&self) -> ScribeResult<()> {
        Ok(self.backend.check_ready().await?)
    }
}

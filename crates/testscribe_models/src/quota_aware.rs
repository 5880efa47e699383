//! Quota-aware provider rotating across a pool of models.

use crate::provider::annotate_via;
use async_trait::async_trait;
use testscribe_core::{Annotation, ContextFile, SharedClock, TestUnit};
use testscribe_error::{LimitScope, ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::{AnnotationProvider, Completion, CompletionBackend, PromptRequest};
use testscribe_rate_limit::{
    ModelLimits, ModelPool, ModelPreference, RateLimits, RetryController, Selection,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Provider that spreads calls over every candidate model of a backend.
///
/// Each call:
/// 1. refreshes the candidate list when it is stale (every six hours)
/// 2. asks the [`ModelPool`] for the model that can be called soonest and
///    sleeps for its wait
/// 3. commits the request to that model's windows and calls it through the
///    [`RetryController`]
/// 4. on a per-day rate limit marks the model exhausted, on a persistent
///    per-minute rate limit puts it in cooldown, and selects again
///
/// Selection gives up after two cycles per candidate. When every candidate
/// has spent its daily cap the call fails with
/// [`ProviderErrorKind::DailyQuotaExhausted`].
#[derive(Debug)]
pub struct QuotaAwareProvider<B: CompletionBackend> {
    backend: B,
    model_string: String,
    primary_limits: RateLimits,
    pool: Mutex<ModelPool>,
    retry: RetryController,
    clock: SharedClock,
}

impl<B: CompletionBackend> QuotaAwareProvider<B> {
    /// Provider over the models named by `model_string`: one model, a comma
    /// separated preference list, or `all` for every discovered model.
    pub fn new(
        backend: B,
        model_string: impl Into<String>,
        limits: ModelLimits,
        retry: RetryController,
        clock: SharedClock,
    ) -> Self {
        let model_string = model_string.into();
        let preference = ModelPreference::parse(&model_string, backend.default_model());
        let primary = preference
            .preferred()
            .first()
            .map(String::as_str)
            .unwrap_or(backend.default_model());
        let primary_limits = limits.for_model(primary);
        let pool = ModelPool::new(preference, limits);

        info!(
            backend = backend.name(),
            model_string = %model_string,
            candidates = pool.len(),
            "Created quota-aware provider"
        );
        Self {
            backend,
            model_string,
            primary_limits,
            pool: Mutex::new(pool),
            retry,
            clock,
        }
    }

    /// Replace the pool, e.g. to change its refresh interval.
    pub fn with_pool(mut self, pool: ModelPool) -> Self {
        self.pool = Mutex::new(pool);
        self
    }

    /// Snapshot of the pool state.
    pub async fn pool(&self) -> ModelPool {
        self.pool.lock().await.clone()
    }

    /// Refresh the candidate list when due. A failed listing keeps the
    /// current candidates and waits a full interval before trying again.
    async fn refresh_if_due(&self) {
        let now = self.clock.now();
        if !self.pool.lock().await.needs_refresh(now) {
            return;
        }

        match self.backend.list_models().await {
            Ok(discovered) => {
                let mut pool = self.pool.lock().await;
                pool.refresh(&discovered, now);
                if pool.is_empty() {
                    warn!("Model listing yielded no candidates, using the default model");
                    pool.refresh(&[self.backend.default_model().to_string()], now);
                }
            }
            Err(err) => {
                warn!(error = %err.kind, "Model discovery failed, keeping current candidates");
                let mut pool = self.pool.lock().await;
                pool.mark_refresh_attempted(now);
                if pool.is_empty() {
                    pool.refresh(&[self.backend.default_model().to_string()], now);
                }
            }
        }
    }

    async fn call_model(
        &self,
        model: &str,
        request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        let this = self;
        self.retry
            .run(model, move |attempt| async move {
                this.pool.lock().await.commit(model, this.clock.now());
                debug!(model, attempt, "Calling model");
                this.backend.complete(model, request).await
            })
            .await
    }

    #[instrument(skip(self, request), fields(estimated_tokens = request.budget().estimated_tokens()))]
    async fn complete(&self, request: PromptRequest) -> Result<Completion, ProviderError> {
        self.refresh_if_due().await;

        let estimate = *request.budget().estimated_tokens();
        let max_cycles = 2 * self.pool.lock().await.len().max(1) as u32;
        let mut last_error = String::from("no model was tried");

        for cycle in 1..=max_cycles {
            let selection = self.pool.lock().await.select(estimate, self.clock.now());
            let (model, wait) = match selection {
                Selection::Ready { model, wait } => (model, wait),
                Selection::Exhausted => {
                    warn!(cycle, "Every candidate model is out of daily quota");
                    return Err(ProviderError::new(ProviderErrorKind::DailyQuotaExhausted(
                        format!("all models exhausted for {}", self.backend.name()),
                    )));
                }
            };

            if !wait.is_zero() {
                debug!(%model, wait_ms = wait.as_millis() as u64, "Waiting for model quota");
                self.clock.sleep(wait).await;
            }

            match self.call_model(&model, &request).await {
                Ok(completion) => {
                    let tokens = request.budget().reconcile(completion.usage().as_ref());
                    self.pool
                        .lock()
                        .await
                        .reconcile_tokens(&model, tokens, self.clock.now());
                    return Ok(completion);
                }
                Err(err) => match &err.kind {
                    ProviderErrorKind::RateLimited {
                        scope: LimitScope::Day,
                        ..
                    } => {
                        last_error = err.kind.to_string();
                        self.pool
                            .lock()
                            .await
                            .mark_exhausted(&model, self.clock.now());
                    }
                    ProviderErrorKind::RateLimitExceeded { retry_after, .. } => {
                        last_error = err.kind.to_string();
                        self.pool
                            .lock()
                            .await
                            .set_cooldown(&model, *retry_after, self.clock.now());
                    }
                    _ => return Err(err),
                },
            }
        }

        if self.pool.lock().await.all_exhausted() {
            warn!("Last candidate model ran out of daily quota");
            return Err(ProviderError::new(ProviderErrorKind::DailyQuotaExhausted(
                format!("all models exhausted for {}", self.backend.name()),
            )));
        }

        Err(ProviderError::new(ProviderErrorKind::PoolExhausted {
            cycles: max_cycles,
            last_error,
        }))
    }
}

#[async_trait]
impl<B: CompletionBackend> AnnotationProvider for QuotaAwareProvider<B> {
    #[instrument(skip(self, source, context), fields(test = %test.nodeid()))]
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
        Some(self.primary_limits)
    }

    fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    fn model_name(&self) -> &str {
        &self.model_string
    }

    async fn check_ready(&self) -> ScribeResult<()> {
        Ok(self.backend.check_ready().await?)
    }

    async fn candidate_models(&self) -> ScribeResult<Vec<String>> {
        self.refresh_if_due().await;
        Ok(self.pool.lock().await.model_names())
    }
}

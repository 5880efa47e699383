//! Provider construction from configuration.

use crate::{NoopProvider, UnavailableProvider};
use std::time::Duration;
use testscribe_core::{ProviderKind, SharedClock};
use testscribe_error::{ProviderErrorKind, ScribeResult};
use testscribe_interface::AnnotationProvider;
use testscribe_rate_limit::{RetryController, RetryPolicy, ScribeConfig};
use tracing::{info, instrument, warn};

#[cfg(feature = "gemini")]
use crate::{GeminiBackend, QuotaAwareProvider};
#[cfg(feature = "gemini")]
use testscribe_rate_limit::{ModelLimits, Tier, tiers::GeminiTier};

#[cfg(feature = "ollama")]
use crate::{LocalHttpProvider, OllamaBackend};

#[cfg(feature = "litellm")]
use crate::{MultiBackendProvider, OpenAiCompatBackend};

/// Stand-in for a provider whose feature was compiled out.
#[allow(dead_code)]
fn compiled_out(name: &'static str, model: &str) -> Box<dyn AnnotationProvider> {
    warn!(provider = name, "Provider support not compiled in");
    Box::new(UnavailableProvider::new(
        name,
        model,
        ProviderErrorKind::DependencyMissing(format!(
            "testscribe was built without the '{}' feature",
            name
        )),
    ))
}

/// Gemini limits: the configured tier table, else the built-in tier of the
/// same name (free when unknown), scaled by the budget.
#[cfg(feature = "gemini")]
fn gemini_limits(config: &ScribeConfig) -> ModelLimits {
    let tier_name = config.llm.tier().as_deref();
    if config.get_tier("gemini", tier_name).is_some() {
        return config.model_limits("gemini");
    }

    let tier = tier_name
        .and_then(GeminiTier::from_name)
        .unwrap_or(GeminiTier::Free);
    let limits = match &config.budget {
        Some(budget) => tier.limits().with_budget(budget),
        None => tier.limits(),
    };
    ModelLimits::uniform(limits)
}

/// Build the provider named by `config.llm.provider`.
///
/// | provider  | result                                            |
/// |-----------|---------------------------------------------------|
/// | `none`    | [`NoopProvider`]                                  |
/// | `ollama`  | `LocalHttpProvider` with the configured host      |
/// | `litellm` | `MultiBackendProvider` with the configured URL    |
/// | `gemini`  | `QuotaAwareProvider` over the Gemini REST API     |
///
/// A provider whose feature is compiled out becomes an
/// [`UnavailableProvider`] that fails readiness with
/// [`ProviderErrorKind::DependencyMissing`].
///
/// # Errors
///
/// Returns a configuration error for an unknown provider, or an HTTP error
/// when the client cannot be built.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use testscribe_core::{SharedClock, SystemClock};
/// use testscribe_models::provider_from_config;
/// use testscribe_rate_limit::ScribeConfig;
///
/// let config = ScribeConfig::default();
/// let provider = provider_from_config(&config, Arc::new(SystemClock) as SharedClock).unwrap();
/// assert_eq!(provider.provider_name(), "none");
/// ```
#[instrument(skip(config, clock), fields(provider = %config.llm.provider()))]
pub fn provider_from_config(
    config: &ScribeConfig,
    clock: SharedClock,
) -> ScribeResult<Box<dyn AnnotationProvider>> {
    let settings = &config.llm;
    let kind = settings.provider_kind()?;
    #[allow(unused_variables)]
    let timeout = Duration::from_secs(*settings.timeout_seconds());
    #[allow(unused_variables)]
    let retry = RetryController::new(
        RetryPolicy::with_attempts(*settings.max_retries()),
        clock.clone(),
    );
    let model = settings.model().as_str();

    let provider: Box<dyn AnnotationProvider> = match kind {
        ProviderKind::Disabled => Box::new(NoopProvider),

        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => {
            let backend = OllamaBackend::new(settings.ollama_host().as_str(), timeout)?;
            let limits = config.model_limits("ollama").for_model(model);
            Box::new(LocalHttpProvider::new(backend, model, limits, retry, clock))
        }
        #[cfg(not(feature = "ollama"))]
        ProviderKind::Ollama => compiled_out("ollama", model),

        #[cfg(feature = "litellm")]
        ProviderKind::Litellm => {
            let backend =
                OpenAiCompatBackend::new(settings.litellm_base_url().as_str(), timeout)?;
            let limits = config.model_limits("litellm").for_model(model);
            Box::new(MultiBackendProvider::new(backend, model, limits, retry, clock))
        }
        #[cfg(not(feature = "litellm"))]
        ProviderKind::Litellm => compiled_out("litellm", model),

        #[cfg(feature = "gemini")]
        ProviderKind::Gemini => {
            let backend = GeminiBackend::from_env(timeout)?;
            let limits = gemini_limits(config);
            Box::new(QuotaAwareProvider::new(backend, model, limits, retry, clock))
        }
        #[cfg(not(feature = "gemini"))]
        ProviderKind::Gemini => compiled_out("gemini", model),
    };

    info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "Provider ready"
    );
    Ok(provider)
}

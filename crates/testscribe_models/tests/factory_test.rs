//! Provider construction from configuration.

use std::sync::Arc;
use testscribe_core::{LlmSettings, SharedClock, SystemClock};
use testscribe_models::provider_from_config;
use testscribe_rate_limit::{RateLimits, ScribeConfig};

fn clock() -> SharedClock {
    Arc::new(SystemClock)
}

fn config_with(settings: LlmSettings) -> ScribeConfig {
    ScribeConfig {
        llm: settings,
        ..ScribeConfig::default()
    }
}

#[test]
fn test_disabled_builds_noop() {
    let provider = provider_from_config(&ScribeConfig::default(), clock()).unwrap();
    assert_eq!(provider.provider_name(), "none");
    assert!(provider.rate_limits().is_none());
}

#[test]
fn test_unknown_provider_is_config_error() {
    let config = config_with(LlmSettings::default().with_provider("bard".to_string()));
    let err = provider_from_config(&config, clock()).err().unwrap();
    assert!(err.user_message().contains("unknown provider 'bard'"));
}

#[cfg(feature = "ollama")]
#[test]
fn test_ollama_has_no_published_limits() {
    let config = config_with(LlmSettings::default().with_provider("ollama".to_string()));
    let provider = provider_from_config(&config, clock()).unwrap();
    assert_eq!(provider.provider_name(), "ollama");
    assert_eq!(provider.model_name(), "llama3.2");
    assert!(provider.rate_limits().is_none());
}

#[cfg(feature = "litellm")]
#[test]
fn test_litellm_keeps_configured_model() {
    let config = config_with(
        LlmSettings::default()
            .with_provider("litellm".to_string())
            .with_model("claude-3-haiku".to_string()),
    );
    let provider = provider_from_config(&config, clock()).unwrap();
    assert_eq!(provider.provider_name(), "litellm");
    assert_eq!(provider.model_name(), "claude-3-haiku");
}

#[cfg(feature = "gemini")]
#[test]
fn test_gemini_without_tier_table_uses_builtin_free_tier() {
    let config = config_with(LlmSettings::default().with_provider("gemini".to_string()));
    let provider = provider_from_config(&config, clock()).unwrap();
    assert_eq!(provider.provider_name(), "gemini");
    assert_eq!(
        provider.rate_limits(),
        Some(RateLimits::new(Some(10), Some(250_000), Some(250)))
    );
}

#[cfg(feature = "gemini")]
#[test]
fn test_gemini_uses_configured_model_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("testscribe.toml");
    std::fs::write(
        &path,
        "[llm]\nprovider = \"gemini\"\nmodel = \"gemini-2.5-pro\"\n",
    )
    .unwrap();

    let config = ScribeConfig::from_file(&path).unwrap();
    let provider = provider_from_config(&config, clock()).unwrap();
    assert_eq!(
        provider.rate_limits(),
        Some(RateLimits::new(Some(5), Some(250_000), Some(100)))
    );
}

#[cfg(not(feature = "gemini"))]
#[tokio::test]
async fn test_compiled_out_provider_fails_readiness() {
    let config = config_with(LlmSettings::default().with_provider("gemini".to_string()));
    let provider = provider_from_config(&config, clock()).unwrap();
    let err = provider.check_ready().await.unwrap_err();
    assert!(err.user_message().starts_with("Provider support missing"));
}

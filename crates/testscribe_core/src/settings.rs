//! Annotation settings.

use crate::ContextMode;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use testscribe_error::{ConfigError, ScribeResult};

/// Path patterns never sent to a provider as context.
pub const DEFAULT_EXCLUDE_GLOBS: &[&str] = &[
    "*.pyc",
    "__pycache__/*",
    ".git/*",
    ".env",
    ".env.*",
    "*.key",
    "*.pem",
    "*secret*",
    "*password*",
    "*credential*",
];

/// Supported provider backends, keyed by configuration string.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    /// Annotation disabled
    #[strum(serialize = "none")]
    Disabled,
    /// Local Ollama server
    Ollama,
    /// LiteLLM proxy or any OpenAI-compatible endpoint
    Litellm,
    /// Google Gemini with quota-aware model rotation
    Gemini,
}

/// Settings for one annotation run.
///
/// Loaded from the `[llm]` table of the configuration file; every field has a
/// default so partial tables work.
///
/// # Examples
///
/// ```
/// use testscribe_core::{LlmSettings, ProviderKind};
///
/// let settings = LlmSettings::default()
///     .with_provider("gemini".to_string())
///     .with_max_retries(5);
///
/// assert!(settings.validate().is_ok());
/// assert_eq!(settings.provider_kind().unwrap(), ProviderKind::Gemini);
///
/// let invalid = LlmSettings::default().with_max_retries(11);
/// assert!(invalid.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct LlmSettings {
    /// Provider configuration string
    provider: String,
    /// Model name, comma separated preference list, or `all`
    model: String,
    /// Rate tier name; the provider's default tier when unset
    tier: Option<String>,
    /// Orchestrator pacing floor; 0 disables pacing
    requests_per_minute: u32,
    /// Attempts per call, 1 to 10
    max_retries: u32,
    /// Per-call timeout in seconds
    timeout_seconds: u64,
    /// Whether the annotation cache is consulted
    cache_enabled: bool,
    /// Cache directory
    cache_dir: PathBuf,
    /// Cache entry lifetime in seconds
    cache_ttl_seconds: u64,
    /// Maximum tests annotated per run; 0 means unlimited
    max_tests: usize,
    /// Default context mode
    context_mode: ContextMode,
    /// Total context size budget in bytes
    context_bytes: usize,
    /// Maximum context files per test
    context_file_limit: usize,
    /// Paths excluded from context
    context_exclude_globs: Vec<String>,
    /// Remove docstrings from context files
    strip_docstrings: bool,
    /// Remove `#` comments from context files
    strip_comments: bool,
    /// Ollama base URL
    ollama_host: String,
    /// Base URL of the OpenAI-compatible endpoint
    litellm_base_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: String::new(),
            tier: None,
            requests_per_minute: 0,
            max_retries: 3,
            timeout_seconds: 30,
            cache_enabled: true,
            cache_dir: PathBuf::from(".testscribe_cache"),
            cache_ttl_seconds: 86_400,
            max_tests: 100,
            context_mode: ContextMode::Minimal,
            context_bytes: 32_000,
            context_file_limit: 10,
            context_exclude_globs: DEFAULT_EXCLUDE_GLOBS
                .iter()
                .map(|glob| glob.to_string())
                .collect(),
            strip_docstrings: true,
            strip_comments: false,
            ollama_host: "http://127.0.0.1:11434".to_string(),
            litellm_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl LlmSettings {
    /// Parsed provider selection.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider string.
    pub fn provider_kind(&self) -> ScribeResult<ProviderKind> {
        ProviderKind::from_str(self.provider.trim()).map_err(|_| {
            ConfigError::new(format!(
                "unknown provider '{}', expected one of: none, ollama, litellm, gemini",
                self.provider
            ))
            .into()
        })
    }

    /// True when annotation is switched off.
    pub fn is_disabled(&self) -> bool {
        matches!(self.provider_kind(), Ok(ProviderKind::Disabled))
    }

    /// Minimum spacing between provider calls, if pacing is enabled.
    pub fn pacing_interval(&self) -> Option<std::time::Duration> {
        (self.requests_per_minute > 0)
            .then(|| std::time::Duration::from_secs_f64(60.0 / self.requests_per_minute as f64))
    }

    /// Rejects unknown providers and out-of-range numbers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> ScribeResult<()> {
        self.provider_kind()?;

        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::new(format!(
                "max_retries must be between 1 and 10, got {}",
                self.max_retries
            ))
            .into());
        }
        if self.timeout_seconds < 1 {
            return Err(ConfigError::new("timeout_seconds must be at least 1").into());
        }
        if self.context_bytes < 1000 {
            return Err(ConfigError::new(format!(
                "context_bytes must be at least 1000, got {}",
                self.context_bytes
            ))
            .into());
        }
        if self.context_file_limit < 1 {
            return Err(ConfigError::new("context_file_limit must be at least 1").into());
        }
        Ok(())
    }
}

//! LLM provider integrations for testscribe.
//!
//! Each wire backend sits behind its own feature flag and implements
//! [`testscribe_interface::CompletionBackend`]. Providers wrap a backend with
//! prompt construction, retries, quota control and response parsing, and
//! implement [`testscribe_interface::AnnotationProvider`].
//!
//! # Available Providers
//!
//! - **none** - [`NoopProvider`], annotation disabled
//! - **ollama** - `LocalHttpProvider`, enable with the `ollama` feature
//! - **litellm** - `MultiBackendProvider` for OpenAI-compatible proxies,
//!   enable with the `litellm` feature
//! - **gemini** - `QuotaAwareProvider` rotating across Gemini models, enable
//!   with the `gemini` feature
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use testscribe_core::{SharedClock, SystemClock, TestUnitBuilder};
//! use testscribe_models::provider_from_config;
//! use testscribe_rate_limit::ScribeConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScribeConfig::load()?;
//! let provider = provider_from_config(&config, Arc::new(SystemClock) as SharedClock)?;
//! provider.check_ready().await?;
//!
//! let test = TestUnitBuilder::default()
//!     .nodeid("tests/test_math.py::test_add")
//!     .build()?;
//! let annotation = provider
//!     .annotate(&test, "def test_add():\n    assert 1 + 2 == 3\n", &[])
//!     .await?;
//! println!("{}", annotation.scenario());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod factory;
mod http;
mod noop;
mod parse;
mod prompt;
mod provider;
mod quota_aware;

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "litellm")]
mod openai_compat;

pub use factory::provider_from_config;
pub use http::{build_client, classify_status, transport_error};
pub use noop::{NoopProvider, UnavailableProvider};
pub use parse::{extract_json, parse_annotation};
pub use prompt::{
    MAX_CONTEXT_CHARS_PER_FILE, MAX_CONTEXT_FILES_IN_PROMPT, SYSTEM_PROMPT, build_prompt,
};
pub use provider::HttpProvider;
pub use quota_aware::QuotaAwareProvider;

#[cfg(feature = "ollama")]
pub use provider::LocalHttpProvider;

#[cfg(feature = "litellm")]
pub use provider::MultiBackendProvider;

#[cfg(feature = "gemini")]
pub use gemini::{GEMINI_API_BASE, GEMINI_DEFAULT_MODEL, GEMINI_KEY_VARS, GeminiBackend};

#[cfg(feature = "ollama")]
pub use ollama::{OLLAMA_DEFAULT_MODEL, OllamaBackend};

#[cfg(feature = "litellm")]
pub use openai_compat::{OPENAI_COMPAT_DEFAULT_MODEL, OPENAI_COMPAT_KEY_VARS, OpenAiCompatBackend};

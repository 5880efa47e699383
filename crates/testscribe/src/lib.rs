//! testscribe - LLM annotations for pytest reports
//!
//! testscribe explains what each test verifies by asking a language model,
//! without blowing through provider quotas or paying twice for the same
//! answer.
//!
//! # Features
//!
//! - **Quota control**: sliding request, token and daily windows per model
//! - **Model rotation**: Gemini preference lists and `all`, with daily
//!   exhaustion and 24h recovery
//! - **Retries**: exponential and server-directed backoff for transient
//!   failures
//! - **Caching**: annotations keyed by test identity and exact source hash
//! - **Orchestration**: opt-out, test caps, pacing and per-test error
//!   containment
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use testscribe::{Annotator, ScribeConfig, SharedClock, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScribeConfig::load()?;
//!     let mut annotator = Annotator::from_config(&config, ".", Arc::new(SystemClock) as SharedClock)?;
//!     let run = annotator.run(collected_tests()).await;
//!     println!("{}", run.summary().headline());
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `gemini` - Google Gemini with model rotation
//! - `ollama` - local Ollama server
//! - `litellm` - OpenAI-compatible endpoints
//! - `all-providers` - all of the above (default)
//!
//! # Architecture
//!
//! - `testscribe_error` - Error types
//! - `testscribe_core` - Test units, annotations, settings, clock
//! - `testscribe_interface` - Provider and backend traits
//! - `testscribe_rate_limit` - Quotas, model pool, retries, configuration
//! - `testscribe_cache` - Annotation cache
//! - `testscribe_models` - Provider implementations
//!
//! This crate (`testscribe`) adds the orchestrator and context assembler and
//! re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod annotator;
mod context;

pub use annotator::{
    AnnotatedTest, AnnotationRun, Annotator, DAILY_QUOTA_SKIP, ProgressFn, RunPhase,
};
pub use context::{SourceContextAssembler, extract_function};

// Re-export workspace crates
pub use testscribe_cache::*;
pub use testscribe_core::*;
pub use testscribe_error::*;
pub use testscribe_interface::*;
pub use testscribe_models::*;
pub use testscribe_rate_limit::*;

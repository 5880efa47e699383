//! Trait definitions for testscribe.
//!
//! [`AnnotationProvider`] is the capability set the orchestrator drives.
//! [`CompletionBackend`] is the wire seam beneath a provider: one HTTP API
//! that turns a prompt into text. [`ContextAssembler`] supplies the test
//! source and supporting snippets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{AnnotationProvider, CompletionBackend, ContextAssembler};
pub use types::{AssembledContext, Completion, PromptRequest};

//! Error types for testscribe.
//!
//! Every error family follows the same shape:
//! - an `*ErrorKind` enum naming the specific condition
//! - an `*Error` struct wrapping the kind together with the source location
//!   captured through `#[track_caller]`
//!
//! [`ScribeError`] unifies the families and is what public operations return.
//! Provider failures additionally carry a [`RetryClass`] so the retry controller
//! can tell transient failures from fatal ones without string matching.
//!
//! # Examples
//!
//! ```
//! use testscribe_error::{ProviderError, ProviderErrorKind, ScribeResult};
//!
//! fn call() -> ScribeResult<String> {
//!     Err(ProviderError::new(ProviderErrorKind::Network("connection refused".into())))?
//! }
//!
//! let err = call().unwrap_err();
//! assert_eq!(err.user_message(), "Network error: connection refused");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod cache;
mod config;
mod context;
mod error;
mod http;
mod json;
mod provider;

pub use builder::{BuilderError, BuilderErrorKind};
pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use context::{ContextError, ContextErrorKind};
pub use error::{ScribeError, ScribeErrorKind, ScribeResult};
pub use http::HttpError;
pub use json::JsonError;
pub use provider::{LimitScope, ProviderError, ProviderErrorKind, RetryClass, RetryableError};

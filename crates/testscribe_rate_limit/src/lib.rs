//! Quota tracking, model rotation and retry policy.
//!
//! The pieces compose bottom-up:
//! - [`QuotaWindow`] tracks one renewable resource over a sliding window
//! - [`RateLimiter`] combines the per-minute request, per-minute token and
//!   per-day request windows of one model and answers with an [`Admission`]
//! - [`ModelPool`] owns one limiter per candidate model, rotates away from
//!   exhausted or cooling-down models and restores them after a day
//! - [`RetryController`] wraps a single provider call with bounded,
//!   classified retries
//! - [`Pacer`] enforces a fixed minimum spacing for providers without quota
//!   metadata
//!
//! Tier tables and the layered TOML configuration live in [`ScribeConfig`].
//! All waiting goes through an injected [`testscribe_core::Clock`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod detector;
mod limiter;
mod pacer;
mod pool;
mod quota;
mod retry;
mod tier;
pub mod tiers;

pub use config::{ModelTierConfig, ProviderConfig, ScribeConfig, TierConfig};
pub use detector::{limit_scope_from_body, retry_after_from_headers, retry_delay_from_body};
pub use limiter::{Admission, ModelLimits, RateLimiter, RateLimits};
pub use pacer::Pacer;
pub use pool::{ModelPool, ModelPreference, ModelState, Selection};
pub use quota::{Capacity, QuotaWindow};
pub use retry::{RetryController, RetryPolicy};
pub use tier::Tier;

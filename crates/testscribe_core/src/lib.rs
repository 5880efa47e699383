//! Core data types for testscribe.
//!
//! This crate provides the types shared by every other testscribe crate:
//! the test units handed over by the collector, the annotations produced for
//! them, the run summary, request budgets, annotation settings and the
//! injectable [`Clock`] all time-dependent components read from.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod annotation;
mod budget;
mod clock;
mod settings;
mod summary;
mod telemetry;
mod test_unit;
mod token_counting;

pub use annotation::{Annotation, DEFAULT_CONFIDENCE};
pub use budget::{BudgetConfig, BudgetConfigBuilder};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, until};
pub use settings::{DEFAULT_EXCLUDE_GLOBS, LlmSettings, ProviderKind};
pub use summary::RunSummary;
pub use telemetry::{TracingConfig, init_tracing};
pub use test_unit::{
    ContextFile, ContextMode, CoveredFile, TestUnit, TestUnitBuilder, TestUnitBuilderError,
};
pub use token_counting::{RequestBudget, TokenUsage, estimate_tokens};

//! Test utilities for provider tests.
//!
//! This module provides a scripted completion backend and test helpers.

pub mod mock_backend;

#[allow(unused_imports)]
pub use mock_backend::{MockBackend, MockBehavior, MockCall, MockResponse};

use std::sync::Arc;
use testscribe_core::{ManualClock, SharedClock, TestUnit, TestUnitBuilder};
use testscribe_rate_limit::{RetryController, RetryPolicy};

/// Well-formed annotation JSON.
#[allow(dead_code)]
pub const VALID_JSON: &str = r#"{"scenario": "Adds two numbers", "why_needed": "Prevents arithmetic regressions", "key_assertions": ["add(1, 2) == 3"]}"#;

/// Test unit with the given node id.
#[allow(dead_code)]
pub fn unit(nodeid: &str) -> TestUnit {
    TestUnitBuilder::default()
        .nodeid(nodeid)
        .build()
        .expect("Failed to build test unit")
}

/// Manual clock plus the shared handle providers take.
#[allow(dead_code)]
pub fn manual_clock() -> (ManualClock, SharedClock) {
    let clock = ManualClock::default();
    let shared: SharedClock = Arc::new(clock.clone());
    (clock, shared)
}

/// Retry controller with default delays sleeping on `clock`.
#[allow(dead_code)]
pub fn retry(clock: &SharedClock) -> RetryController {
    RetryController::new(RetryPolicy::default(), clock.clone())
}

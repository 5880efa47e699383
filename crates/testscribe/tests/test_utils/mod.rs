//! Test utilities for orchestrator tests.
//!
//! This module provides a scripted annotation provider and test helpers.

pub mod daily_limit_backend;
pub mod mock_provider;

#[allow(unused_imports)]
pub use daily_limit_backend::DailyLimitBackend;
#[allow(unused_imports)]
pub use mock_provider::MockProvider;

use std::path::Path;
use std::sync::Arc;
use testscribe::{
    AnnotationCache, AnnotationCacheConfig, Annotator, LlmSettings, ManualClock, SharedClock,
    SourceContextAssembler, TestUnit, TestUnitBuilder,
};

/// Manual clock plus the shared handle components take.
#[allow(dead_code)]
pub fn manual_clock() -> (ManualClock, SharedClock) {
    let clock = ManualClock::default();
    let shared: SharedClock = Arc::new(clock.clone());
    (clock, shared)
}

/// Test unit with inline source.
#[allow(dead_code)]
pub fn unit(nodeid: &str, source: &str) -> TestUnit {
    TestUnitBuilder::default()
        .nodeid(nodeid)
        .source(source)
        .build()
        .expect("Failed to build test unit")
}

/// Test unit the author marked as not to be sent to an LLM.
#[allow(dead_code)]
pub fn opted_out(nodeid: &str, source: &str) -> TestUnit {
    TestUnitBuilder::default()
        .nodeid(nodeid)
        .source(source)
        .opt_out(true)
        .build()
        .expect("Failed to build test unit")
}

/// Cache rooted in `dir`.
#[allow(dead_code)]
pub fn cache(dir: &Path, clock: &SharedClock) -> AnnotationCache {
    AnnotationCache::new(
        AnnotationCacheConfig::default().with_dir(dir.join("cache")),
        clock.clone(),
    )
    .expect("Failed to open cache")
}

/// Annotator over `provider` with a cache in `dir` and no cap.
#[allow(dead_code)]
pub fn annotator(provider: &MockProvider, dir: &Path, clock: &SharedClock) -> Annotator {
    let assembler = SourceContextAssembler::from_settings(dir, &LlmSettings::default())
        .expect("Failed to build assembler");
    Annotator::new(
        Box::new(provider.clone()),
        cache(dir, clock),
        Box::new(assembler),
    )
}

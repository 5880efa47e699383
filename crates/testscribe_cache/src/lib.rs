//! Annotation cache keyed by test identity and exact source hash.
//!
//! Any edit to a test changes its source hash, so a stale annotation can
//! never be served for modified code. Storage failures degrade to misses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;

pub use cache::{
    AnnotationCache, AnnotationCacheConfig, AnnotationCacheConfigBuilder, CacheEntry, hash_source,
};

//! Annotation cache behaviour on a real directory.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testscribe_cache::{AnnotationCache, AnnotationCacheConfig, AnnotationCacheConfigBuilder, hash_source};
use testscribe_core::{Annotation, ManualClock, SharedClock};

const TEST_ID: &str = "tests/test_math.py::test_add";
const SOURCE: &str = "def test_add():\n    assert add(1, 2) == 3\n";

fn annotation() -> Annotation {
    Annotation::new(
        "Adds two integers",
        "Protects the arithmetic helper",
        vec!["add(1, 2) == 3".to_string()],
    )
}

fn open(dir: &TempDir, ttl_seconds: u64, clock: &ManualClock) -> AnnotationCache {
    let config = AnnotationCacheConfigBuilder::default()
        .dir(dir.path().join("cache"))
        .ttl_seconds(ttl_seconds)
        .build()
        .unwrap();
    AnnotationCache::new(config, Arc::new(clock.clone()) as SharedClock).unwrap()
}

#[tokio::test]
async fn test_roundtrip_hit() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let cache = open(&dir, 86_400, &clock);
    let hash = hash_source(SOURCE);

    assert!(cache.get(TEST_ID, &hash).await.is_none());
    cache.set(TEST_ID, &hash, &annotation()).await.unwrap();

    assert_eq!(cache.get(TEST_ID, &hash).await, Some(annotation()));
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_single_character_edit_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let cache = open(&dir, 86_400, &clock);

    cache
        .set(TEST_ID, &hash_source(SOURCE), &annotation())
        .await
        .unwrap();

    let edited = SOURCE.replace("== 3", "== 4");
    assert!(cache.get(TEST_ID, &hash_source(&edited)).await.is_none());
    assert!(
        cache
            .get("tests/test_math.py::test_sub", &hash_source(SOURCE))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let cache = open(&dir, 3_600, &clock);
    let hash = hash_source(SOURCE);

    cache.set(TEST_ID, &hash, &annotation()).await.unwrap();
    clock.advance(Duration::from_secs(3_599));
    assert!(cache.get(TEST_ID, &hash).await.is_some());

    clock.advance(Duration::from_secs(1));
    assert!(cache.get(TEST_ID, &hash).await.is_none());
    // Expired entries are removed lazily on lookup.
    assert_eq!(cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_corrupt_entry_degrades_to_miss() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let cache = open(&dir, 86_400, &clock);
    let hash = hash_source(SOURCE);

    cache.set(TEST_ID, &hash, &annotation()).await.unwrap();

    let shard = std::fs::read_dir(dir.path().join("cache"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let entry = std::fs::read_dir(&shard).unwrap().next().unwrap().unwrap().path();
    std::fs::write(&entry, b"{not json").unwrap();

    assert!(cache.get(TEST_ID, &hash).await.is_none());
    assert!(!entry.exists());

    // A fresh write works again afterwards.
    cache.set(TEST_ID, &hash, &annotation()).await.unwrap();
    assert!(cache.get(TEST_ID, &hash).await.is_some());
}

#[tokio::test]
async fn test_prune_and_clear() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let cache = open(&dir, 60, &clock);

    cache
        .set("a", &hash_source("old"), &annotation())
        .await
        .unwrap();
    clock.advance(Duration::from_secs(120));
    cache
        .set("b", &hash_source("new"), &annotation())
        .await
        .unwrap();

    assert_eq!(cache.prune_expired().await.unwrap(), 1);
    assert_eq!(cache.len().await.unwrap(), 1);
    assert!(cache.get("b", &hash_source("new")).await.is_some());

    assert_eq!(cache.clear().await.unwrap(), 1);
    assert!(cache.is_empty().await.unwrap());
    assert!(dir.path().join("cache").is_dir());
}

#[tokio::test]
async fn test_disabled_cache_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let config = AnnotationCacheConfig::default()
        .with_dir(dir.path().join("off"))
        .with_enabled(false);
    let cache = AnnotationCache::new(config, Arc::new(clock) as SharedClock).unwrap();
    let hash = hash_source(SOURCE);

    cache.set(TEST_ID, &hash, &annotation()).await.unwrap();
    assert!(cache.get(TEST_ID, &hash).await.is_none());
    assert!(!dir.path().join("off").exists());
}

//! Filesystem annotation cache.

use chrono::{DateTime, TimeDelta, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use testscribe_core::{Annotation, LlmSettings, SharedClock};
use testscribe_error::{CacheError, CacheErrorKind, ScribeResult};
use tracing::{debug, info, instrument, warn};

/// SHA-256 hex digest of a test's exact source text.
///
/// # Examples
///
/// ```
/// use testscribe_cache::hash_source;
///
/// let a = hash_source("def test_add():\n    assert add(1, 2) == 3\n");
/// let b = hash_source("def test_add():\n    assert add(1, 2) == 4\n");
/// assert_eq!(a.len(), 64);
/// assert_ne!(a, b);
/// ```
pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Configuration for the annotation cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct AnnotationCacheConfig {
    /// Root directory of the cache
    #[serde(default = "default_dir")]
    #[builder(default = "default_dir()")]
    dir: PathBuf,

    /// Entry lifetime in seconds; 0 keeps entries forever
    #[serde(default = "default_ttl")]
    #[builder(default = "default_ttl()")]
    ttl_seconds: u64,

    /// Whether lookups and writes happen at all
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".testscribe_cache")
}

fn default_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_enabled() -> bool {
    true
}

impl Default for AnnotationCacheConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            ttl_seconds: default_ttl(),
            enabled: default_enabled(),
        }
    }
}

impl From<&LlmSettings> for AnnotationCacheConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            dir: settings.cache_dir().clone(),
            ttl_seconds: *settings.cache_ttl_seconds(),
            enabled: *settings.cache_enabled(),
        }
    }
}

/// Persisted record of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct CacheEntry {
    /// Test identity the annotation belongs to
    test_id: String,
    /// Hash of the source that was annotated
    source_hash: String,
    /// When the entry was written
    created_at: DateTime<Utc>,
    /// The cached annotation
    annotation: Annotation,
}

impl CacheEntry {
    /// Whether the entry is at least `ttl_seconds` old; a zero TTL never expires.
    pub fn is_expired(&self, ttl_seconds: u64, now: DateTime<Utc>) -> bool {
        if ttl_seconds == 0 {
            return false;
        }
        let ttl = TimeDelta::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX));
        now - self.created_at >= ttl
    }
}

/// Content-addressed annotation store on the local filesystem.
///
/// Entries live at `{dir}/{key[0:2]}/{key}.json`, where `key` is the SHA-256
/// of the test identity and source hash. Writes go to a temporary file that
/// is renamed into place, so readers never observe half-written entries.
///
/// Read failures, corrupt JSON, identity mismatches and expired entries are
/// all misses; the offending file is removed lazily.
///
/// # Example
///
/// ```no_run
/// use testscribe_cache::{AnnotationCache, AnnotationCacheConfig, hash_source};
/// use testscribe_core::{Annotation, SharedClock, SystemClock};
/// use std::sync::Arc;
///
/// # async fn demo() -> testscribe_error::ScribeResult<()> {
/// let cache = AnnotationCache::new(
///     AnnotationCacheConfig::default(),
///     Arc::new(SystemClock) as SharedClock,
/// )?;
///
/// let source = "def test_add():\n    assert 1 + 2 == 3\n";
/// let hash = hash_source(source);
/// let annotation = Annotation::new("Adds", "Arithmetic", vec!["1 + 2 == 3".into()]);
///
/// cache.set("tests/test_math.py::test_add", &hash, &annotation).await?;
/// assert!(cache.get("tests/test_math.py::test_add", &hash).await.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationCache {
    config: AnnotationCacheConfig,
    clock: SharedClock,
}

impl AnnotationCache {
    /// Open the cache, creating its directory when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    #[instrument(skip(clock), fields(dir = %config.dir.display()))]
    pub fn new(config: AnnotationCacheConfig, clock: SharedClock) -> ScribeResult<Self> {
        if config.enabled {
            std::fs::create_dir_all(&config.dir).map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    config.dir.display(),
                    e
                )))
            })?;
            debug!(ttl_seconds = config.ttl_seconds, "Opened annotation cache");
        }
        Ok(Self { config, clock })
    }

    /// Cache configuration.
    pub fn config(&self) -> &AnnotationCacheConfig {
        &self.config
    }

    /// Whether the cache is consulted.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn entry_key(test_id: &str, source_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(test_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(source_hash.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, test_id: &str, source_hash: &str) -> PathBuf {
        let key = Self::entry_key(test_id, source_hash);
        self.config.dir.join(&key[0..2]).join(format!("{}.json", key))
    }

    async fn discard(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
        }
    }

    async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            CacheError::new(CacheErrorKind::Corrupt(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })
    }

    /// Cached annotation for `(test_id, source_hash)`, if present and fresh.
    #[instrument(skip(self, source_hash))]
    pub async fn get(&self, test_id: &str, source_hash: &str) -> Option<Annotation> {
        if !self.config.enabled {
            return None;
        }

        let path = self.entry_path(test_id, source_hash);
        let entry = match Self::read_entry(&path).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("Cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e.kind, "Unreadable cache entry, treating as miss");
                if matches!(e.kind, CacheErrorKind::Corrupt(_)) {
                    Self::discard(&path).await;
                }
                return None;
            }
        };

        if entry.test_id != test_id || entry.source_hash != source_hash {
            warn!(stored = %entry.test_id, "Cache entry identity mismatch, treating as miss");
            Self::discard(&path).await;
            return None;
        }

        if entry.is_expired(self.config.ttl_seconds, self.clock.now()) {
            debug!(created_at = %entry.created_at, "Cache entry expired");
            Self::discard(&path).await;
            return None;
        }

        debug!("Cache hit");
        Some(entry.annotation)
    }

    /// Store `annotation` for `(test_id, source_hash)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written; callers log it and
    /// carry on.
    #[instrument(skip(self, source_hash, annotation))]
    pub async fn set(
        &self,
        test_id: &str,
        source_hash: &str,
        annotation: &Annotation,
    ) -> ScribeResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let path = self.entry_path(test_id, source_hash);
        let entry = CacheEntry {
            test_id: test_id.to_string(),
            source_hash: source_hash.to_string(),
            created_at: self.clock.now(),
            annotation: annotation.clone(),
        };
        let data = serde_json::to_vec_pretty(&entry)
            .map_err(|e| CacheError::new(CacheErrorKind::Write(e.to_string())))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Write to temp file first, then rename into place
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &data).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        debug!(path = %path.display(), "Stored annotation");
        Ok(())
    }

    /// Every file below the two-level layout.
    async fn stored_files(&self) -> ScribeResult<Vec<PathBuf>> {
        let read_dir = |dir: PathBuf| async move {
            match tokio::fs::read_dir(&dir).await {
                Ok(entries) => Ok(Some(entries)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(CacheError::new(CacheErrorKind::Read(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))),
            }
        };
        let io_error = |e: std::io::Error| CacheError::new(CacheErrorKind::Read(e.to_string()));

        let mut files = Vec::new();
        let Some(mut shards) = read_dir(self.config.dir.clone()).await? else {
            return Ok(files);
        };
        while let Some(shard) = shards.next_entry().await.map_err(io_error)? {
            if !shard.file_type().await.map_err(io_error)?.is_dir() {
                continue;
            }
            let Some(mut entries) = read_dir(shard.path()).await? else {
                continue;
            };
            while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn is_entry_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "json")
    }

    /// Number of stored entries, fresh or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be listed.
    pub async fn len(&self) -> ScribeResult<usize> {
        Ok(self
            .stored_files()
            .await?
            .iter()
            .filter(|path| Self::is_entry_file(path))
            .count())
    }

    /// True when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be listed.
    pub async fn is_empty(&self) -> ScribeResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove expired and corrupt entries plus leftover temporary files.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be listed.
    #[instrument(skip(self))]
    pub async fn prune_expired(&self) -> ScribeResult<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        for path in self.stored_files().await? {
            let stale = if Self::is_entry_file(&path) {
                match Self::read_entry(&path).await {
                    Ok(Some(entry)) => entry.is_expired(self.config.ttl_seconds, now),
                    Ok(None) => false,
                    Err(e) => {
                        warn!(error = %e.kind, "Removing unreadable cache entry");
                        true
                    }
                }
            } else {
                true
            };

            if stale {
                tokio::fs::remove_file(&path).await.map_err(|e| {
                    CacheError::new(CacheErrorKind::Remove(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                })?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Pruned annotation cache");
        }
        Ok(removed)
    }

    /// Remove every entry. Returns the number of entries that were stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed or recreated.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> ScribeResult<usize> {
        let count = self.len().await?;
        let dir = &self.config.dir;

        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Remove(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        }
        if self.config.enabled {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
        }

        info!(cleared = count, "Cleared annotation cache");
        Ok(count)
    }
}

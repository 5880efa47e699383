//! Cache maintenance command handlers.

use super::commands::CacheCommands;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use testscribe::{
    AnnotationCache, AnnotationCacheConfig, ScribeConfig, ScribeResult, SharedClock, SystemClock,
};

fn open(config_path: Option<&Path>, cache_dir: Option<PathBuf>) -> ScribeResult<AnnotationCache> {
    let config = ScribeConfig::load_layered(config_path)?;
    let mut cache_config = AnnotationCacheConfig::from(&config.llm).with_enabled(true);
    if let Some(dir) = cache_dir {
        cache_config = cache_config.with_dir(dir);
    }
    AnnotationCache::new(cache_config, Arc::new(SystemClock) as SharedClock)
}

/// Handle cache maintenance commands.
pub async fn handle_cache_command(cmd: CacheCommands, config_path: Option<&Path>) -> ScribeResult<()> {
    match cmd {
        CacheCommands::Clear { cache_dir } => {
            let cache = open(config_path, cache_dir)?;
            let removed = cache.clear().await?;
            println!(
                "Removed {} cached annotation(s) from {}",
                removed,
                cache.config().dir().display()
            );
        }
        CacheCommands::Prune { cache_dir } => {
            let cache = open(config_path, cache_dir)?;
            let removed = cache.prune_expired().await?;
            let remaining = cache.len().await?;
            println!(
                "Pruned {} expired annotation(s), {} remaining in {}",
                removed,
                remaining,
                cache.config().dir().display()
            );
        }
    }
    Ok(())
}

//! Annotate command handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use testscribe::{
    Annotator, ConfigError, JsonError, ScribeConfig, ScribeResult, SharedClock, SystemClock,
    TestUnit,
};
use tracing::{info, instrument};

/// Options of the `annotate` command.
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// JSON array of test units
    pub tests: PathBuf,
    /// Output file, stdout when `None`
    pub output: Option<PathBuf>,
    /// Provider override
    pub provider: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Test cap override
    pub max_tests: Option<usize>,
    /// Project root
    pub root: PathBuf,
}

/// Apply command-line overrides on top of loaded configuration.
fn apply_overrides(mut config: ScribeConfig, options: &AnnotateOptions) -> ScribeConfig {
    let mut llm = config.llm.clone();
    if let Some(provider) = &options.provider {
        llm = llm.with_provider(provider.clone());
    }
    if let Some(model) = &options.model {
        llm = llm.with_model(model.clone());
    }
    if let Some(max_tests) = options.max_tests {
        llm = llm.with_max_tests(max_tests);
    }
    config.llm = llm;
    config
}

async fn read_tests(path: &Path) -> ScribeResult<Vec<TestUnit>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        ConfigError::new(format!("Failed to read tests file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        JsonError::new(format!("Invalid tests file {}: {}", path.display(), e)).into()
    })
}

/// Annotate the tests listed in `options.tests` and write the result.
///
/// Progress lines go to stderr so JSON written to stdout stays parseable.
#[instrument(skip_all, fields(tests = %options.tests.display()))]
pub async fn run_annotate(options: AnnotateOptions, config_path: Option<&Path>) -> ScribeResult<()> {
    let config = apply_overrides(ScribeConfig::load_layered(config_path)?, &options);
    let tests = read_tests(&options.tests).await?;
    info!(count = tests.len(), "Loaded test units");

    let clock: SharedClock = Arc::new(SystemClock);
    let mut annotator = Annotator::from_config(&config, options.root.clone(), clock)?
        .with_progress(Box::new(|line: &str| eprintln!("{}", line)));

    let (annotated, summary) = annotator.run(tests).await.into_parts();

    let annotations: Vec<serde_json::Value> = annotated
        .iter()
        .map(|entry| {
            serde_json::json!({
                "nodeid": entry.nodeid(),
                "annotation": entry.annotation(),
            })
        })
        .collect();
    let document = serde_json::json!({
        "annotations": annotations,
        "summary": summary,
    });
    let rendered = serde_json::to_string_pretty(&document)
        .map_err(|e| JsonError::new(format!("Failed to render annotations: {}", e)))?;

    match &options.output {
        Some(path) => {
            tokio::fs::write(path, rendered).await.map_err(|e| {
                ConfigError::new(format!("Failed to write {}: {}", path.display(), e))
            })?;
            info!(path = %path.display(), "Wrote annotations");
        }
        None => println!("{}", rendered),
    }

    eprintln!("{}", summary.headline());
    if let Some(error) = summary.first_error() {
        eprintln!("First error: {}", error);
    }
    Ok(())
}

//! Model listing command handler.

use std::path::Path;
use std::sync::Arc;
use testscribe::{ScribeConfig, ScribeResult, SharedClock, SystemClock, provider_from_config};

fn limit(value: Option<u64>) -> String {
    value.map_or_else(|| "unlimited".to_string(), |v| v.to_string())
}

/// Print the candidate models of the configured provider, in rotation order.
pub async fn list_models(config_path: Option<&Path>) -> ScribeResult<()> {
    let config = ScribeConfig::load_layered(config_path)?;
    config.validate()?;
    let provider = provider_from_config(&config, Arc::new(SystemClock) as SharedClock)?;

    if provider.provider_name() == "none" {
        println!("Annotation is disabled (provider = none)");
        return Ok(());
    }

    provider.check_ready().await?;
    let models = provider.candidate_models().await?;
    println!("Models for {}:", provider.provider_name());
    for (idx, model) in models.iter().enumerate() {
        println!("  {}. {}", idx + 1, model);
    }

    if let Some(limits) = provider.rate_limits() {
        println!(
            "Primary model limits: {} rpm, {} tpm, {} rpd",
            limit((*limits.requests_per_minute()).map(u64::from)),
            limit(*limits.tokens_per_minute()),
            limit((*limits.requests_per_day()).map(u64::from)),
        );
    }
    Ok(())
}

//! testscribe CLI binary.
//!
//! This binary provides command-line access to testscribe:
//! - Annotate collected tests from a JSON file
//! - Clear or prune the annotation cache
//! - List the models a provider would rotate through

use clap::Parser;
use testscribe::{TracingConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{AnnotateOptions, Cli, Commands, handle_cache_command, list_models, run_annotate};

    // Secrets may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_tracing(
        &TracingConfig::default()
            .with_log_level(log_level.to_string())
            .with_json_logs(cli.json_logs),
    )?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Annotate {
            tests,
            output,
            provider,
            model,
            max_tests,
            root,
        } => {
            let options = AnnotateOptions {
                tests,
                output,
                provider,
                model,
                max_tests,
                root,
            };
            run_annotate(options, config_path).await?;
        }

        Commands::Cache(cache_cmd) => {
            handle_cache_command(cache_cmd, config_path).await?;
        }

        Commands::Models => {
            list_models(config_path).await?;
        }
    }

    Ok(())
}

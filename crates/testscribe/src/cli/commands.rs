//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// testscribe - LLM annotations for pytest reports
#[derive(Parser, Debug)]
#[command(name = "testscribe")]
#[command(about = "Rate-limited, cached LLM annotations for pytest tests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate the tests listed in a JSON file
    Annotate {
        /// JSON array of test units
        #[arg(long)]
        tests: PathBuf,

        /// Where to write the annotations (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Provider override (none, ollama, litellm, gemini)
        #[arg(long)]
        provider: Option<String>,

        /// Model override: a name, a comma separated list, or `all`
        #[arg(long)]
        model: Option<String>,

        /// Maximum tests to process; 0 is unlimited
        #[arg(long)]
        max_tests: Option<usize>,

        /// Project root test and context paths are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Annotation cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),

    /// List the models the configured provider would rotate through
    Models,
}

/// Cache maintenance subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove every cached annotation
    Clear {
        /// Cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Remove expired annotations only
    Prune {
        /// Cache directory override
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

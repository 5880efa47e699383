//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the testscribe binary.

mod annotate;
mod cache;
mod commands;
mod models;

pub use annotate::{AnnotateOptions, run_annotate};
pub use cache::handle_cache_command;
pub use commands::{Cli, Commands};
pub use models::list_models;

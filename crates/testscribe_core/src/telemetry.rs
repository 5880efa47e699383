//! Tracing subscriber setup for binaries.

use derive_getters::Getters;
use testscribe_error::{ConfigError, ScribeResult};
use tracing_subscriber::EnvFilter;

/// How log output is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. "info", "testscribe=debug")
    log_level: String,
    /// Emit JSON lines instead of human-readable text
    json_logs: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout stays free for progress lines and JSON output.
/// `RUST_LOG` wins over the configured level.
///
/// # Errors
///
/// Returns a configuration error if the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &TracingConfig) -> ScribeResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            ConfigError::new(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed
        .map_err(|e| ConfigError::new(format!("Failed to initialize tracing: {}", e)).into())
}

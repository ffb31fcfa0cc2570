//! Logging setup for the pg-explain CLI
//!
//! Diagnostics go to stderr through `tracing`, keeping stdout free for the
//! rendered plan. `RUST_LOG` takes precedence over the verbosity flags.

use tracing_subscriber::{EnvFilter, fmt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level filter, used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Whether to include file/line information in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            json: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Maps the `-v` count onto a filter for the CLI and analyzer crates
    pub fn from_verbosity(verbose: u8, json: bool) -> Self {
        let default_filter = match verbose {
            0 => "warn".to_string(),
            1 => "warn,pg_explain=debug,pgex_analyzer=debug".to_string(),
            _ => "warn,pg_explain=trace,pgex_analyzer=trace".to_string(),
        };

        Self {
            default_filter,
            json,
            include_location: verbose > 1,
        }
    }
}

/// Initialize the global subscriber with the given configuration
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // Errors instead of panicking when a subscriber is already installed
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!("Failed to install log subscriber: {err}"))?;

    tracing::debug!(filter = %config.default_filter, json = config.json, "Logging initialized");

    Ok(())
}

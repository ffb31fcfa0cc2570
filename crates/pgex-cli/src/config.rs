//! Config file handling
//!
//! Settings live in a TOML file with an `[analyzer]` and a `[render]` table.
//! Every key is optional; anything left out keeps its default.
//!
//! ```toml
//! [analyzer]
//! seq_scan_row_threshold = 5000
//! skew_ratio_threshold = 20.0
//!
//! [render]
//! bar_width = 20
//! show_filters = false
//! ```

use anyhow::{Context, Result};
use pgex_analyzer::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub analyzer: AnalyzerConfig,
    pub render: RenderConfig,
}

/// Text output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of cells in the time share bar
    pub bar_width: usize,
    /// Whether to print filter / index conditions under each node
    pub show_filters: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bar_width: 10,
            show_filters: true,
        }
    }
}

impl CliConfig {
    /// Parses a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config file")
    }

    /// Reads and parses the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Loads the explicit config if given, else the user config file if it
    /// exists, else the defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/pg-explain/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pg-explain").join("config.toml"))
}

// TOML config adapter - Loads the application configuration file

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config_initialization::AppConfig;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "ppu_clip.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse a configuration document; missing keys keep their defaults
    pub fn parse(content: &str) -> Result<AppConfig> {
        toml::from_str(content).context("Failed to parse TOML config")
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Explicit path if given (must exist), else the default file in `dir` if present
    pub fn locate(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Found default config file");
            Some(candidate)
        } else {
            None
        }
    }

    /// Serialize a configuration (used to print the effective settings)
    pub fn to_toml(config: &AppConfig) -> Result<String> {
        toml::to_string_pretty(config).context("Failed to serialize config")
    }
}

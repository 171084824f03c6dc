//! Configuration initialization and hierarchy management

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use crate::adapters::chzzk_api::HttpConfig;
use crate::adapters::toml_config::TomlConfigAdapter;
use crate::domain::model::CutMode;
use crate::engine::EngineConfig;

/// Output location settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("clips"),
        }
    }
}

/// Log file and console level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            level: "warn".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub engine: EngineConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub cut_mode: Option<CutMode>,
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(overrides: &CliOverrides, cwd: &Path) -> Result<AppConfig> {
    // Step 1: defaults, Step 2: file
    let mut config = match TomlConfigAdapter::locate(overrides.config_path.as_deref(), cwd) {
        Some(path) => TomlConfigAdapter::load(&path)?,
        None => {
            debug!("No config file found, using defaults");
            AppConfig::default()
        }
    };

    // Step 3: environment
    let env_count = apply_environment_overrides(&mut config, std::env::vars())?;
    if env_count > 0 {
        info!("Applied {} environment variable overrides", env_count);
    }

    // Step 4: CLI
    let cli_count = apply_cli_overrides(&mut config, overrides);
    if cli_count > 0 {
        info!("Applied {} CLI configuration overrides", cli_count);
    }

    validate(&config)?;
    Ok(config)
}

/// Apply `PPU_CLIP_*` variables from `vars`; returns how many were applied
pub fn apply_environment_overrides<I>(config: &mut AppConfig, vars: I) -> Result<usize>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (key, value) in vars {
        match key.as_str() {
            "PPU_CLIP_OUTPUT_DIR" => config.output.dir = PathBuf::from(&value),
            "PPU_CLIP_LOG_DIR" => config.logging.dir = PathBuf::from(&value),
            "PPU_CLIP_LOG_LEVEL" => config.logging.level = value.clone(),
            "PPU_CLIP_ENGINE" => config.engine.binary = value.clone(),
            "PPU_CLIP_STALL_TIMEOUT" => {
                config.engine.stall_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid PPU_CLIP_STALL_TIMEOUT '{}'", value))?
            }
            "PPU_CLIP_COARSE_MARGIN" => {
                config.engine.coarse_margin_secs = value
                    .parse()
                    .with_context(|| format!("Invalid PPU_CLIP_COARSE_MARGIN '{}'", value))?
            }
            "PPU_CLIP_CUT_MODE" => {
                config.engine.cut_mode = CutMode::parse(&value).map_err(anyhow::Error::msg)?
            }
            _ => continue,
        }
        debug!("Environment override: {} = {}", key, value);
        applied += 1;
    }
    Ok(applied)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) -> usize {
    let mut applied = 0;
    if let Some(dir) = &overrides.output_dir {
        config.output.dir = dir.clone();
        applied += 1;
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.clone();
        applied += 1;
    }
    if let Some(mode) = overrides.cut_mode {
        config.engine.cut_mode = mode;
        applied += 1;
    }
    applied
}

/// Reject settings the pipeline cannot run with
pub fn validate(config: &AppConfig) -> Result<()> {
    let engine = &config.engine;
    if !engine.stall_timeout_secs.is_finite() || engine.stall_timeout_secs <= 0.0 {
        bail!("Stall timeout must be positive, got {}", engine.stall_timeout_secs);
    }
    if !engine.coarse_margin_secs.is_finite() || engine.coarse_margin_secs < 0.0 {
        bail!("Coarse seek margin cannot be negative, got {}", engine.coarse_margin_secs);
    }
    if engine.crf > 51 {
        bail!("CRF value cannot exceed 51");
    }
    if engine.binary.trim().is_empty() {
        bail!("Engine binary cannot be empty");
    }
    LevelFilter::from_str(&config.logging.level).map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: {}. Valid levels: trace, debug, info, warn, error, off",
            config.logging.level
        )
    })?;
    if config.http.timeout_secs == 0 {
        bail!("HTTP timeout must be at least one second");
    }
    Ok(())
}

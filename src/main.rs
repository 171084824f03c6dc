//! ppu-clip
//!
//! Command-line tool that cuts a clip out of a Chzzk replay.
//!
//! # Usage
//!
//! ```bash
//! ppu-clip "https://chzzk.naver.com/video/10646413?currentTime=22935" -d 20
//! ppu-clip https://chzzk.naver.com/video/10646413 --start 1:02:15 -d 0:30 -o clips
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

use ppu_clip::adapters::tracing_log::{init_tracing, LogSession};
use ppu_clip::adapters::TomlConfigAdapter;
use ppu_clip::app::DefaultAppContainer;
use ppu_clip::cli::{commands, Cli};
use ppu_clip::config_initialization::initialize_configuration_hierarchy;

/// Exit code for configuration and startup failures
const STARTUP_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(STARTUP_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = initialize_configuration_hierarchy(&cli.overrides(), &cwd)?;

    // Flushed when dropped at the end of this function, on every return path
    let session = LogSession::open_today(&config.logging.dir)
        .with_context(|| format!("Failed to open log directory {}", config.logging.dir.display()))?;
    init_tracing(&config.logging.level, Some(&session)).context("Failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting ppu-clip");
    debug!(log_file = %session.path().display(), "Log session opened");
    match TomlConfigAdapter::to_toml(&config) {
        Ok(text) => debug!("Effective configuration:\n{}", text),
        Err(e) => debug!("Effective configuration not printable: {:#}", e),
    }

    let container = DefaultAppContainer::new(&config, Some(&session), cli.clip.time_limit())?;
    let outcome = commands::clip(&container, &cli.clip, config.output.dir.clone()).await;

    Ok(ExitCode::from(outcome.exit_code()))
}

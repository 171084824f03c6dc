//! CLI module for ppu-clip
//!
//! This module handles command-line argument parsing and command execution.

use clap::Parser;
use std::path::PathBuf;

use crate::config_initialization::CliOverrides;

pub mod args;
pub mod commands;

pub use args::ClipArgs;

/// Chzzk replay clipper
///
/// Cuts a time window out of a Chzzk replay into a local MP4 file using ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "ppu-clip")]
#[command(about = "Extract a clip from a Chzzk replay")]
#[command(version)]
pub struct Cli {
    /// Console logging level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Configuration file (default: ppu_clip.toml in the working directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub clip: ClipArgs,
}

impl Cli {
    /// Settings the command line overrides in the configuration hierarchy
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            output_dir: self.clip.output.clone(),
            log_level: self.log_level.clone(),
            cut_mode: self.clip.cut_mode,
        }
    }
}

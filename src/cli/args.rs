//! Command-line argument definitions

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::model::{CutMode, TimeSpec};

/// Arguments for a clip extraction
#[derive(Args, Debug, Clone)]
pub struct ClipArgs {
    /// Replay URL, e.g. https://chzzk.naver.com/video/10646413?currentTime=2293
    pub url: String,

    /// Start time (HH:MM:SS, MM:SS, or seconds); overrides the URL's currentTime
    #[arg(short, long, value_parser = TimeSpec::parse)]
    pub start: Option<TimeSpec>,

    /// Clip length (HH:MM:SS, MM:SS, or seconds)
    #[arg(short, long, value_parser = TimeSpec::parse)]
    pub duration: TimeSpec,

    /// Output directory [default: clips]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Stream handling: auto, copy or reencode
    #[arg(long, value_parser = CutMode::parse)]
    pub cut_mode: Option<CutMode>,

    /// Give up after this many seconds of wall-clock time
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ClipArgs {
    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    pub fn show_progress(&self) -> bool {
        !self.json && !self.no_progress
    }
}

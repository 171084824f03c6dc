//! Media engine invocation and progress tracking

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::model::CutMode;

pub mod command;
pub mod progress;

pub use command::EngineCommand;
pub use progress::{DiagnosticLines, ProgressMonitor};

/// Media engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary name or path
    pub binary: String,
    /// Distance the keyframe seek lands before the window start
    pub coarse_margin_secs: f64,
    /// Maximum gap between progress events before the engine is killed
    pub stall_timeout_secs: f64,
    /// Copy/re-encode selection
    pub cut_mode: CutMode,
    /// Video codec used when re-encoding
    pub video_codec: String,
    /// Encoding preset
    pub preset: String,
    /// Constant Rate Factor (0-51)
    pub crf: u8,
    /// Audio codec used when re-encoding
    pub audio_codec: String,
    /// Audio bitrate used when re-encoding
    pub audio_bitrate: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            coarse_margin_secs: 8.0,
            stall_timeout_secs: 15.0,
            cut_mode: CutMode::Auto,
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.stall_timeout_secs)
    }
}

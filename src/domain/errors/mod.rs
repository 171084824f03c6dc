// Domain errors - Error types for the clip extraction pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable classification of a failed extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidUrl,
    VideoNotFound,
    VideoUnavailable,
    InvalidWindow,
    WindowOutOfRange,
    OutputExists,
    EngineNotFound,
    EngineFailed,
    EngineTimeout,
    Cancelled,
}

impl ErrorKind {
    /// Process exit code reported by the CLI for this kind
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::InvalidUrl | ErrorKind::InvalidWindow | ErrorKind::WindowOutOfRange => 2,
            ErrorKind::VideoNotFound | ErrorKind::VideoUnavailable => 3,
            ErrorKind::OutputExists => 4,
            ErrorKind::EngineNotFound | ErrorKind::EngineFailed | ErrorKind::EngineTimeout => 5,
            ErrorKind::Cancelled => 130,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidUrl",
            ErrorKind::VideoNotFound => "VideoNotFound",
            ErrorKind::VideoUnavailable => "VideoUnavailable",
            ErrorKind::InvalidWindow => "InvalidWindow",
            ErrorKind::WindowOutOfRange => "WindowOutOfRange",
            ErrorKind::OutputExists => "OutputExists",
            ErrorKind::EngineNotFound => "EngineNotFound",
            ErrorKind::EngineFailed => "EngineFailed",
            ErrorKind::EngineTimeout => "EngineTimeout",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one extraction request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// URL does not match the replay URL shape
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Platform reports no such video
    #[error("Video not found: {video_id}")]
    VideoNotFound { video_id: String },

    /// Video exists but cannot be played (private, removed, geo-blocked, API change)
    #[error("Video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    /// Requested window is malformed
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Window starts at or beyond the end of the video
    #[error("Start {start:.3}s is outside the video (total duration {total:.3}s)")]
    WindowOutOfRange { start: f64, total: f64 },

    /// A file already sits at the computed output path
    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    /// Media engine binary could not be started
    #[error("Media engine '{binary}' not found")]
    EngineNotFound { binary: String },

    /// Media engine exited with a non-zero status
    #[error("Media engine failed (exit code {}): {}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()), .last_lines.join(" | "))]
    EngineFailed {
        exit_code: Option<i32>,
        last_lines: Vec<String>,
    },

    /// No progress within the stall window, or the wall-clock limit elapsed
    #[error("Media engine timed out: {0}")]
    EngineTimeout(String),

    /// Caller cancelled the extraction
    #[error("Extraction cancelled")]
    Cancelled,
}

impl DomainError {
    /// Error kind surfaced in the outcome and on stderr
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            DomainError::VideoNotFound { .. } => ErrorKind::VideoNotFound,
            DomainError::VideoUnavailable { .. } => ErrorKind::VideoUnavailable,
            DomainError::InvalidWindow(_) => ErrorKind::InvalidWindow,
            DomainError::WindowOutOfRange { .. } => ErrorKind::WindowOutOfRange,
            DomainError::OutputExists { .. } => ErrorKind::OutputExists,
            DomainError::EngineNotFound { .. } => ErrorKind::EngineNotFound,
            DomainError::EngineFailed { .. } => ErrorKind::EngineFailed,
            DomainError::EngineTimeout(_) => ErrorKind::EngineTimeout,
            DomainError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        DomainError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(video_id: &str, reason: impl Into<String>) -> Self {
        DomainError::VideoUnavailable {
            video_id: video_id.to_string(),
            reason: reason.into(),
        }
    }
}

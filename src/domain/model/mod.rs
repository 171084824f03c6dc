// Domain models - Core types and data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, ErrorKind};

/// Time specification - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            seconds: hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `SS[.ms]`, `MM:SS[.ms]` or `HH:MM:SS[.ms]`
    pub fn parse(time_str: &str) -> Result<Self, String> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(format!("'{}' is not a finite number", trimmed));
            }
            if seconds < 0.0 {
                return Err("Time cannot be negative".to_string());
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, *m, *s),
            [h, m, s] => {
                let hours = h
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid hours in '{}'", trimmed))?;
                (hours, *m, *s)
            }
            _ => {
                return Err(format!(
                    "Invalid time '{}'. Supported formats: seconds (145), MM:SS (02:25), HH:MM:SS (01:02:25)",
                    trimmed
                ))
            }
        };

        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| format!("Invalid minutes in '{}'", trimmed))?;
        let seconds = seconds_part
            .parse::<f64>()
            .map_err(|_| format!("Invalid seconds in '{}'", trimmed))?;

        if parts.len() == 3 && minutes >= 60 {
            return Err("Minutes must be less than 60".to_string());
        }
        if !(0.0..60.0).contains(&seconds) {
            return Err("Seconds must be in 0..60".to_string());
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Format as HH:MM:SS (whole seconds)
    pub fn format_hms(&self) -> String {
        let total = self.seconds.max(0.0).floor() as u64;
        format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Parsed replay URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReference {
    pub raw_url: String,
    pub video_id: String,
    pub embedded_timestamp: Option<f64>,
}

/// Playable media descriptor returned by the platform resolver
#[derive(Debug, Clone, PartialEq)]
pub struct MediaLocator {
    pub source_media_url: String,
    pub title: String,
    pub total_duration_seconds: f64,
    /// HTTP headers the engine must send when fetching the media
    pub headers: BTreeMap<String, String>,
}

impl MediaLocator {
    pub fn new(source_media_url: String, title: String, total_duration_seconds: f64) -> Self {
        Self {
            source_media_url,
            title,
            total_duration_seconds,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Absolute extraction window within the source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionWindow {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl ExtractionWindow {
    pub fn new(start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            start_seconds,
            duration_seconds,
        }
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Informational adjustment made while resolving a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowNote {
    /// Requested end ran past the end of the video
    Clamped {
        requested_duration: f64,
        granted_duration: f64,
    },
}

impl fmt::Display for WindowNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowNote::Clamped {
                requested_duration,
                granted_duration,
            } => write!(
                f,
                "requested {:.3}s runs past the end of the video; clip shortened to {:.3}s",
                requested_duration, granted_duration
            ),
        }
    }
}

/// Successful window resolution, possibly with a clamp note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWindow {
    pub window: ExtractionWindow,
    pub note: Option<WindowNote>,
}

/// Where the clip will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Normalized progress of one running extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub fraction_complete: f64,
    pub elapsed_seconds: f64,
}

/// Stream handling chosen for the cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutMode {
    /// Copy when the cut is exact without re-encoding, re-encode otherwise
    Auto,
    /// Always stream copy (fast, keyframe-granular start)
    Copy,
    /// Always re-encode (slower, frame-accurate)
    Reencode,
}

impl CutMode {
    /// Parse cut mode from string
    pub fn parse(mode_str: &str) -> Result<Self, String> {
        match mode_str.trim().to_lowercase().as_str() {
            "auto" => Ok(CutMode::Auto),
            "copy" => Ok(CutMode::Copy),
            "reencode" | "re-encode" => Ok(CutMode::Reencode),
            other => Err(format!(
                "Invalid cut mode: {}. Valid modes: auto, copy, reencode",
                other
            )),
        }
    }
}

impl fmt::Display for CutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CutMode::Auto => "auto",
            CutMode::Copy => "copy",
            CutMode::Reencode => "reencode",
        };
        f.write_str(name)
    }
}

/// One extraction request as supplied by a front-end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipRequest {
    pub url: String,
    pub start: Option<f64>,
    pub duration: f64,
    pub output_dir: PathBuf,
}

impl ClipRequest {
    pub fn new(url: impl Into<String>, start: Option<f64>, duration: f64, output_dir: PathBuf) -> Self {
        Self {
            url: url.into(),
            start,
            duration,
            output_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Terminal result of one extraction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub status: OutcomeStatus,
    pub output_path: Option<PathBuf>,
    pub error_kind: Option<ErrorKind>,
    pub message: Option<String>,
    pub note: Option<WindowNote>,
    pub elapsed_seconds: f64,
}

impl ExtractionOutcome {
    pub fn success(output_path: PathBuf, note: Option<WindowNote>, elapsed_seconds: f64) -> Self {
        Self {
            status: OutcomeStatus::Success,
            output_path: Some(output_path),
            error_kind: None,
            message: note.map(|n| n.to_string()),
            note,
            elapsed_seconds,
        }
    }

    pub fn failure(error: &DomainError, elapsed_seconds: f64) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            output_path: None,
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
            note: None,
            elapsed_seconds,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// CLI exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self.error_kind {
            Some(kind) => kind.exit_code(),
            None => 0,
        }
    }
}

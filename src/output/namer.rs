//! Deterministic clip file naming

use std::path::Path;
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::{ExtractionWindow, OutputTarget};
use crate::output::CLIP_EXTENSION;
use crate::ports::FsPort;

/// Longest sanitized title kept in a file name, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Videos at least this long get hour digits in their labels
const HOUR_LABEL_THRESHOLD: f64 = 3600.0;

const FALLBACK_TITLE: &str = "clip";

/// Output namer
pub struct OutputNamer;

impl OutputNamer {
    /// Make a title safe to use as a file name on common file systems
    pub fn sanitize_title(title: &str) -> String {
        let replaced: String = title
            .chars()
            .map(|c| match c {
                '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        let truncated: String = Self::trim_name(&replaced)
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();
        let name = Self::trim_name(&truncated);

        if name.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            name.to_string()
        }
    }

    fn trim_name(name: &str) -> &str {
        name.trim().trim_end_matches('.').trim_end()
    }

    /// `HHMMSS` for long videos, `MMSS` otherwise (whole seconds)
    pub fn time_label(seconds: f64, with_hours: bool) -> String {
        let total = seconds.max(0.0).floor() as u64;
        if with_hours {
            format!(
                "{:02}{:02}{:02}",
                total / 3600,
                (total % 3600) / 60,
                total % 60
            )
        } else {
            format!("{:02}{:02}", total / 60, total % 60)
        }
    }

    /// `<title>_<start>-<end>.mp4`
    pub fn file_name(title: &str, window: &ExtractionWindow, total_duration: f64) -> String {
        let with_hours = total_duration >= HOUR_LABEL_THRESHOLD;
        format!(
            "{}_{}-{}.{}",
            Self::sanitize_title(title),
            Self::time_label(window.start_seconds, with_hours),
            Self::time_label(window.end_seconds(), with_hours),
            CLIP_EXTENSION
        )
    }

    /// Compute the target path without touching the file system
    pub fn target(
        output_dir: &Path,
        title: &str,
        window: &ExtractionWindow,
        total_duration: f64,
    ) -> OutputTarget {
        OutputTarget::new(output_dir.join(Self::file_name(title, window, total_duration)))
    }

    /// Compute the target, create its directory and claim the path for this request
    ///
    /// The claim leaves an empty file behind; a request that finds anything at
    /// the path fails with `OutputExists` and never touches it.
    pub async fn prepare(
        fs: &dyn FsPort,
        output_dir: &Path,
        title: &str,
        window: &ExtractionWindow,
        total_duration: f64,
    ) -> Result<OutputTarget, DomainError> {
        let target = Self::target(output_dir, title, window, total_duration);
        debug!(path = %target.path().display(), "Computed output path");

        fs.create_directory(output_dir).await?;
        if let Err(e) = fs.claim_file(target.path()).await {
            if let DomainError::OutputExists { .. } = e {
                info!(path = %target.path().display(), "Output already exists");
            }
            return Err(e);
        }
        Ok(target)
    }
}

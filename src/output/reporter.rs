//! Terminal outcome construction

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{ExtractionOutcome, OutputTarget, WindowNote};
use crate::ports::{EngineReport, FsPort};

/// Builds the single outcome of a request
pub struct ResultReporter {
    fs: Arc<dyn FsPort>,
}

impl ResultReporter {
    pub fn new(fs: Arc<dyn FsPort>) -> Self {
        Self { fs }
    }

    /// Failure before the engine was started; nothing to clean up
    pub fn rejected(&self, error: &DomainError, started: Instant) -> ExtractionOutcome {
        info!(kind = %error.kind(), "Request rejected: {}", error);
        ExtractionOutcome::failure(error, started.elapsed().as_secs_f64())
    }

    /// Outcome of an engine run; a failed run releases the path it claimed
    pub async fn finished(
        &self,
        result: Result<EngineReport, DomainError>,
        target: &OutputTarget,
        note: Option<WindowNote>,
        started: Instant,
    ) -> ExtractionOutcome {
        match result {
            Ok(report) => {
                info!(path = %report.output_path.display(), "Clip written");
                ExtractionOutcome::success(report.output_path, note, started.elapsed().as_secs_f64())
            }
            Err(error) => {
                warn!(kind = %error.kind(), "Extraction failed: {}", error);
                if let Err(e) = self.fs.remove_file(target.path()).await {
                    warn!(path = %target.path().display(), "Failed to remove partial output: {}", e);
                }
                ExtractionOutcome::failure(&error, started.elapsed().as_secs_f64())
            }
        }
    }
}

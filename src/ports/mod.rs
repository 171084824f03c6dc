// Ports - Interface definitions (contracts)

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::planner::SeekPlan;

/// Port for platform resolution (video id to playable media)
#[async_trait]
pub trait ResolvePort: Send + Sync {
    /// Resolve a video id to its media source, title and total duration
    async fn resolve(&self, video_id: &str) -> Result<MediaLocator, DomainError>;
}

/// Everything the engine needs for one run
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub locator: MediaLocator,
    pub window: ExtractionWindow,
    pub seek: SeekPlan,
    pub output: OutputTarget,
    /// Wall-clock limit for the whole run
    pub time_limit: Option<std::time::Duration>,
}

/// Summary of a successful engine run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReport {
    pub output_path: PathBuf,
    pub elapsed_seconds: f64,
    pub progress_events: u64,
}

/// Port for the media engine
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Run the engine once for `plan`, streaming progress until it exits
    async fn extract(
        &self,
        plan: &ExtractionPlan,
        progress: mpsc::Sender<ProgressEvent>,
        cancel: CancelToken,
    ) -> Result<EngineReport, DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Create an empty file at `path`, failing with `OutputExists` if anything is already there
    async fn claim_file(&self, path: &Path) -> Result<(), DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, path: &Path) -> Result<(), DomainError>;

    /// Remove a file; a missing file is not an error
    async fn remove_file(&self, path: &Path) -> Result<(), DomainError>;
}

/// One line of the per-request log
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub timestamp: String,
    pub request: ClipRequest,
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub window: Option<ExtractionWindow>,
    pub outcome: ExtractionOutcome,
}

/// Port for request logging
#[async_trait]
pub trait LogPort: Send + Sync {
    /// Persist one request record
    async fn record(&self, record: &RequestRecord);

    /// Flush buffered output
    async fn flush(&self);
}

/// Caller side of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Engine side of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn pair() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                tx: std::sync::Arc::new(tx),
            },
            CancelToken { rx },
        )
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Keep the value readable after the sender is gone
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever otherwise
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// Clip interactor - Orchestrates the clip extraction use case

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::output::{OutputNamer, ResultReporter};
use crate::planner::SeekPlanner;
use crate::ports::*;

/// What is about to be extracted, known once the request has been validated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub video_id: String,
    pub title: String,
    pub canonical_url: String,
    pub window: ExtractionWindow,
    pub note: Option<WindowNote>,
    pub output_path: PathBuf,
}

/// Channels a front-end listens on while a request runs
pub struct ClipObserver {
    pub prepared: Option<oneshot::Sender<ClipSummary>>,
    pub progress: mpsc::Sender<ProgressEvent>,
}

impl ClipObserver {
    pub fn new(prepared: oneshot::Sender<ClipSummary>, progress: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            prepared: Some(prepared),
            progress,
        }
    }

    pub fn progress_only(progress: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            prepared: None,
            progress,
        }
    }
}

/// Extraction tunables fixed for the interactor's lifetime
#[derive(Debug, Clone, Copy)]
pub struct ClipSettings {
    pub cut_mode: CutMode,
    pub coarse_margin_secs: f64,
    pub time_limit: Option<Duration>,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            cut_mode: CutMode::Auto,
            coarse_margin_secs: 8.0,
            time_limit: None,
        }
    }
}

/// Request facts gathered on the way, for the request log
#[derive(Default)]
struct RequestTrace {
    video_id: Option<String>,
    title: Option<String>,
    window: Option<ExtractionWindow>,
}

/// Interactor for the clip extraction use case
pub struct ClipInteractor {
    resolve_port: Arc<dyn ResolvePort>,
    execute_port: Arc<dyn ExecutePort>,
    fs_port: Arc<dyn FsPort>,
    log_port: Arc<dyn LogPort>,
    reporter: ResultReporter,
    planner: SeekPlanner,
    settings: ClipSettings,
}

impl ClipInteractor {
    /// Create new clip interactor with injected ports
    pub fn new(
        resolve_port: Arc<dyn ResolvePort>,
        execute_port: Arc<dyn ExecutePort>,
        fs_port: Arc<dyn FsPort>,
        log_port: Arc<dyn LogPort>,
        settings: ClipSettings,
    ) -> Self {
        Self {
            resolve_port,
            execute_port,
            reporter: ResultReporter::new(Arc::clone(&fs_port)),
            fs_port,
            log_port,
            planner: SeekPlanner::new(settings.coarse_margin_secs),
            settings,
        }
    }

    pub fn settings(&self) -> &ClipSettings {
        &self.settings
    }

    /// Run one request to its single outcome; every request is logged
    pub async fn execute(
        &self,
        request: &ClipRequest,
        observer: ClipObserver,
        cancel: CancelToken,
    ) -> ExtractionOutcome {
        let started = Instant::now();
        let timestamp = Local::now().to_rfc3339();
        let mut trace = RequestTrace::default();

        info!(url = %request.url, start = ?request.start, duration = request.duration, "Clip request");
        let outcome = self
            .run(request, observer, cancel, started, &mut trace)
            .await;

        self.log_port
            .record(&RequestRecord {
                timestamp,
                request: request.clone(),
                video_id: trace.video_id,
                title: trace.title,
                window: trace.window,
                outcome: outcome.clone(),
            })
            .await;
        self.log_port.flush().await;

        outcome
    }

    async fn run(
        &self,
        request: &ClipRequest,
        observer: ClipObserver,
        cancel: CancelToken,
        started: Instant,
        trace: &mut RequestTrace,
    ) -> ExtractionOutcome {
        let prepared = match self.prepare(request, &cancel, trace).await {
            Ok(prepared) => prepared,
            Err(error) => return self.reporter.rejected(&error, started),
        };
        let (summary, plan) = prepared;
        let note = summary.note;

        if let Some(tx) = observer.prepared {
            // The front-end may not care about the summary
            let _ = tx.send(summary);
        }

        let result = self
            .execute_port
            .extract(&plan, observer.progress, cancel)
            .await;

        self.reporter
            .finished(result, &plan.output, note, started)
            .await
    }

    /// Everything up to the engine run: parse, resolve, window, output path, seek plan
    async fn prepare(
        &self,
        request: &ClipRequest,
        cancel: &CancelToken,
        trace: &mut RequestTrace,
    ) -> Result<(ClipSummary, ExtractionPlan), DomainError> {
        let source = UrlParser::parse(&request.url)?;
        trace.video_id = Some(source.video_id.clone());
        WindowResolver::check_inputs(request.start, request.duration)?;

        let mut watch = cancel.clone();
        let locator = tokio::select! {
            resolved = self.resolve_port.resolve(&source.video_id) => resolved?,
            _ = watch.cancelled() => return Err(DomainError::Cancelled),
        };
        trace.title = Some(locator.title.clone());

        let resolved = WindowResolver::resolve(request.start, request.duration, &source, &locator)?;
        trace.window = Some(resolved.window);
        let canonical_url = UrlParser::strip_timestamp(&source.raw_url)?;

        let output = OutputNamer::prepare(
            self.fs_port.as_ref(),
            &request.output_dir,
            &locator.title,
            &resolved.window,
            locator.total_duration_seconds,
        )
        .await?;

        if cancel.is_cancelled() {
            // Release the claim; nothing else has written to it
            if let Err(e) = self.fs_port.remove_file(output.path()).await {
                debug!(path = %output.path().display(), "Failed to release output path: {}", e);
            }
            return Err(DomainError::Cancelled);
        }

        let seek = self.planner.plan(&resolved.window, self.settings.cut_mode);
        debug!(?seek, "Seek plan");

        let summary = ClipSummary {
            video_id: source.video_id.clone(),
            title: locator.title.clone(),
            canonical_url,
            window: resolved.window,
            note: resolved.note,
            output_path: output.path().to_path_buf(),
        };

        let plan = ExtractionPlan {
            locator,
            window: resolved.window,
            seek,
            output,
            time_limit: self.settings.time_limit,
        };
        Ok((summary, plan))
    }
}

//! End-to-end tests of the clip use case with in-memory platform and engine ports

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot, Notify};

use ppu_clip::adapters::FsLocalAdapter;
use ppu_clip::app::{ClipInteractor, ClipObserver, ClipSettings};
use ppu_clip::domain::model::*;
use ppu_clip::planner::ClippingStrategy;
use ppu_clip::ports::*;
use ppu_clip::{DomainError, ErrorKind};

// Test utilities

struct FakeResolver {
    result: Result<MediaLocator, DomainError>,
    calls: AtomicUsize,
}

impl FakeResolver {
    fn total(total: f64) -> Self {
        Self {
            result: Ok(MediaLocator::new(
                "https://cdn.invalid/master.m3u8".to_string(),
                "Raid: night/1".to_string(),
                total,
            )),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(error: DomainError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResolvePort for FakeResolver {
    async fn resolve(&self, _video_id: &str) -> Result<MediaLocator, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Engine that writes a few bytes, reports progress, or fails after writing
struct FakeEngine {
    fail_with: Option<DomainError>,
    plans: Mutex<Vec<ExtractionPlan>>,
    /// Signalled once output is written; the run then waits for the release
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeEngine {
    fn ok() -> Self {
        Self {
            fail_with: None,
            plans: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn failing(error: DomainError) -> Self {
        Self {
            fail_with: Some(error),
            plans: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(fail_with: Option<DomainError>, written: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            fail_with,
            plans: Mutex::new(Vec::new()),
            gate: Some((written, release)),
        }
    }

    fn calls(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    fn last_plan(&self) -> ExtractionPlan {
        self.plans.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ExecutePort for FakeEngine {
    async fn extract(
        &self,
        plan: &ExtractionPlan,
        progress: mpsc::Sender<ProgressEvent>,
        _cancel: CancelToken,
    ) -> Result<EngineReport, DomainError> {
        self.plans.lock().unwrap().push(plan.clone());
        std::fs::write(plan.output.path(), b"partial").unwrap();

        if let Some((written, release)) = &self.gate {
            written.notify_one();
            release.notified().await;
        }

        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        for fraction in [0.25, 0.5, 1.0] {
            let _ = progress
                .send(ProgressEvent {
                    fraction_complete: fraction,
                    elapsed_seconds: 0.0,
                })
                .await;
        }
        Ok(EngineReport {
            output_path: plan.output.path().to_path_buf(),
            elapsed_seconds: 0.1,
            progress_events: 3,
        })
    }
}

#[derive(Default)]
struct MemoryLog {
    records: Mutex<Vec<RequestRecord>>,
}

#[async_trait]
impl LogPort for MemoryLog {
    async fn record(&self, record: &RequestRecord) {
        self.records.lock().unwrap().push(record.clone());
    }

    async fn flush(&self) {}
}

struct Harness {
    dir: TempDir,
    resolver: Arc<FakeResolver>,
    engine: Arc<FakeEngine>,
    log: Arc<MemoryLog>,
    interactor: ClipInteractor,
}

impl Harness {
    fn new(resolver: FakeResolver, engine: FakeEngine) -> Self {
        let resolver = Arc::new(resolver);
        let engine = Arc::new(engine);
        let log = Arc::new(MemoryLog::default());
        let interactor = ClipInteractor::new(
            Arc::clone(&resolver) as Arc<dyn ResolvePort>,
            Arc::clone(&engine) as Arc<dyn ExecutePort>,
            Arc::new(FsLocalAdapter::new()) as Arc<dyn FsPort>,
            Arc::clone(&log) as Arc<dyn LogPort>,
            ClipSettings::default(),
        );
        Self {
            dir: TempDir::new().unwrap(),
            resolver,
            engine,
            log,
            interactor,
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("clips")
    }

    fn request(&self, url: &str, start: Option<f64>, duration: f64) -> ClipRequest {
        ClipRequest::new(url, start, duration, self.output_dir())
    }

    async fn execute(&self, request: &ClipRequest) -> (ExtractionOutcome, Vec<ProgressEvent>) {
        let (tx, mut rx) = mpsc::channel(16);
        let outcome = self
            .interactor
            .execute(request, ClipObserver::progress_only(tx), CancelToken::never())
            .await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    fn records(&self) -> Vec<RequestRecord> {
        self.log.records.lock().unwrap().clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

fn clip_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| file_name(&e.unwrap().path())).collect(),
        Err(_) => Vec::new(),
    }
}

// Scenarios

#[tokio::test]
async fn test_embedded_timestamp_drives_window_and_name() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let request = harness.request("https://chzzk.naver.com/video/10646413?currentTime=22935", None, 20.0);

    let (outcome, events) = harness.execute(&request).await;

    assert!(outcome.is_success(), "{:?}", outcome);
    let name = file_name(outcome.output_path.as_ref().unwrap());
    assert_eq!(name, "Raid_ night_1_062215-062235.mp4");

    let plan = harness.engine.last_plan();
    assert_eq!(plan.window, ExtractionWindow::new(22935.0, 20.0));
    assert_eq!(plan.seek.coarse_seconds, 22927.0);
    assert_eq!(plan.seek.fine_seconds, 8.0);
    assert_eq!(plan.seek.strategy, ClippingStrategy::Reencode);

    assert_eq!(events.last().map(|e| e.fraction_complete), Some(1.0));
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_explicit_start_overrides_embedded_timestamp() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let request = harness.request(
        "https://chzzk.naver.com/video/10646413?currentTime=22935",
        Some(3600.0),
        30.0,
    );

    let (outcome, _) = harness.execute(&request).await;

    assert!(outcome.is_success());
    assert_eq!(harness.engine.last_plan().window, ExtractionWindow::new(3600.0, 30.0));
}

#[tokio::test]
async fn test_window_past_end_is_clamped_with_note() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let request = harness.request("https://chzzk.naver.com/video/10646413", Some(99990.0), 30.0);

    let (outcome, _) = harness.execute(&request).await;

    assert!(outcome.is_success());
    assert_eq!(harness.engine.last_plan().window, ExtractionWindow::new(99990.0, 9.0));
    assert_eq!(
        outcome.note,
        Some(WindowNote::Clamped {
            requested_duration: 30.0,
            granted_duration: 9.0
        })
    );
    assert!(outcome.message.is_some());
}

#[tokio::test]
async fn test_existing_output_is_never_overwritten() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let request = harness.request("https://chzzk.naver.com/video/10646413?currentTime=22935", None, 20.0);

    std::fs::create_dir_all(harness.output_dir()).unwrap();
    let existing = harness.output_dir().join("Raid_ night_1_062215-062235.mp4");
    std::fs::write(&existing, b"keep me").unwrap();

    let (outcome, events) = harness.execute(&request).await;

    assert_eq!(outcome.status, OutcomeStatus::Failure);
    assert_eq!(outcome.error_kind, Some(ErrorKind::OutputExists));
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(harness.engine.calls(), 0);
    assert!(events.is_empty());
    assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");
}

#[tokio::test]
async fn test_invalid_url_fails_before_resolution() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());

    for url in [
        "https://example.com/video/1",
        "https://chzzk.naver.com/live/1",
        "https://chzzk.naver.com/video/abc",
        "https://chzzk.naver.com/video/1?currentTime=-4",
    ] {
        let (outcome, _) = harness.execute(&harness.request(url, None, 10.0)).await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidUrl), "{}", url);
        assert_eq!(outcome.exit_code(), 2);
    }

    assert_eq!(harness.resolver.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.engine.calls(), 0);
}

#[tokio::test]
async fn test_invalid_duration_fails_before_resolution() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", None, 0.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidWindow));
    assert_eq!(harness.resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_start_beyond_end_is_out_of_range() {
    let harness = Harness::new(FakeResolver::total(600.0), FakeEngine::ok());
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1?currentTime=600", None, 10.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::WindowOutOfRange));
    assert_eq!(harness.engine.calls(), 0);
}

#[tokio::test]
async fn test_platform_errors_map_to_exit_three() {
    let harness = Harness::new(
        FakeResolver::failing(DomainError::VideoNotFound {
            video_id: "1".to_string(),
        }),
        FakeEngine::ok(),
    );
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", None, 10.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::VideoNotFound));
    assert_eq!(outcome.exit_code(), 3);
}

#[tokio::test]
async fn test_engine_failure_removes_partial_output() {
    let harness = Harness::new(
        FakeResolver::total(1200.0),
        FakeEngine::failing(DomainError::EngineFailed {
            exit_code: Some(1),
            last_lines: vec!["Connection reset by peer".to_string()],
        }),
    );
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::EngineFailed));
    assert_eq!(outcome.exit_code(), 5);
    assert!(outcome.message.unwrap().contains("Connection reset"));

    let written = harness.engine.last_plan().output.path().to_path_buf();
    assert_eq!(file_name(&written), "Raid_ night_1_0100-0110.mp4");
    assert!(!written.exists());
}

#[tokio::test]
async fn test_cancelled_request_never_reaches_engine() {
    let harness = Harness::new(FakeResolver::total(1200.0), FakeEngine::ok());
    let (handle, token) = CancelHandle::pair();
    handle.cancel();

    let (tx, _rx) = mpsc::channel(4);
    let outcome = harness
        .interactor
        .execute(
            &harness.request("https://chzzk.naver.com/video/1", None, 10.0),
            ClipObserver::progress_only(tx),
            token,
        )
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(harness.engine.calls(), 0);
    assert_eq!(clip_files(&harness.output_dir()), Vec::<String>::new());
}

#[tokio::test]
async fn test_cancel_during_extraction_removes_partial_output() {
    let harness = Harness::new(FakeResolver::total(1200.0), FakeEngine::failing(DomainError::Cancelled));
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(harness.engine.calls(), 1);
    assert!(!harness.engine.last_plan().output.path().exists());
}

#[tokio::test]
async fn test_request_losing_the_path_keeps_the_winners_clip() {
    let written = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = Harness::new(
        FakeResolver::total(1200.0),
        FakeEngine::gated(None, Arc::clone(&written), Arc::clone(&release)),
    );
    let request = harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0);

    let (winner, loser) = tokio::join!(harness.execute(&request), async {
        // Second request for the same clip while the first one is writing it
        written.notified().await;
        let loser = harness.execute(&request).await;
        release.notify_one();
        loser
    });

    assert_eq!(loser.0.error_kind, Some(ErrorKind::OutputExists));
    assert!(winner.0.is_success(), "{:?}", winner.0);
    assert_eq!(harness.engine.calls(), 1);

    let path = winner.0.output_path.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"partial");
}

#[tokio::test]
async fn test_failed_run_releases_only_its_own_claim() {
    let written = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let harness = Harness::new(
        FakeResolver::total(1200.0),
        FakeEngine::gated(
            Some(DomainError::EngineFailed {
                exit_code: Some(1),
                last_lines: vec!["Connection reset by peer".to_string()],
            }),
            Arc::clone(&written),
            Arc::clone(&release),
        ),
    );
    let first = harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0);

    let (failed, rejected) = tokio::join!(harness.execute(&first), async {
        written.notified().await;
        let rejected = harness.execute(&first).await;
        release.notify_one();
        rejected
    });

    assert_eq!(failed.0.error_kind, Some(ErrorKind::EngineFailed));
    assert_eq!(rejected.0.error_kind, Some(ErrorKind::OutputExists));
    assert_eq!(clip_files(&harness.output_dir()), Vec::<String>::new());
}

#[tokio::test]
async fn test_claim_is_released_when_engine_is_missing() {
    let harness = Harness::new(
        FakeResolver::total(1200.0),
        FakeEngine::failing(DomainError::EngineNotFound {
            binary: "ffmpeg".to_string(),
        }),
    );
    let (outcome, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::EngineNotFound));
    assert_eq!(clip_files(&harness.output_dir()), Vec::<String>::new());

    // The same clip can be requested again afterwards
    let (retry, _) = harness
        .execute(&harness.request("https://chzzk.naver.com/video/1", Some(60.0), 10.0))
        .await;
    assert_eq!(retry.error_kind, Some(ErrorKind::EngineNotFound));
}

#[tokio::test]
async fn test_summary_is_published_before_extraction() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());
    let (summary_tx, summary_rx) = oneshot::channel();
    let (tx, _rx) = mpsc::channel(16);

    let outcome = harness
        .interactor
        .execute(
            &harness.request("chzzk.naver.com/video/10646413?currentTime=22935&foo=bar", None, 20.0),
            ClipObserver::new(summary_tx, tx),
            CancelToken::never(),
        )
        .await;
    assert!(outcome.is_success());

    let summary = summary_rx.await.unwrap();
    assert_eq!(summary.video_id, "10646413");
    assert_eq!(summary.canonical_url, "https://chzzk.naver.com/video/10646413?foo=bar");
    assert_eq!(summary.window, ExtractionWindow::new(22935.0, 20.0));
    assert_eq!(Some(summary.output_path), outcome.output_path);
}

#[tokio::test]
async fn test_every_request_is_logged_once() {
    let harness = Harness::new(FakeResolver::total(99999.0), FakeEngine::ok());

    harness
        .execute(&harness.request("https://chzzk.naver.com/video/10646413", Some(5.0), 5.0))
        .await;
    harness
        .execute(&harness.request("not a url", None, 5.0))
        .await;

    let records = harness.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].video_id.as_deref(), Some("10646413"));
    assert_eq!(records[0].window, Some(ExtractionWindow::new(5.0, 5.0)));
    assert!(records[0].outcome.is_success());
    assert_eq!(records[1].video_id, None);
    assert_eq!(records[1].outcome.error_kind, Some(ErrorKind::InvalidUrl));

    let line = serde_json::to_string(&records[1]).unwrap();
    assert!(line.contains("\"InvalidUrl\""));
}

#[tokio::test]
async fn test_time_limit_reaches_the_engine() {
    let resolver = Arc::new(FakeResolver::total(1200.0));
    let engine = Arc::new(FakeEngine::ok());
    let dir = TempDir::new().unwrap();
    let interactor = ClipInteractor::new(
        resolver as Arc<dyn ResolvePort>,
        Arc::clone(&engine) as Arc<dyn ExecutePort>,
        Arc::new(FsLocalAdapter::new()) as Arc<dyn FsPort>,
        Arc::new(MemoryLog::default()) as Arc<dyn LogPort>,
        ClipSettings {
            cut_mode: CutMode::Copy,
            coarse_margin_secs: 8.0,
            time_limit: Some(Duration::from_secs(90)),
        },
    );

    let (tx, _rx) = mpsc::channel(16);
    let outcome = interactor
        .execute(
            &ClipRequest::new("https://chzzk.naver.com/video/1", Some(30.0), 10.0, dir.path().to_path_buf()),
            ClipObserver::progress_only(tx),
            CancelToken::never(),
        )
        .await;

    assert!(outcome.is_success());
    let plan = engine.last_plan();
    assert_eq!(plan.time_limit, Some(Duration::from_secs(90)));
    assert_eq!(plan.seek.strategy, ClippingStrategy::Copy);
}

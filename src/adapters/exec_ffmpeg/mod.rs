//! FFmpeg execution adapter
//!
//! Runs one ffmpeg subprocess per extraction. A monitor task turns the
//! `-progress pipe:1` stream into progress events, a second task keeps the
//! tail of stderr, and the driver loop enforces the stall window, the
//! wall-clock limit and cancellation.

use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::command::DIAGNOSTIC_TAIL_LINES;
use crate::engine::progress::spawn_tail;
use crate::engine::{EngineCommand, EngineConfig, ProgressMonitor};
use crate::ports::*;

/// Buffered progress events between the monitor task and the driver
const MONITOR_CHANNEL_CAPACITY: usize = 64;

/// FFmpeg-based execution adapter
pub struct FfmpegExecAdapter {
    config: EngineConfig,
}

/// Why the driver loop stopped
enum Termination {
    Exited(io::Result<ExitStatus>),
    Stalled,
    TimeLimit(Duration),
    Cancelled,
}

impl FfmpegExecAdapter {
    /// Create adapter, searching for the configured binary in PATH
    pub fn new(mut config: EngineConfig) -> Self {
        if let Ok(path) = which::which(&config.binary) {
            debug!(binary = %path.display(), "Found media engine");
            config.binary = path.to_string_lossy().to_string();
        }
        Self { config }
    }

    fn spawn(&self, command: &EngineCommand) -> Result<Child, DomainError> {
        Command::new(&command.binary)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    DomainError::EngineNotFound {
                        binary: command.binary.clone(),
                    }
                }
                _ => DomainError::EngineFailed {
                    exit_code: None,
                    last_lines: vec![format!("Failed to start {}: {}", command.binary, e)],
                },
            })
    }

    async fn terminate(child: &mut Child) {
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill media engine");
        }
    }
}

#[async_trait]
impl ExecutePort for FfmpegExecAdapter {
    async fn extract(
        &self,
        plan: &ExtractionPlan,
        progress: mpsc::Sender<ProgressEvent>,
        mut cancel: CancelToken,
    ) -> Result<EngineReport, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let command = EngineCommand::build(
            &self.config,
            &plan.locator.source_media_url,
            &plan.locator.headers,
            &plan.seek,
            plan.output.path(),
        );
        info!(
            binary = %command.binary,
            output = %plan.output.path().display(),
            "Starting media engine"
        );
        debug!(args = ?command.args, "Engine arguments");

        let started = Instant::now();
        let mut child = self.spawn(&command)?;

        let missing_pipe = || DomainError::EngineFailed {
            exit_code: None,
            last_lines: vec!["Engine output pipes unavailable".to_string()],
        };
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

        let (event_tx, mut event_rx) = mpsc::channel(MONITOR_CHANNEL_CAPACITY);
        let monitor = ProgressMonitor::new(plan.window.duration_seconds, started).spawn(stdout, event_tx);
        let mut tail = spawn_tail(stderr, DIAGNOSTIC_TAIL_LINES);

        let stall_window = self.config.stall_timeout();
        let stall = tokio::time::sleep(stall_window);
        tokio::pin!(stall);

        let time_limit = plan.time_limit;
        let deadline = async move {
            match time_limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut events_open = true;
        let termination = loop {
            tokio::select! {
                status = child.wait() => break Termination::Exited(status),
                event = event_rx.recv(), if events_open => match event {
                    Some(event) => {
                        stall.as_mut().reset(tokio::time::Instant::now() + stall_window);
                        // Slow consumers miss intermediate events, never the final one
                        let _ = progress.try_send(event);
                    }
                    None => events_open = false,
                },
                _ = &mut stall => break Termination::Stalled,
                _ = &mut deadline => {
                    break Termination::TimeLimit(time_limit.unwrap_or_default())
                }
                _ = cancel.cancelled() => break Termination::Cancelled,
            }
        };

        let status = match termination {
            Termination::Exited(status) => status,
            Termination::Stalled => {
                warn!(stall_secs = stall_window.as_secs_f64(), "Media engine stalled, killing it");
                Self::terminate(&mut child).await;
                monitor.abort();
                tail.abort();
                return Err(DomainError::EngineTimeout(format!(
                    "no progress for {:.0}s",
                    stall_window.as_secs_f64()
                )));
            }
            Termination::TimeLimit(limit) => {
                warn!(limit_secs = limit.as_secs_f64(), "Wall-clock limit reached, killing media engine");
                Self::terminate(&mut child).await;
                monitor.abort();
                tail.abort();
                return Err(DomainError::EngineTimeout(format!(
                    "wall-clock limit of {:.0}s elapsed",
                    limit.as_secs_f64()
                )));
            }
            Termination::Cancelled => {
                info!("Extraction cancelled, killing media engine");
                Self::terminate(&mut child).await;
                monitor.abort();
                tail.abort();
                return Err(DomainError::Cancelled);
            }
        };

        // Forward whatever the monitor parsed before the pipe closed. A
        // descendant that inherited the pipes can keep them open after exit.
        let drain = async {
            while let Some(event) = event_rx.recv().await {
                let _ = progress.try_send(event);
            }
        };
        if tokio::time::timeout(stall_window, drain).await.is_err() {
            warn!("Engine output still open after exit, abandoning progress stream");
            monitor.abort();
        }
        let monitor = monitor.await;

        let last_lines = match tokio::time::timeout(stall_window, &mut tail).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                warn!("Engine diagnostics still open after exit, abandoning them");
                tail.abort();
                Vec::new()
            }
        };

        let status = status.map_err(|e| DomainError::EngineFailed {
            exit_code: None,
            last_lines: vec![format!("Failed to wait for media engine: {}", e)],
        })?;

        if !status.success() {
            warn!(code = ?status.code(), "Media engine failed");
            return Err(DomainError::EngineFailed {
                exit_code: status.code(),
                last_lines,
            });
        }

        let mut monitor = monitor.unwrap_or_else(|_| {
            ProgressMonitor::new(plan.window.duration_seconds, started)
        });
        let _ = progress.send(monitor.complete()).await;

        let elapsed_seconds = started.elapsed().as_secs_f64();
        info!(elapsed_seconds, "Media engine finished");

        Ok(EngineReport {
            output_path: plan.output.path().to_path_buf(),
            elapsed_seconds,
            progress_events: monitor.events_emitted(),
        })
    }
}

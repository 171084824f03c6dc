//! Progress tracking over the engine's live diagnostic stream

use std::collections::VecDeque;
use std::io;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::domain::model::ProgressEvent;

/// Splits a byte stream into lines on `\n` or `\r`
///
/// ffmpeg's `-stats` output rewrites one terminal line with carriage returns,
/// so a plain newline reader would only see it when the process exits.
pub struct DiagnosticLines<R> {
    reader: R,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> DiagnosticLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Next non-empty line, or `None` once the stream is closed
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
                let rest = self.pending.split_off(pos + 1);
                let mut line = std::mem::replace(&mut self.pending, rest);
                line.pop();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.pending);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&buf[..n]);
            }
        }
    }
}

/// Extract the `time=HH:MM:SS(.frac)` field of a diagnostic line, in seconds
///
/// Matches both `-stats` lines (`... time=00:01:23.45 bitrate=...`) and
/// `-progress` lines (`out_time=00:01:23.450000`).
pub fn parse_time_field(line: &str) -> Option<f64> {
    let value = line.split("time=").nth(1)?.split_whitespace().next()?;

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].trim_start_matches('-').parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if parts[0].starts_with('-') {
        // ffmpeg reports negative timestamps before the first output packet
        return Some(0.0);
    }

    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    total.is_finite().then_some(total)
}

/// Translates engine timestamps into a non-decreasing completion ratio
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    duration_seconds: f64,
    started: Instant,
    last_fraction: f64,
    events_emitted: u64,
}

impl ProgressMonitor {
    pub fn new(duration_seconds: f64, started: Instant) -> Self {
        Self {
            duration_seconds,
            started,
            last_fraction: 0.0,
            events_emitted: 0,
        }
    }

    /// Feed one diagnostic line; returns an event when it carried a timestamp
    pub fn observe(&mut self, line: &str) -> Option<ProgressEvent> {
        let current = parse_time_field(line)?;
        let fraction = if self.duration_seconds > 0.0 {
            (current / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(self.emit(fraction))
    }

    /// Final event of a successful run
    pub fn complete(&mut self) -> ProgressEvent {
        self.emit(1.0)
    }

    pub fn last_fraction(&self) -> f64 {
        self.last_fraction
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    fn emit(&mut self, fraction: f64) -> ProgressEvent {
        self.last_fraction = self.last_fraction.max(fraction);
        self.events_emitted += 1;
        ProgressEvent {
            fraction_complete: self.last_fraction,
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
        }
    }

    /// Drain `reader` on a task, sending an event per parsed line
    ///
    /// The task ends when the stream closes (or the receiver goes away) and
    /// hands the monitor back so the caller can emit the completion event.
    pub fn spawn<R>(
        mut self,
        reader: R,
        events: mpsc::Sender<ProgressEvent>,
    ) -> JoinHandle<ProgressMonitor>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = DiagnosticLines::new(reader);
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(line = %line, "engine progress");
                if let Some(event) = self.observe(&line) {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            }
            self
        })
    }
}

/// Keep the last `limit` lines of a stream on a task
pub fn spawn_tail<R>(reader: R, limit: usize) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = DiagnosticLines::new(reader);
        let mut tail = VecDeque::with_capacity(limit);
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            trace!(line = %line, "engine diagnostic");
            if tail.len() == limit {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stats_and_progress_lines() {
        assert_eq!(
            parse_time_field("frame=  120 fps= 30 q=-1.0 size=  1024kB time=00:00:04.50 bitrate=1864.1kbits/s speed=2x"),
            Some(4.5)
        );
        assert_eq!(parse_time_field("out_time=01:02:03.250000"), Some(3723.25));
    }

    #[test]
    fn ignores_unrelated_lines() {
        for line in [
            "progress=continue",
            "out_time_ms=4500000",
            "out_time_us=4500000",
            "out_time=N/A",
            "Input #0, hls, from 'master.m3u8':",
            "time=garbage",
            "",
        ] {
            assert_eq!(parse_time_field(line), None, "line: {}", line);
        }
    }

    #[test]
    fn negative_timestamps_read_as_zero() {
        assert_eq!(parse_time_field("out_time=-00:00:00.033333"), Some(0.0));
    }

    #[test]
    fn fraction_is_clamped_and_monotonic() {
        let mut monitor = ProgressMonitor::new(20.0, Instant::now());
        let first = monitor.observe("out_time=00:00:10.000000").unwrap();
        assert_eq!(first.fraction_complete, 0.5);

        // Engine went backwards
        let second = monitor.observe("out_time=00:00:05.000000").unwrap();
        assert_eq!(second.fraction_complete, 0.5);

        let third = monitor.observe("out_time=00:01:00.000000").unwrap();
        assert_eq!(third.fraction_complete, 1.0);

        assert!(monitor.observe("progress=continue").is_none());
        assert_eq!(monitor.events_emitted(), 3);
    }

    #[test]
    fn complete_reads_one() {
        let mut monitor = ProgressMonitor::new(20.0, Instant::now());
        monitor.observe("out_time=00:00:02.000000");
        assert_eq!(monitor.complete().fraction_complete, 1.0);
        assert_eq!(monitor.last_fraction(), 1.0);
    }

    #[tokio::test]
    async fn splits_on_newlines_and_carriage_returns() {
        let data: &[u8] = b"frame=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\nlast";
        let mut lines = DiagnosticLines::new(data);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "frame=1 time=00:00:01.00");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "frame=2 time=00:00:02.00");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "last");
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn spawned_monitor_emits_non_decreasing_events() {
        let data: &'static [u8] = b"out_time=N/A\nout_time=00:00:02.000000\nprogress=continue\nout_time=00:00:01.000000\nout_time=00:00:03.000000\nprogress=end\n";
        let (tx, mut rx) = mpsc::channel(16);
        let handle = ProgressMonitor::new(4.0, Instant::now()).spawn(data, tx);

        let mut fractions = Vec::new();
        while let Some(event) = rx.recv().await {
            fractions.push(event.fraction_complete);
        }
        let mut monitor = handle.await.unwrap();

        assert_eq!(fractions, vec![0.5, 0.5, 0.75]);
        assert_eq!(monitor.complete().fraction_complete, 1.0);
    }

    #[tokio::test]
    async fn tail_keeps_last_lines() {
        let data: &'static [u8] = b"one\ntwo\nthree\nfour\n";
        let tail = spawn_tail(data, 2).await.unwrap();
        assert_eq!(tail, vec!["three".to_string(), "four".to_string()]);
    }
}

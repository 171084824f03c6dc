// Tracing log adapter - Daily log file, subscriber setup and request records

use crate::ports::*;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Level of the file layer; the console level is configurable
const FILE_FILTER: &str = "info,ppu_clip=debug";

/// File name of the log for `date`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("ppu_clip_{}.log", date.format("%Y-%m-%d"))
}

/// Cloneable handle writing into the session's log file
#[derive(Clone)]
pub struct SessionWriter {
    file: Arc<Mutex<BufWriter<File>>>,
}

impl Write for SessionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock() {
            Ok(mut file) => file.write(buf),
            Err(poisoned) => poisoned.into_inner().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(poisoned) => poisoned.into_inner().flush(),
        }
    }
}

/// Owner of one run's log file; flushes on drop
pub struct LogSession {
    path: PathBuf,
    writer: SessionWriter,
}

impl LogSession {
    /// Open (append) the log file for `date` under `log_dir`
    pub fn open(log_dir: &Path, date: NaiveDate) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(log_file_name(date));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: SessionWriter {
                file: Arc::new(Mutex::new(BufWriter::new(file))),
            },
        })
    }

    /// Open today's log file (local calendar date)
    pub fn open_today(log_dir: &Path) -> io::Result<Self> {
        Self::open(log_dir, Local::now().date_naive())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&self) -> SessionWriter {
        self.writer.clone()
    }

    pub fn flush(&self) {
        let _ = self.writer.clone().flush();
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Install the global subscriber: stderr at `console_level` (`RUST_LOG`
/// overrides it) plus the session file when one is open
pub fn init_tracing(console_level: &str, session: Option<&LogSession>) -> Result<(), TryInitError> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));
    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = session.map(|session| {
        let writer = session.writer();
        fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .with_filter(EnvFilter::new(FILE_FILTER))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
}

/// Tracing log adapter
pub struct TracingLogAdapter {
    writer: Option<SessionWriter>,
}

impl TracingLogAdapter {
    /// Adapter appending request records to the session file
    pub fn new(session: &LogSession) -> Self {
        Self {
            writer: Some(session.writer()),
        }
    }

    /// Adapter that only emits tracing events
    pub fn detached() -> Self {
        Self { writer: None }
    }
}

#[async_trait]
impl LogPort for TracingLogAdapter {
    async fn record(&self, record: &RequestRecord) {
        info!(
            url = %record.request.url,
            status = ?record.outcome.status,
            error_kind = ?record.outcome.error_kind,
            "Request finished"
        );

        let Some(writer) = &self.writer else {
            return;
        };
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize request record");
                return;
            }
        };
        let mut writer = writer.clone();
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!(error = %e, "Failed to write request record");
        }
    }

    async fn flush(&self) {
        if let Some(writer) = &self.writer {
            let _ = writer.clone().flush();
        }
    }
}

//! ppu-clip library
//!
//! Extracts a time window from a Chzzk replay into a local MP4 file. The
//! pipeline parses the replay URL, resolves the playable stream, computes and
//! clamps the window, names the output, drives ffmpeg with a two-stage seek
//! and reports one outcome per request.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod output;
pub mod planner;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{DomainError, ErrorKind};
pub use domain::model::{ClipRequest, ExtractionOutcome, ExtractionWindow, MediaLocator, ProgressEvent};

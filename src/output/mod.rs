//! Output naming and terminal result reporting

pub mod namer;
pub mod reporter;

pub use namer::OutputNamer;
pub use reporter::ResultReporter;

/// Container extension of every clip
pub const CLIP_EXTENSION: &str = "mp4";

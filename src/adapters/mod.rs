// Adapters - External system implementations

pub mod chzzk_api;
pub mod exec_ffmpeg;
pub mod fs_local;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use chzzk_api::ChzzkApiAdapter;
pub use exec_ffmpeg::FfmpegExecAdapter;
pub use fs_local::FsLocalAdapter;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::{LogSession, TracingLogAdapter};

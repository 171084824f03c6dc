//! ffmpeg argument construction

use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::EngineConfig;
use crate::planner::{ClippingStrategy, SeekPlan};

/// Number of trailing stderr lines kept for failure reports
pub const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// Fully built engine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub binary: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    /// Build the cut command for one extraction
    ///
    /// Progress goes to stdout as `key=value` lines (`out_time=HH:MM:SS.us`),
    /// diagnostics to stderr.
    pub fn build(
        config: &EngineConfig,
        source_url: &str,
        headers: &BTreeMap<String, String>,
        plan: &SeekPlan,
        output: &Path,
    ) -> Self {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if !headers.is_empty() {
            let header_str: String = headers
                .iter()
                .map(|(k, v)| format!("{}: {}\r\n", k, v))
                .collect();
            args.push("-headers".to_string());
            args.push(header_str);
        }

        // HLS demuxer options
        args.extend(
            [
                "-allowed_extensions",
                "ALL",
                "-extension_picky",
                "0",
                "-protocol_whitelist",
                "file,http,https,tcp,tls,crypto",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        // Coarse seek: before -i, jumps to the keyframe at or before the target
        args.push("-ss".to_string());
        args.push(format_seconds(plan.coarse_seconds));
        args.push("-i".to_string());
        args.push(source_url.to_string());

        // Fine seek: after -i, decodes and discards up to the exact start
        if plan.fine_seconds > 0.0 {
            args.push("-ss".to_string());
            args.push(format_seconds(plan.fine_seconds));
        }
        args.push("-t".to_string());
        args.push(format_seconds(plan.duration_seconds));

        match plan.strategy {
            ClippingStrategy::Copy => {
                args.extend(["-c", "copy"].iter().map(|s| s.to_string()));
            }
            ClippingStrategy::Reencode => {
                args.extend([
                    "-c:v".to_string(),
                    config.video_codec.clone(),
                    "-preset".to_string(),
                    config.preset.clone(),
                    "-crf".to_string(),
                    config.crf.to_string(),
                    "-c:a".to_string(),
                    config.audio_codec.clone(),
                    "-b:a".to_string(),
                    config.audio_bitrate.clone(),
                ]);
            }
        }

        args.extend(
            [
                "-avoid_negative_ts",
                "make_zero",
                "-movflags",
                "+faststart",
                // The output path is an empty placeholder claimed for this run
                "-y",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(output.to_string_lossy().to_string());

        Self {
            binary: config.binary.clone(),
            args,
        }
    }
}

fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

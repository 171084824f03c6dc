//! Common utilities and helpers

/// Utility functions for ppu-clip
pub struct Utils;

impl Utils {
    /// Format elapsed seconds for display (`1m 05.2s`, `12.3s`)
    pub fn format_elapsed(seconds: f64) -> String {
        let seconds = seconds.max(0.0);
        let minutes = (seconds / 60.0).floor() as u64;
        let rest = seconds - (minutes * 60) as f64;

        if minutes > 0 {
            format!("{}m {:04.1}s", minutes, rest)
        } else {
            format!("{:.1}s", rest)
        }
    }
}

//! Seek strategy implementation

use tracing::{debug, info};

use crate::domain::model::{CutMode, ExtractionWindow};
use crate::planner::{ClippingStrategy, SeekPlan};

/// Fine seeks shorter than this are treated as zero
const FINE_SEEK_EPSILON: f64 = 0.001;

/// Planner for the coarse/fine seek split and the codec strategy
#[derive(Debug, Clone)]
pub struct SeekPlanner {
    coarse_margin_seconds: f64,
}

impl SeekPlanner {
    /// Create a planner that lands the coarse seek `coarse_margin_seconds` before the start
    pub fn new(coarse_margin_seconds: f64) -> Self {
        Self {
            coarse_margin_seconds: coarse_margin_seconds.max(0.0),
        }
    }

    /// Plan the seek and select copy or re-encode
    pub fn plan(&self, window: &ExtractionWindow, mode: CutMode) -> SeekPlan {
        let coarse = (window.start_seconds - self.coarse_margin_seconds).max(0.0);
        let mut fine = window.start_seconds - coarse;
        if fine < FINE_SEEK_EPSILON {
            fine = 0.0;
        }

        let strategy = match mode {
            CutMode::Copy => ClippingStrategy::Copy,
            CutMode::Reencode => ClippingStrategy::Reencode,
            CutMode::Auto => Self::determine_auto_strategy(coarse, fine),
        };

        info!(
            coarse,
            fine,
            duration = window.duration_seconds,
            ?strategy,
            "Planned two-stage seek"
        );

        SeekPlan {
            coarse_seconds: coarse,
            fine_seconds: fine,
            duration_seconds: window.duration_seconds,
            strategy,
        }
    }

    /// A stream copy snaps to the keyframe at or before the seek target, so it
    /// is only exact when the cut starts at the very beginning of the stream.
    fn determine_auto_strategy(coarse_seconds: f64, fine_seconds: f64) -> ClippingStrategy {
        if coarse_seconds == 0.0 && fine_seconds == 0.0 {
            debug!("Cut starts at the stream start, stream copy is exact");
            ClippingStrategy::Copy
        } else {
            debug!(coarse_seconds, fine_seconds, "Cut starts mid-stream, re-encoding");
            ClippingStrategy::Reencode
        }
    }
}

impl Default for SeekPlanner {
    fn default() -> Self {
        Self::new(8.0)
    }
}

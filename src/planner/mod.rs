//! Seek and codec planning for a single cut

use serde::{Deserialize, Serialize};

pub mod strategy;

pub use strategy::SeekPlanner;

/// How streams are carried into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClippingStrategy {
    /// Lossless stream copy (fast, keyframe-granular)
    Copy,
    /// Full re-encoding of the window (slower, frame-accurate)
    Reencode,
}

/// Two-stage seek plan handed to the media engine
///
/// `coarse_seconds` is applied before the input is opened (keyframe seek),
/// `fine_seconds` after it (decode-and-discard up to the exact frame). Their
/// sum is the window start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekPlan {
    pub coarse_seconds: f64,
    pub fine_seconds: f64,
    pub duration_seconds: f64,
    pub strategy: ClippingStrategy,
}

impl SeekPlan {
    pub fn start_seconds(&self) -> f64 {
        self.coarse_seconds + self.fine_seconds
    }
}

//! Period estimation modules
//!
//! Convert an onset-strength curve to a tempo estimate using:
//! - FFT-accelerated autocorrelation with a tempo prior
//! - Peak picking shared with onset and salience analysis

pub mod autocorrelation;
pub mod peak_picking;

pub use autocorrelation::{estimate_tempo, tempo_candidates};
pub use peak_picking::find_peaks;

/// BPM candidate with confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmCandidate {
    /// BPM estimate
    pub bpm: f32,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

/// Final tempo estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmEstimate {
    /// BPM estimate
    pub bpm: f32,

    /// Beat period in onset-curve frames (fractional)
    pub period_frames: f32,

    /// Normalized autocorrelation at the chosen period (0.0-1.0)
    pub confidence: f32,
}

//! Onset detection modules
//!
//! - Spectral-flux onset strength on log-compressed magnitudes
//! - Adaptive thresholds (median + MAD, percentile)
//! - Onset picking on the strength curve
//!
//! The same strength curve drives both the onset-based note segmenter and the
//! rhythm analyzer.

pub mod picking;
pub mod spectral_flux;
pub mod threshold;

pub use picking::pick_onsets;
pub use spectral_flux::{onset_strength, onset_strength_from_signal};

use serde::{Deserialize, Serialize};

/// Detected onset with its strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetCandidate {
    /// Frame index in the onset-strength curve
    pub frame: usize,

    /// Onset time in seconds (frame start)
    pub time_seconds: f32,

    /// Onset strength relative to the curve maximum (0.0-1.0)
    pub confidence: f32,
}

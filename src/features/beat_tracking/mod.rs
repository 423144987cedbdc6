//! Beat tracking modules
//!
//! Build a beat grid from the onset-strength curve:
//! - Dynamic-programming beat tracking (Ellis 2007)
//! - Time signature detection from downbeat accents
//! - Rhythm analyzer tying tempo, beats, meter and rests together

pub mod dp_tracker;
pub mod rhythm;
pub mod time_signature;

pub use rhythm::{analyze_rhythm, RhythmAnalysis};
pub use time_signature::TimeSignature;

use serde::{Deserialize, Serialize};

/// Beat position in a bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatPosition {
    /// Beat index within bar (0 = downbeat)
    pub beat_index: u32,

    /// Time in seconds
    pub time_seconds: f32,
}

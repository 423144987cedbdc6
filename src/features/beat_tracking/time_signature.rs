//! Time signature detection
//!
//! Decides between 3/4 and 4/4 by looking at where the strong beats fall.
//!
//! # Algorithm
//!
//! 1. Take the onset strength at every tracked beat
//! 2. For a grouping g ∈ {3, 4} and phase p, score the hypothesis as the mean
//!    strength of beats `p, p+g, p+2g, …` divided by the mean over all beats
//! 3. Keep the best phase for each grouping
//! 4. Choose 3/4 only when it beats 4/4 by more than 10 %; otherwise 4/4
//!
//! The winning phase is the index of the first downbeat in the beat list.
//!
//! # Example
//!
//! ```
//! use stratum_transcribe::features::beat_tracking::time_signature::{
//!     detect_time_signature, TimeSignature,
//! };
//!
//! // Accent on every third beat, starting at beat 1
//! let strengths: Vec<f32> = (0..12).map(|i| if i % 3 == 1 { 1.0 } else { 0.3 }).collect();
//! let estimate = detect_time_signature(&strengths);
//! assert_eq!(estimate.time_signature, TimeSignature::WALTZ);
//! assert_eq!(estimate.downbeat_offset, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Beats required before a meter is inferred
const MIN_BEATS: usize = 8;

/// Margin 3/4 must win by
const WALTZ_MARGIN: f32 = 1.1;

/// Musical time signature (numerator / denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per measure
    pub numerator: u8,

    /// Note value of one beat (4 = quarter note)
    pub denominator: u8,
}

impl TimeSignature {
    /// 4/4 (common time), the nominal meter
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    /// 3/4 (waltz time)
    pub const WALTZ: TimeSignature = TimeSignature {
        numerator: 3,
        denominator: 4,
    };

    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> u32 {
        self.numerator as u32
    }

    /// Measure length in quarter notes (`numerator × 4 / denominator`)
    pub fn quarter_notes_per_measure(&self) -> f32 {
        self.numerator as f32 * 4.0 / self.denominator.max(1) as f32
    }

    /// Get name as string (e.g., "4/4", "3/4")
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Result of meter detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignatureEstimate {
    /// Chosen time signature
    pub time_signature: TimeSignature,

    /// Index of the first downbeat within the beat list
    pub downbeat_offset: usize,

    /// Relative margin of the winning grouping over the other (0.0-1.0)
    pub confidence: f32,

    /// False when there was too little evidence and 4/4 was assumed
    pub detected: bool,
}

impl TimeSignatureEstimate {
    fn assumed() -> Self {
        Self {
            time_signature: TimeSignature::COMMON,
            downbeat_offset: 0,
            confidence: 0.0,
            detected: false,
        }
    }
}

/// Detect time signature from per-beat onset strengths
///
/// # Arguments
///
/// * `beat_strengths` - Onset strength at each tracked beat, in beat order
///
/// # Returns
///
/// The best grouping with its downbeat phase. Fewer than 8 beats, or beats
/// without any onset energy, yield 4/4 with `detected = false`.
pub fn detect_time_signature(beat_strengths: &[f32]) -> TimeSignatureEstimate {
    if beat_strengths.len() < MIN_BEATS {
        log::debug!(
            "Only {} beats, assuming 4/4",
            beat_strengths.len()
        );
        return TimeSignatureEstimate::assumed();
    }

    let mean_all = beat_strengths.iter().sum::<f32>() / beat_strengths.len() as f32;
    if mean_all <= EPSILON {
        return TimeSignatureEstimate::assumed();
    }

    let (phase_4, score_4) = best_phase(beat_strengths, 4, mean_all);
    let (phase_3, score_3) = best_phase(beat_strengths, 3, mean_all);

    log::debug!(
        "Meter scores: 4/4 = {:.3} (phase {}), 3/4 = {:.3} (phase {})",
        score_4,
        phase_4,
        score_3,
        phase_3
    );

    if score_3 > score_4 * WALTZ_MARGIN {
        TimeSignatureEstimate {
            time_signature: TimeSignature::WALTZ,
            downbeat_offset: phase_3,
            confidence: ((score_3 - score_4) / score_3).clamp(0.0, 1.0),
            detected: true,
        }
    } else {
        TimeSignatureEstimate {
            time_signature: TimeSignature::COMMON,
            downbeat_offset: phase_4,
            confidence: ((score_4 - score_3) / score_4.max(EPSILON)).clamp(0.0, 1.0),
            detected: true,
        }
    }
}

/// Best downbeat phase for a grouping; ties go to the earliest phase
fn best_phase(strengths: &[f32], group: usize, mean_all: f32) -> (usize, f32) {
    let mut best = (0, 0.0f32);
    for phase in 0..group {
        let accented: Vec<f32> = strengths.iter().skip(phase).step_by(group).copied().collect();
        if accented.is_empty() {
            continue;
        }
        let score = accented.iter().sum::<f32>() / accented.len() as f32 / mean_all;
        if score > best.1 {
            best = (phase, score);
        }
    }
    best
}

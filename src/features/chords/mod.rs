//! Chord recognition
//!
//! Matches windowed pitch-class histograms against binary chord templates
//! (7 qualities × 12 roots) by cosine similarity, merges repeated chords into
//! spans, and summarizes the progression against the detected key.

pub mod recognition;
pub mod statistics;
pub mod templates;

pub use recognition::{chord_notes, chord_windows, recognize_chords};
pub use statistics::ChordStatistics;
pub use templates::{ChordQuality, ChordTemplates};

use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A recognized chord span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Root pitch class (0 = C)
    pub root: u8,

    /// Chord quality
    pub quality: ChordQuality,

    /// Span start in seconds
    pub start: f32,

    /// Span end in seconds
    pub end: f32,

    /// Mean template similarity over the span (0.0-1.0)
    pub confidence: f32,
}

impl Chord {
    /// Chord symbol, e.g. "C", "F#m", "Bdim", "G7"
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_transcribe::features::chords::{Chord, ChordQuality};
    ///
    /// let chord = Chord { root: 9, quality: ChordQuality::Minor7, start: 0.0, end: 1.0, confidence: 0.9 };
    /// assert_eq!(chord.name(), "Am7");
    /// ```
    pub fn name(&self) -> String {
        format!("{}{}", NOTE_NAMES[self.root as usize % 12], self.quality.suffix())
    }

    /// Span length in seconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    /// MIDI pitches of the chord voiced as a block chord rooted at `base`
    pub fn pitches(&self, base: u8) -> Vec<u8> {
        self.quality
            .intervals()
            .iter()
            .map(|&i| base.saturating_add(self.root % 12).saturating_add(i))
            .collect()
    }
}

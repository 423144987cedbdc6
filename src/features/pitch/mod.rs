//! Frame-level pitch estimation
//!
//! - Hz ↔ MIDI conversion
//! - Dominant-frequency estimator producing one [`PitchObservation`] per frame

pub mod estimator;

pub use estimator::{estimate_pitches, PitchEstimator, PitchTrack};

use serde::{Deserialize, Serialize};

/// Reference tuning: A4 = 440 Hz = MIDI 69
const A4_HZ: f32 = 440.0;

/// One per-frame pitch estimate
///
/// `frequency_hz` is `None` for silent or sub-threshold frames; that is a
/// normal observation, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchObservation {
    /// Frame start time in seconds
    pub time: f32,

    /// Dominant frequency, if any bin cleared the threshold
    pub frequency_hz: Option<f32>,

    /// Amplitude estimate of the dominant partial (0.0 when absent)
    pub magnitude: f32,

    /// Peak magnitude relative to the frame's maximum possible magnitude (0.0-1.0)
    pub confidence: f32,
}

impl PitchObservation {
    /// Nearest MIDI note for the observed frequency, if representable
    pub fn semitone(&self) -> Option<u8> {
        self.frequency_hz.and_then(frequency_to_semitone)
    }
}

/// Convert a frequency to a fractional MIDI pitch: `69 + 12·log2(f/440)`
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::pitch::hz_to_midi;
///
/// assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-4);
/// assert!((hz_to_midi(261.63) - 60.0).abs() < 0.01);
/// ```
pub fn hz_to_midi(frequency_hz: f32) -> f32 {
    69.0 + 12.0 * (frequency_hz / A4_HZ).log2()
}

/// Convert a (fractional) MIDI pitch to Hz
pub fn midi_to_hz(midi: f32) -> f32 {
    A4_HZ * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Round a frequency to the nearest MIDI note number
///
/// Returns `None` for non-positive frequencies or pitches outside 0..=127.
pub fn frequency_to_semitone(frequency_hz: f32) -> Option<u8> {
    if !(frequency_hz > 0.0) || !frequency_hz.is_finite() {
        return None;
    }
    let midi = hz_to_midi(frequency_hz).round();
    if (0.0..=127.0).contains(&midi) {
        Some(midi as u8)
    } else {
        None
    }
}

/// Note name with octave (e.g., "C4", "F#5")
pub fn note_name(pitch: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", NAMES[pitch as usize % 12], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_midi_roundtrip() {
        for midi in [21.0f32, 48.0, 60.0, 69.0, 100.0] {
            let back = hz_to_midi(midi_to_hz(midi));
            assert!((back - midi).abs() < 1e-3);
        }
    }

    #[test]
    fn test_frequency_to_semitone() {
        assert_eq!(frequency_to_semitone(261.63), Some(60));
        assert_eq!(frequency_to_semitone(329.63), Some(64));
        assert_eq!(frequency_to_semitone(392.0), Some(67));
        // Quarter-tone sharp of A4 still rounds to A4
        assert_eq!(frequency_to_semitone(446.0), Some(69));
        assert_eq!(frequency_to_semitone(0.0), None);
        assert_eq!(frequency_to_semitone(-10.0), None);
        assert_eq!(frequency_to_semitone(1.0), None);
        assert_eq!(frequency_to_semitone(f32::NAN), None);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(66), "F#4");
    }
}

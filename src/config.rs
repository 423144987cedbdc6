//! Configuration parameters for transcription
//!
//! A single [`TranscriptionConfig`] carries every tunable and every fallback
//! value. It is passed by value into the pipeline so concurrent requests never
//! share state.

use crate::error::TranscriptionError;
use crate::features::beat_tracking::time_signature::TimeSignature;
use serde::{Deserialize, Serialize};

/// Note detection strategy, selected once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionMode {
    /// Merge runs of consecutive frames that share a semitone
    Consolidation,
    /// Segment at spectral-flux onsets, one pitch per inter-onset interval
    Onset,
    /// Harmonic salience peak-picking with independent pitch lanes
    Polyphonic,
}

impl TranscriptionMode {
    /// Short lowercase name (e.g., "consolidation")
    pub fn name(&self) -> &'static str {
        match self {
            TranscriptionMode::Consolidation => "consolidation",
            TranscriptionMode::Onset => "onset",
            TranscriptionMode::Polyphonic => "polyphonic",
        }
    }

    /// True when notes of different pitch may sound together
    pub fn is_polyphonic(&self) -> bool {
        matches!(self, TranscriptionMode::Polyphonic)
    }
}

/// Transcription configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Note detection strategy (default: Consolidation)
    pub mode: TranscriptionMode,

    // STFT parameters
    /// Analysis window length in samples (default: 2048)
    pub window_size: usize,

    /// Hop between frame starts in samples (default: 512)
    pub hop_size: usize,

    // Frame pitch estimation
    /// Fraction of the frame's maximum possible magnitude a bin must exceed (default: 0.1)
    pub magnitude_threshold: f32,

    /// Lowest frequency considered as a fundamental (default: 30.0 Hz)
    pub min_frequency_hz: f32,

    /// Highest frequency considered as a fundamental (default: 5000.0 Hz)
    pub max_frequency_hz: f32,

    // Segmentation
    /// Minimum note duration in seconds (default: 0.05)
    pub min_note_duration: f32,

    /// Optional maximum note duration in seconds (default: None)
    pub max_note_duration: Option<f32>,

    /// Lowest MIDI pitch kept (default: 21, A0)
    pub min_pitch: u8,

    /// Highest MIDI pitch kept (default: 108, C8)
    pub max_pitch: u8,

    /// MAD multiplier for the adaptive onset threshold (default: 1.5)
    pub onset_threshold_k: f32,

    // Polyphonic detection
    /// Maximum simultaneous pitches per frame (default: 6)
    pub max_polyphony: usize,

    /// Harmonics multiplied into the salience curve (default: 5)
    pub num_harmonics: usize,

    /// Salience peak threshold relative to the frame maximum (default: 0.3)
    pub salience_threshold: f32,

    /// Frames a pitch lane may go unobserved before it closes (default: 1)
    pub gap_tolerance_frames: usize,

    // Rhythm
    /// Minimum tempo considered (default: 50.0 BPM)
    pub min_bpm: f32,

    /// Maximum tempo considered (default: 200.0 BPM)
    pub max_bpm: f32,

    /// Caller-supplied tempo; skips tempo estimation when set (default: None)
    pub tempo_override: Option<f32>,

    /// Tempo substituted when detection is unreliable (default: 120.0)
    pub fallback_bpm: f32,

    /// Time signature substituted when detection is unreliable (default: 4/4)
    pub fallback_time_signature: TimeSignature,

    /// Tempo confidence below which the fallback grid is used (default: 0.1)
    pub tempo_confidence_threshold: f32,

    /// RMS level in dBFS below which a frame counts as silent (default: -40.0)
    pub silence_threshold_db: f32,

    /// Minimum silent span reported as a rest, in seconds (default: 0.25)
    pub min_rest_duration: f32,

    // Quantization
    /// Snap note timing to the beat grid (default: false)
    pub quantize: bool,

    /// Blend between original (0.0) and snapped (1.0) timing (default: 1.0)
    pub quantize_strength: f32,

    /// Grid subdivisions per beat, 4 = sixteenth notes (default: 4)
    pub grid_subdivisions: u32,

    /// Also snap note ends, not only onsets (default: true)
    pub quantize_durations: bool,

    // Dynamics
    /// Lowest velocity emitted (default: 60)
    pub min_velocity: u8,

    /// Highest velocity emitted (default: 100)
    pub max_velocity: u8,

    /// Moving-average width for velocity smoothing, in notes (default: 5)
    pub smoothing_window: usize,

    /// Slightly accent notes that start on a downbeat (default: false)
    pub accent_downbeats: bool,

    // Harmony
    /// Window length for key consistency analysis in seconds (default: 5.0)
    pub key_window_seconds: f32,

    /// Key confidence below which a low-confidence flag is raised (default: 0.1)
    pub key_confidence_threshold: f32,

    /// Chord analysis window in seconds (default: 0.5)
    pub chord_window_seconds: f32,

    /// Minimum template similarity for a chord to be recognised (default: 0.6)
    pub chord_threshold: f32,

    /// Build harmony from audio chroma instead of the note sequence (default: false)
    pub chroma_from_audio: bool,

    // Instrument
    /// Run the instrument classifier (default: true)
    pub classify_instrument: bool,

    /// Leading audio analysed by the instrument classifier, in seconds (default: 2.0)
    pub instrument_segment_seconds: f32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            mode: TranscriptionMode::Consolidation,
            window_size: 2048,
            hop_size: 512,
            magnitude_threshold: 0.1,
            min_frequency_hz: 30.0,
            max_frequency_hz: 5000.0,
            min_note_duration: 0.05,
            max_note_duration: None,
            min_pitch: 21,
            max_pitch: 108,
            onset_threshold_k: 1.5,
            max_polyphony: 6,
            num_harmonics: 5,
            salience_threshold: 0.3,
            gap_tolerance_frames: 1,
            min_bpm: 50.0,
            max_bpm: 200.0,
            tempo_override: None,
            fallback_bpm: 120.0,
            fallback_time_signature: TimeSignature::COMMON,
            tempo_confidence_threshold: 0.1,
            silence_threshold_db: -40.0,
            min_rest_duration: 0.25,
            quantize: false,
            quantize_strength: 1.0,
            grid_subdivisions: 4,
            quantize_durations: true,
            min_velocity: 60,
            max_velocity: 100,
            smoothing_window: 5,
            accent_downbeats: false,
            key_window_seconds: 5.0,
            key_confidence_threshold: 0.1,
            chord_window_seconds: 0.5,
            chord_threshold: 0.6,
            chroma_from_audio: false,
            classify_instrument: true,
            instrument_segment_seconds: 2.0,
        }
    }
}

fn invalid(msg: String) -> TranscriptionError {
    TranscriptionError::InvalidConfig(msg)
}

fn check_unit(name: &str, value: f32) -> Result<(), TranscriptionError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{} must be in [0.0, 1.0], got {}", name, value)));
    }
    Ok(())
}

fn check_positive(name: &str, value: f32) -> Result<(), TranscriptionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{} must be > 0, got {}", name, value)));
    }
    Ok(())
}

impl TranscriptionConfig {
    /// Reject out-of-range values before any processing starts
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::InvalidConfig` naming the first offending field
    pub fn validate(&self) -> Result<(), TranscriptionError> {
        if self.hop_size == 0 {
            return Err(invalid("hop_size must be > 0".to_string()));
        }
        if self.window_size < 64 {
            return Err(invalid(format!(
                "window_size must be >= 64, got {}",
                self.window_size
            )));
        }
        if self.window_size < self.hop_size {
            return Err(invalid(format!(
                "window_size ({}) must be >= hop_size ({})",
                self.window_size, self.hop_size
            )));
        }

        if !(self.magnitude_threshold > 0.0 && self.magnitude_threshold <= 1.0) {
            return Err(invalid(format!(
                "magnitude_threshold must be in (0.0, 1.0], got {}",
                self.magnitude_threshold
            )));
        }
        check_positive("min_frequency_hz", self.min_frequency_hz)?;
        check_positive("max_frequency_hz", self.max_frequency_hz)?;
        if self.min_frequency_hz >= self.max_frequency_hz {
            return Err(invalid(format!(
                "min_frequency_hz ({}) must be < max_frequency_hz ({})",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }

        if !self.min_note_duration.is_finite() || self.min_note_duration < 0.0 {
            return Err(invalid(format!(
                "min_note_duration must be >= 0, got {}",
                self.min_note_duration
            )));
        }
        if let Some(max) = self.max_note_duration {
            if !max.is_finite() || max <= self.min_note_duration {
                return Err(invalid(format!(
                    "max_note_duration ({}) must exceed min_note_duration ({})",
                    max, self.min_note_duration
                )));
            }
        }
        if self.min_pitch > self.max_pitch || self.max_pitch > 127 {
            return Err(invalid(format!(
                "pitch range {}..={} is not a valid MIDI range",
                self.min_pitch, self.max_pitch
            )));
        }
        if !self.onset_threshold_k.is_finite() || self.onset_threshold_k < 0.0 {
            return Err(invalid(format!(
                "onset_threshold_k must be >= 0, got {}",
                self.onset_threshold_k
            )));
        }

        if self.max_polyphony == 0 {
            return Err(invalid("max_polyphony must be >= 1".to_string()));
        }
        if !(1..=16).contains(&self.num_harmonics) {
            return Err(invalid(format!(
                "num_harmonics must be in 1..=16, got {}",
                self.num_harmonics
            )));
        }
        if !(self.salience_threshold > 0.0 && self.salience_threshold <= 1.0) {
            return Err(invalid(format!(
                "salience_threshold must be in (0.0, 1.0], got {}",
                self.salience_threshold
            )));
        }

        check_positive("min_bpm", self.min_bpm)?;
        check_positive("max_bpm", self.max_bpm)?;
        if self.min_bpm >= self.max_bpm {
            return Err(invalid(format!(
                "min_bpm ({}) must be < max_bpm ({})",
                self.min_bpm, self.max_bpm
            )));
        }
        if let Some(bpm) = self.tempo_override {
            check_positive("tempo_override", bpm)?;
        }
        check_positive("fallback_bpm", self.fallback_bpm)?;
        let ts = self.fallback_time_signature;
        if ts.numerator == 0 || !ts.denominator.is_power_of_two() {
            return Err(invalid(format!(
                "fallback_time_signature {}/{} is not a valid meter",
                ts.numerator, ts.denominator
            )));
        }
        check_unit("tempo_confidence_threshold", self.tempo_confidence_threshold)?;
        if !self.silence_threshold_db.is_finite() || self.silence_threshold_db >= 0.0 {
            return Err(invalid(format!(
                "silence_threshold_db must be < 0, got {}",
                self.silence_threshold_db
            )));
        }
        check_positive("min_rest_duration", self.min_rest_duration)?;

        check_unit("quantize_strength", self.quantize_strength)?;
        if self.grid_subdivisions == 0 {
            return Err(invalid("grid_subdivisions must be >= 1".to_string()));
        }

        if self.min_velocity == 0 || self.min_velocity > self.max_velocity || self.max_velocity > 127 {
            return Err(invalid(format!(
                "velocity range {}..={} must lie within 1..=127",
                self.min_velocity, self.max_velocity
            )));
        }
        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window must be >= 1".to_string()));
        }

        check_positive("key_window_seconds", self.key_window_seconds)?;
        check_unit("key_confidence_threshold", self.key_confidence_threshold)?;
        check_positive("chord_window_seconds", self.chord_window_seconds)?;
        check_unit("chord_threshold", self.chord_threshold)?;
        check_positive("instrument_segment_seconds", self.instrument_segment_seconds)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TranscriptionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_hop() {
        let config = TranscriptionConfig {
            hop_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TranscriptionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_quantize_strength_out_of_range() {
        for strength in [-0.1, 1.5, f32::NAN] {
            let config = TranscriptionConfig {
                quantize_strength: strength,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "strength {} accepted", strength);
        }
    }

    #[test]
    fn test_rejects_inverted_tempo_range() {
        let config = TranscriptionConfig {
            min_bpm: 180.0,
            max_bpm: 90.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_velocity_range() {
        let config = TranscriptionConfig {
            min_velocity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TranscriptionConfig {
            min_velocity: 110,
            max_velocity: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_window_smaller_than_hop() {
        let config = TranscriptionConfig {
            window_size: 256,
            hop_size: 512,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(TranscriptionMode::Consolidation.name(), "consolidation");
        assert_eq!(TranscriptionMode::Onset.name(), "onset");
        assert_eq!(TranscriptionMode::Polyphonic.name(), "polyphonic");
        assert!(TranscriptionMode::Polyphonic.is_polyphonic());
        assert!(!TranscriptionMode::Onset.is_polyphonic());
    }
}

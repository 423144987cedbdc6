//! Note detection and post-processing
//!
//! - Consolidation segmenter (runs of same-semitone frames)
//! - Onset segmenter (one pitch per inter-onset interval)
//! - Polyphonic detector (harmonic salience, independent pitch lanes)
//! - Post-processor (filtering, overlap resolution, quantization, dynamics)
//!
//! The detection strategy is chosen once per request from
//! [`TranscriptionMode`] by [`detect_notes`].

pub mod consolidation;
pub mod onset_segmenter;
pub mod polyphonic;
pub mod postprocess;

pub use consolidation::consolidate;
pub use onset_segmenter::segment_by_onsets;
pub use polyphonic::PolyphonicDetector;
pub use postprocess::{PostProcessor, Voicing};

use crate::config::{TranscriptionConfig, TranscriptionMode};
use crate::error::TranscriptionError;
use crate::features::onset::{onset_strength, pick_onsets};
use crate::features::pitch::{estimate_pitches, note_name, PitchEstimator};
use crate::features::spectrum::magnitude_spectrogram;
use crate::io::Signal;
use serde::{Deserialize, Serialize};

/// A discrete note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch (0-127)
    pub pitch: u8,

    /// Onset time in seconds
    pub onset: f32,

    /// Duration in seconds (> 0)
    pub duration: f32,

    /// MIDI velocity (1-127)
    pub velocity: u8,
}

impl Note {
    /// Create a note
    pub fn new(pitch: u8, onset: f32, duration: f32, velocity: u8) -> Self {
        Self {
            pitch,
            onset,
            duration,
            velocity,
        }
    }

    /// End time in seconds
    pub fn end(&self) -> f32 {
        self.onset + self.duration
    }

    /// Note name with octave (e.g., "C4")
    pub fn name(&self) -> String {
        note_name(self.pitch)
    }
}

/// Velocity from a linear amplitude estimate
pub(crate) fn amplitude_to_velocity(amplitude: f32) -> u8 {
    (amplitude * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Run the note-detection stage selected by `config.mode`
///
/// # Errors
///
/// Returns `TranscriptionError` for invalid stage parameters.
pub fn detect_notes(
    signal: &Signal<'_>,
    config: &TranscriptionConfig,
) -> Result<Vec<Note>, TranscriptionError> {
    let hop_seconds = config.hop_size as f32 / signal.sample_rate() as f32;
    log::debug!("Detecting notes ({} mode)", config.mode.name());

    let notes = match config.mode {
        TranscriptionMode::Consolidation => {
            let estimator = PitchEstimator::from_config(config);
            consolidate(estimator.track(signal), hop_seconds, config.min_note_duration)
        }
        TranscriptionMode::Onset => {
            let estimator = PitchEstimator::from_config(config);
            let observations = estimate_pitches(signal, &estimator);
            let spectrogram = magnitude_spectrogram(signal, config.window_size, config.hop_size);
            let strength = onset_strength(&spectrogram);
            let onsets = pick_onsets(
                &strength,
                1.0 / hop_seconds,
                config.onset_threshold_k,
                config.min_note_duration,
            )?;
            let onset_times: Vec<f32> = onsets.iter().map(|o| o.time_seconds).collect();
            segment_by_onsets(&observations, &onset_times, signal.duration_seconds())
        }
        TranscriptionMode::Polyphonic => PolyphonicDetector::from_config(config).detect(signal),
    };

    log::debug!("Detected {} raw notes", notes.len());
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_end_and_name() {
        let note = Note::new(69, 1.0, 0.5, 90);
        assert!((note.end() - 1.5).abs() < 1e-6);
        assert_eq!(note.name(), "A4");
    }

    #[test]
    fn test_amplitude_to_velocity() {
        assert_eq!(amplitude_to_velocity(0.0), 1);
        assert_eq!(amplitude_to_velocity(0.5), 64);
        assert_eq!(amplitude_to_velocity(2.0), 127);
    }
}

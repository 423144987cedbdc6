//! Harmonic analysis: key, key stability and chord progression
//!
//! Pitch-class histograms come from the final note sequence (duration
//! weighted) or, when `chroma_from_audio` is set or no notes were detected,
//! from STFT chroma of the signal.

use super::metadata::TranscriptionFlag;
use super::result::KeyEstimate;
use crate::config::TranscriptionConfig;
use crate::features::chords::{
    chord_notes, chord_windows, recognize_chords, Chord, ChordStatistics, ChordTemplates,
};
use crate::features::chroma::normalization::sharpen_chroma;
use crate::features::chroma::{chroma_from_notes, extract_chroma, sum_chroma, Chroma};
use crate::features::key::{detect_key, detect_key_changes, key_windows, KeyChange, KeyTemplates};
use crate::io::Signal;
use crate::transcription::Note;

/// Windowed keys must agree with the global key at least this often
const MIN_KEY_CONSISTENCY: f32 = 0.5;

/// Sharpening power applied to audio chroma before chord matching
const AUDIO_CHROMA_SHARPEN: f32 = 2.0;

/// Harmonic analysis outcome
#[derive(Debug, Clone)]
pub struct HarmonicAnalysis {
    /// Global key
    pub key: KeyEstimate,

    /// Share of windows agreeing with `key`
    pub key_consistency: f32,

    /// Modulations between consecutive windows
    pub key_changes: Vec<KeyChange>,

    /// Chord spans
    pub chords: Vec<Chord>,

    /// Chord statistics relative to `key`
    pub chord_statistics: ChordStatistics,

    /// Block-chord rendering of `chords`
    pub chord_notes: Vec<Note>,

    /// Low-confidence conditions
    pub flags: Vec<TranscriptionFlag>,
}

/// Where pitch-class histograms are read from
enum HistogramSource<'a> {
    Notes(&'a [Note]),
    Audio { frames: Vec<Chroma>, frame_period: f32 },
}

impl HistogramSource<'_> {
    fn histogram(&self, start: f32, end: f32) -> Chroma {
        match self {
            HistogramSource::Notes(notes) => chroma_from_notes(notes, start, end),
            HistogramSource::Audio {
                frames,
                frame_period,
            } => sum_chroma(
                frames
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| {
                        let t = *i as f32 * frame_period;
                        t >= start && t < end
                    })
                    .map(|(_, c)| c),
            ),
        }
    }

    fn chord_histogram(&self, start: f32, end: f32) -> Chroma {
        let histogram = self.histogram(start, end);
        match self {
            HistogramSource::Notes(_) => histogram,
            HistogramSource::Audio { .. } => sharpen_chroma(&histogram, AUDIO_CHROMA_SHARPEN),
        }
    }
}

/// Detect key, key stability and chords
///
/// # Arguments
///
/// * `notes` - Final note sequence
/// * `signal` - Source signal (used for audio chroma)
/// * `config` - Configuration (windows, thresholds, chroma source)
///
/// # Returns
///
/// Harmonic analysis; never fails. An empty histogram yields C major with
/// confidence 0 and the low-confidence flag.
pub fn analyze_harmony(
    notes: &[Note],
    signal: &Signal<'_>,
    config: &TranscriptionConfig,
) -> HarmonicAnalysis {
    let source = if config.chroma_from_audio || notes.is_empty() {
        log::debug!("Harmony from audio chroma");
        HistogramSource::Audio {
            frames: extract_chroma(signal, config.window_size, config.hop_size),
            frame_period: config.hop_size as f32 / signal.sample_rate() as f32,
        }
    } else {
        HistogramSource::Notes(notes)
    };

    let analysis_end = notes
        .iter()
        .map(|n| n.end())
        .fold(signal.duration_seconds(), f32::max);

    // Key
    let key_templates = KeyTemplates::new();
    let key = detect_key(&source.histogram(0.0, analysis_end), &key_templates).key;

    let segments: Vec<(f32, Chroma)> = key_windows(analysis_end, config.key_window_seconds)
        .into_iter()
        .map(|(start, end)| (start, source.histogram(start, end)))
        .collect();
    let key_result = detect_key_changes(&segments, &key, &key_templates);

    let mut flags = Vec::new();
    if key.confidence < config.key_confidence_threshold {
        log::warn!(
            "Key confidence {:.3} below threshold {:.3}; reporting best guess {}",
            key.confidence,
            config.key_confidence_threshold,
            key.name()
        );
        flags.push(TranscriptionFlag::LowKeyConfidence);
    }
    if key_result.segment_keys.len() > 1 && key_result.consistency < MIN_KEY_CONSISTENCY {
        log::warn!(
            "Key unstable across windows (consistency {:.2})",
            key_result.consistency
        );
        flags.push(TranscriptionFlag::UnstableKey);
    }

    // Chords
    let chord_templates = ChordTemplates::new();
    let windows: Vec<(f32, Chroma)> = chord_windows(analysis_end, config.chord_window_seconds)
        .into_iter()
        .map(|(start, end)| (start, source.chord_histogram(start, end)))
        .collect();
    let chords = recognize_chords(
        &windows,
        analysis_end,
        config.chord_threshold,
        &chord_templates,
    );
    let chord_statistics = ChordStatistics::compute(&chords, &key);
    let chord_notes = chord_notes(&chords);

    log::debug!(
        "Harmony: key {} (confidence {:.3}, consistency {:.2}), {} chords, tonal stability {:.2}",
        key.name(),
        key.confidence,
        key_result.consistency,
        chords.len(),
        chord_statistics.tonal_stability
    );

    HarmonicAnalysis {
        key,
        key_consistency: key_result.consistency,
        key_changes: key_result.key_changes,
        chords,
        chord_statistics,
        chord_notes,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::KeyMode;
    use crate::features::chords::ChordQuality;

    fn silent(seconds: f32) -> Vec<f32> {
        vec![0.0; (seconds * 44100.0) as usize]
    }

    #[test]
    fn test_harmony_from_notes() {
        // I - IV - V - I in C major, one second each
        let progression: [[u8; 3]; 4] = [[60, 64, 67], [65, 69, 72], [67, 71, 74], [60, 64, 67]];
        let mut notes = Vec::new();
        for (bar, chord) in progression.iter().enumerate() {
            for &pitch in chord {
                notes.push(Note::new(pitch, bar as f32, 1.0, 80));
            }
        }

        let samples = silent(4.0);
        let signal = Signal::new(&samples, 44100).unwrap();
        let config = TranscriptionConfig {
            chord_window_seconds: 0.5,
            ..Default::default()
        };
        let harmony = analyze_harmony(&notes, &signal, &config);

        assert_eq!(harmony.key.tonic, 0);
        assert_eq!(harmony.key.mode, KeyMode::Major);
        let names: Vec<String> = harmony.chords.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["C", "F", "G", "C"]);
        assert_eq!(harmony.chords[0].quality, ChordQuality::Major);
        assert_eq!(harmony.chord_statistics.tonal_stability, 1.0);
        assert_eq!(harmony.chord_notes.len(), 12);
    }

    #[test]
    fn test_harmony_empty_input_flags_low_confidence() {
        let samples = silent(1.0);
        let signal = Signal::new(&samples, 44100).unwrap();
        let harmony = analyze_harmony(&[], &signal, &TranscriptionConfig::default());

        assert_eq!(harmony.key.tonic, 0);
        assert_eq!(harmony.key.mode, KeyMode::Major);
        assert_eq!(harmony.key.confidence, 0.0);
        assert!(harmony.flags.contains(&TranscriptionFlag::LowKeyConfidence));
        assert!(harmony.chords.is_empty());
        assert_eq!(harmony.key_consistency, 1.0);
    }
}

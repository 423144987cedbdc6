//! Transcription result types

use super::instrument::InstrumentClassification;
use super::metadata::TranscriptionMetadata;
use crate::features::beat_tracking::{BeatPosition, TimeSignature};
use crate::features::chords::{Chord, ChordStatistics};
use crate::features::key::KeyChange;
use crate::preprocessing::silence::Rest;
use crate::transcription::Note;
use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Tempo, beat times and meter for one request
///
/// Tempo is in quarter notes per minute. Read-only once derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Tempo in BPM
    pub tempo_bpm: f32,

    /// Beat times in seconds, increasing
    pub beat_times: Vec<f32>,

    /// Meter
    pub time_signature: TimeSignature,
}

impl BeatGrid {
    /// Evenly spaced grid starting at 0 and covering `duration_seconds`
    ///
    /// Always contains at least the beat at 0.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_transcribe::analysis::result::BeatGrid;
    /// use stratum_transcribe::features::beat_tracking::TimeSignature;
    ///
    /// let grid = BeatGrid::regular(120.0, TimeSignature::COMMON, 2.0);
    /// assert_eq!(grid.beat_times, vec![0.0, 0.5, 1.0, 1.5]);
    /// ```
    pub fn regular(tempo_bpm: f32, time_signature: TimeSignature, duration_seconds: f32) -> Self {
        let period = 60.0 / tempo_bpm;
        let count = ((duration_seconds / period).ceil() as usize).max(1);
        let beat_times = (0..count).map(|i| i as f32 * period).collect();
        Self {
            tempo_bpm,
            beat_times,
            time_signature,
        }
    }

    /// Beat period in seconds
    pub fn beat_period(&self) -> f32 {
        60.0 / self.tempo_bpm
    }

    /// Mean spacing of the tracked beats, if at least two were tracked
    pub fn mean_beat_spacing(&self) -> Option<f32> {
        let (first, last) = (self.beat_times.first()?, self.beat_times.last()?);
        let gaps = self.beat_times.len() - 1;
        let spacing = (last - first) / gaps.max(1) as f32;
        (gaps > 0 && spacing > 0.0).then_some(spacing)
    }

    /// Length of one grid step with `subdivisions` steps per beat
    ///
    /// Steps divide the mean tracked beat spacing, or the tempo's beat period
    /// when fewer than two beats were tracked.
    pub fn subdivision(&self, subdivisions: u32) -> f32 {
        self.mean_beat_spacing().unwrap_or_else(|| self.beat_period()) / subdivisions.max(1) as f32
    }

    /// Tracked beat closest to `time` (the earlier one on a tie)
    pub fn nearest_beat(&self, time: f32) -> Option<f32> {
        let i = self.beat_times.partition_point(|&b| b < time);
        let after = self.beat_times.get(i).copied();
        let before = i.checked_sub(1).and_then(|j| self.beat_times.get(j)).copied();
        match (before, after) {
            (Some(b), Some(a)) => Some(if time - b <= a - time { b } else { a }),
            (b, a) => b.or(a),
        }
    }

    /// Nearest grid position to `time`
    ///
    /// The grid runs in [`BeatGrid::subdivision`] steps from the tracked beat
    /// nearest to `time`, so snapped times keep the phase of the beats. With
    /// fewer than two tracked beats it is anchored at 0. Never negative.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_transcribe::analysis::result::BeatGrid;
    /// use stratum_transcribe::features::beat_tracking::TimeSignature;
    ///
    /// let grid = BeatGrid {
    ///     tempo_bpm: 120.0,
    ///     beat_times: vec![0.1, 0.6, 1.1, 1.6],
    ///     time_signature: TimeSignature::COMMON,
    /// };
    /// assert!((grid.snap(0.62, 4) - 0.6).abs() < 1e-6);
    /// assert!((grid.snap(0.33, 4) - 0.35).abs() < 1e-6);
    /// ```
    pub fn snap(&self, time: f32, subdivisions: u32) -> f32 {
        let step = self.subdivision(subdivisions);
        if step.is_nan() || step <= 0.0 {
            return time;
        }
        let anchor = match self.mean_beat_spacing() {
            Some(_) => self.nearest_beat(time).unwrap_or(0.0),
            None => 0.0,
        };
        (anchor + ((time - anchor) / step).round() * step).max(0.0)
    }

    /// Measure length in seconds
    pub fn measure_duration(&self) -> f32 {
        self.beat_period() * self.time_signature.quarter_notes_per_measure()
    }

    /// Convert seconds to quarter notes at the grid tempo
    pub fn seconds_to_quarters(&self, seconds: f32) -> f32 {
        seconds / self.beat_period()
    }

    /// Downbeat times given the index of the first downbeat
    pub fn downbeats(&self, downbeat_offset: usize) -> Vec<f32> {
        let group = self.time_signature.beats_per_bar().max(1) as usize;
        self.beat_times
            .iter()
            .skip(downbeat_offset)
            .step_by(group)
            .copied()
            .collect()
    }

    /// Every beat labelled with its position in the bar
    pub fn positions(&self, downbeat_offset: usize) -> Vec<BeatPosition> {
        let group = self.time_signature.beats_per_bar().max(1) as usize;
        let shift = group - downbeat_offset % group;
        self.beat_times
            .iter()
            .enumerate()
            .map(|(i, &time_seconds)| BeatPosition {
                beat_index: ((i + shift) % group) as u32,
                time_seconds,
            })
            .collect()
    }
}

/// Major or minor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMode {
    /// Major (Ionian)
    Major,
    /// Natural minor (Aeolian)
    Minor,
}

/// Musical key with confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Tonic pitch class (0 = C, 1 = C#, ..., 11 = B)
    pub tonic: u8,

    /// Mode
    pub mode: KeyMode,

    /// Confidence (0.0-1.0)
    pub confidence: f32,
}

impl KeyEstimate {
    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_transcribe::analysis::result::{KeyEstimate, KeyMode};
    ///
    /// let key = KeyEstimate { tonic: 9, mode: KeyMode::Minor, confidence: 1.0 };
    /// assert_eq!(key.name(), "Am");
    /// ```
    pub fn name(&self) -> String {
        let note = NOTE_NAMES[self.tonic as usize % 12];
        match self.mode {
            KeyMode::Major => note.to_string(),
            KeyMode::Minor => format!("{}m", note),
        }
    }

    /// Pitch classes of the diatonic scale, tonic first
    pub fn scale(&self) -> [u8; 7] {
        let steps: [u8; 7] = match self.mode {
            KeyMode::Major => [0, 2, 4, 5, 7, 9, 11],
            KeyMode::Minor => [0, 2, 3, 5, 7, 8, 10],
        };
        steps.map(|s| (self.tonic + s) % 12)
    }

    /// True if `pitch_class` belongs to the key's scale
    pub fn is_diatonic(&self, pitch_class: u8) -> bool {
        self.scale().contains(&(pitch_class % 12))
    }
}

/// Summary of the transcribed material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicalStructure {
    /// Number of notes
    pub note_count: usize,

    /// Lowest and highest pitch, if any notes
    pub pitch_range: Option<(u8, u8)>,

    /// Mean note duration in quarter notes
    pub average_duration_quarters: f32,

    /// Measures spanned by the recording
    pub measure_count: usize,
}

impl MusicalStructure {
    /// Summarize notes against the beat grid
    pub fn summarize(notes: &[Note], beat_grid: &BeatGrid, duration_seconds: f32) -> Self {
        let pitch_range = notes.iter().map(|n| n.pitch).min().zip(notes.iter().map(|n| n.pitch).max());

        let average_duration_quarters = if notes.is_empty() {
            0.0
        } else {
            let total: f32 = notes.iter().map(|n| n.duration).sum();
            beat_grid.seconds_to_quarters(total / notes.len() as f32)
        };

        let end = notes
            .iter()
            .map(|n| n.end())
            .fold(duration_seconds, f32::max);
        let measure = beat_grid.measure_duration();
        let measure_count = if measure > 0.0 {
            (end / measure).ceil().max(1.0) as usize
        } else {
            1
        };

        Self {
            note_count: notes.len(),
            pitch_range,
            average_duration_quarters,
            measure_count,
        }
    }
}

/// Complete transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Final note sequence, sorted by onset
    pub notes: Vec<Note>,

    /// Beat grid
    pub beat_grid: BeatGrid,

    /// Index of the first downbeat in `beat_grid.beat_times`
    pub downbeat_offset: usize,

    /// Rest markers (silent spans)
    pub rests: Vec<Rest>,

    /// Detected key
    pub key: KeyEstimate,

    /// Share of analysis windows agreeing with `key` (0.0-1.0)
    pub key_consistency: f32,

    /// Key changes between consecutive analysis windows
    pub key_changes: Vec<KeyChange>,

    /// Chord progression, time ordered and non-overlapping
    pub chords: Vec<Chord>,

    /// Chord statistics
    pub chord_statistics: ChordStatistics,

    /// Block-chord notes for a separate harmony track
    pub chord_notes: Vec<Note>,

    /// Dominant instrument, if classification ran
    pub instrument: Option<InstrumentClassification>,

    /// Structure summary
    pub structure: MusicalStructure,

    /// Analysis metadata
    pub metadata: TranscriptionMetadata,
}

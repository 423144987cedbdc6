//! MIDI export plan
//!
//! Converts a [`TranscriptionResult`] into tick-based tracks at 960 ticks per
//! quarter note, with tempo and meter taken from the beat grid:
//!
//! - Melody track: final notes, program from the instrument classifier
//! - Chord track (optional): block chords from the harmonic analysis
//! - Metronome track (optional): kick on downbeats, closed hi-hat on other
//!   beats, on the percussion channel
//!
//! Within a track, notes of the same pitch never overlap.

use crate::analysis::result::TranscriptionResult;
use crate::error::TranscriptionError;
use crate::features::beat_tracking::TimeSignature;
use crate::transcription::Note;
use serde::{Deserialize, Serialize};

/// Ticks per quarter note
pub const TICKS_PER_QUARTER: u16 = 960;

/// Zero-based General MIDI percussion channel (channel 10)
pub const PERCUSSION_CHANNEL: u8 = 9;

const MELODY_CHANNEL: u8 = 0;
const CHORD_CHANNEL: u8 = 1;

const KICK: u8 = 36;
const KICK_VELOCITY: u8 = 40;
const KICK_SECONDS: f32 = 0.1;
const HI_HAT: u8 = 42;
const HI_HAT_VELOCITY: u8 = 20;
const HI_HAT_SECONDS: f32 = 0.05;

/// One note in tick units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiNoteEvent {
    /// MIDI pitch
    pub pitch: u8,
    /// Velocity (1-127)
    pub velocity: u8,
    /// Start tick
    pub start_tick: u32,
    /// Length in ticks (> 0)
    pub duration_ticks: u32,
}

impl MidiNoteEvent {
    /// Tick at which the note is released
    pub fn end_tick(&self) -> u32 {
        self.start_tick + self.duration_ticks
    }
}

/// One instrument track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiTrack {
    /// Track name
    pub name: String,
    /// Zero-based MIDI channel
    pub channel: u8,
    /// General MIDI program
    pub program: u8,
    /// Notes sorted by start tick
    pub notes: Vec<MidiNoteEvent>,
}

/// Optional tracks and overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MidiExportOptions {
    /// Add a metronome track
    pub metronome: bool,

    /// Add the block-chord track
    pub chord_track: bool,

    /// Program for the melody track instead of the classifier's
    pub program_override: Option<u8>,
}

/// Tick-based MIDI plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiExport {
    /// Resolution
    pub ticks_per_quarter: u16,

    /// Tempo in BPM
    pub tempo_bpm: f32,

    /// Meter
    pub time_signature: TimeSignature,

    /// Tracks in output order
    pub tracks: Vec<MidiTrack>,
}

/// Serializer for MIDI plans (e.g. a Standard MIDI File writer)
pub trait MidiWriter {
    /// Serialize a validated plan
    fn write_midi(&mut self, plan: &MidiExport) -> Result<(), TranscriptionError>;
}

impl MidiExport {
    /// Build a plan from a transcription result
    ///
    /// # Errors
    ///
    /// Returns the error of [`MidiExport::validate`] if the plan fails it.
    pub fn from_result(
        result: &TranscriptionResult,
        options: &MidiExportOptions,
    ) -> Result<Self, TranscriptionError> {
        let grid = &result.beat_grid;
        let mut plan = Self {
            ticks_per_quarter: TICKS_PER_QUARTER,
            tempo_bpm: grid.tempo_bpm,
            time_signature: grid.time_signature,
            tracks: Vec::new(),
        };

        let percussive = result
            .instrument
            .as_ref()
            .is_some_and(|c| c.instrument.is_percussion());
        let program = options.program_override.unwrap_or_else(|| {
            result
                .instrument
                .as_ref()
                .map(|c| c.instrument.gm_program())
                .unwrap_or(0)
        });
        let melody = plan.track_from_notes(
            "Transcription",
            if percussive { PERCUSSION_CHANNEL } else { MELODY_CHANNEL },
            program,
            &result.notes,
        );
        let melody_len = melody.notes.len();
        plan.tracks.push(melody);

        if options.chord_track && !result.chord_notes.is_empty() {
            let chords = plan.track_from_notes("Chords", CHORD_CHANNEL, 0, &result.chord_notes);
            plan.tracks.push(chords);
        }

        if options.metronome {
            let metronome = plan.metronome(result);
            // Clicks must stay below twice the melody note count
            if metronome.notes.len() < melody_len * 2 {
                plan.tracks.push(metronome);
            } else {
                log::debug!(
                    "Skipping metronome: {} clicks for {} notes",
                    metronome.notes.len(),
                    melody_len
                );
            }
        }

        plan.validate()?;
        log::debug!(
            "MIDI plan: {} tracks at {:.1} BPM {}",
            plan.tracks.len(),
            plan.tempo_bpm,
            plan.time_signature
        );
        Ok(plan)
    }

    /// Convert seconds to ticks at the plan tempo
    pub fn seconds_to_ticks(&self, seconds: f32) -> u32 {
        let quarters = seconds.max(0.0) * self.tempo_bpm / 60.0;
        (quarters * self.ticks_per_quarter as f32).round() as u32
    }

    /// Tempo as microseconds per quarter note (Set Tempo meta event)
    pub fn microseconds_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.tempo_bpm).round() as u32
    }

    /// Check structural invariants
    ///
    /// Every note lasts at least one tick, tracks are sorted by start tick,
    /// and notes of the same pitch in a track never overlap.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::NumericalError` for a non-finite or
    /// non-positive tempo, otherwise `TranscriptionError::ProcessingError`
    /// naming the first violation.
    pub fn validate(&self) -> Result<(), TranscriptionError> {
        if !self.tempo_bpm.is_finite() || self.tempo_bpm <= 0.0 {
            return Err(TranscriptionError::NumericalError(format!(
                "MIDI tempo must be finite and positive, got {} BPM",
                self.tempo_bpm
            )));
        }
        if self.ticks_per_quarter == 0 {
            return Err(TranscriptionError::ProcessingError(
                "MIDI resolution must be at least 1 tick per quarter".to_string(),
            ));
        }

        for track in &self.tracks {
            if track.channel > 15 || track.program > 127 {
                return Err(TranscriptionError::ProcessingError(format!(
                    "Track '{}' has channel {} / program {}",
                    track.name, track.channel, track.program
                )));
            }

            let mut last_end = [None::<u32>; 128];
            let mut last_start = 0u32;
            for note in &track.notes {
                if note.duration_ticks == 0 || note.pitch > 127 || note.velocity == 0 {
                    return Err(TranscriptionError::ProcessingError(format!(
                        "Track '{}' has an invalid note at tick {}",
                        track.name, note.start_tick
                    )));
                }
                if note.start_tick < last_start {
                    return Err(TranscriptionError::ProcessingError(format!(
                        "Track '{}' is not sorted at tick {}",
                        track.name, note.start_tick
                    )));
                }
                last_start = note.start_tick;

                let slot = &mut last_end[note.pitch as usize];
                if slot.is_some_and(|end| note.start_tick < end) {
                    return Err(TranscriptionError::ProcessingError(format!(
                        "Track '{}' overlaps pitch {} at tick {}",
                        track.name, note.pitch, note.start_tick
                    )));
                }
                *slot = Some(note.end_tick());
            }
        }
        Ok(())
    }

    /// Validate and hand the plan to a writer
    pub fn write_to<W: MidiWriter>(&self, writer: &mut W) -> Result<(), TranscriptionError> {
        self.validate()?;
        writer.write_midi(self)
    }

    fn track_from_notes(&self, name: &str, channel: u8, program: u8, notes: &[Note]) -> MidiTrack {
        let mut events: Vec<MidiNoteEvent> = notes
            .iter()
            .map(|note| {
                let start_tick = self.seconds_to_ticks(note.onset);
                let end_tick = self.seconds_to_ticks(note.end());
                MidiNoteEvent {
                    pitch: note.pitch.min(127),
                    velocity: note.velocity.clamp(1, 127),
                    start_tick,
                    duration_ticks: end_tick.saturating_sub(start_tick).max(1),
                }
            })
            .collect();
        events.sort_by_key(|e| (e.start_tick, e.pitch));

        MidiTrack {
            name: name.to_string(),
            channel,
            program,
            notes: events,
        }
    }

    fn metronome(&self, result: &TranscriptionResult) -> MidiTrack {
        let positions = result.beat_grid.positions(result.downbeat_offset);
        let notes = positions
            .iter()
            .enumerate()
            .map(|(i, beat)| {
                let (pitch, velocity, seconds) = if beat.beat_index == 0 {
                    (KICK, KICK_VELOCITY, KICK_SECONDS)
                } else {
                    (HI_HAT, HI_HAT_VELOCITY, HI_HAT_SECONDS)
                };
                // Never ring into the next click
                let seconds = positions
                    .get(i + 1)
                    .map(|next| seconds.min(next.time_seconds - beat.time_seconds))
                    .unwrap_or(seconds);
                let start_tick = self.seconds_to_ticks(beat.time_seconds);
                MidiNoteEvent {
                    pitch,
                    velocity,
                    start_tick,
                    duration_ticks: self
                        .seconds_to_ticks(beat.time_seconds + seconds)
                        .saturating_sub(start_tick)
                        .max(1),
                }
            })
            .collect();

        MidiTrack {
            name: "Metronome".to_string(),
            channel: PERCUSSION_CHANNEL,
            program: 0,
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metadata::TranscriptionMetadata;
    use crate::analysis::result::{BeatGrid, KeyEstimate, KeyMode, MusicalStructure};
    use crate::config::TranscriptionMode;
    use crate::features::chords::ChordStatistics;

    fn result_with(notes: Vec<Note>, duration: f32) -> TranscriptionResult {
        let beat_grid = BeatGrid::regular(120.0, TimeSignature::COMMON, duration);
        TranscriptionResult {
            structure: MusicalStructure::summarize(&notes, &beat_grid, duration),
            notes,
            beat_grid,
            downbeat_offset: 0,
            rests: vec![],
            key: KeyEstimate {
                tonic: 0,
                mode: KeyMode::Major,
                confidence: 1.0,
            },
            key_consistency: 1.0,
            key_changes: vec![],
            chords: vec![],
            chord_statistics: ChordStatistics::default(),
            chord_notes: vec![],
            instrument: None,
            metadata: TranscriptionMetadata::new(duration, 44100, TranscriptionMode::Consolidation),
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        written: Vec<MidiExport>,
    }

    impl MidiWriter for RecordingWriter {
        fn write_midi(&mut self, plan: &MidiExport) -> Result<(), TranscriptionError> {
            self.written.push(plan.clone());
            Ok(())
        }
    }

    #[test]
    fn test_ticks_at_120_bpm() {
        let result = result_with(vec![Note::new(60, 0.5, 0.25, 80)], 2.0);
        let plan = MidiExport::from_result(&result, &MidiExportOptions::default()).unwrap();
        assert_eq!(plan.ticks_per_quarter, 960);
        assert_eq!(plan.microseconds_per_quarter(), 500_000);
        let note = plan.tracks[0].notes[0];
        assert_eq!(note.start_tick, 960);
        assert_eq!(note.duration_ticks, 480);
        assert_eq!(plan.tracks[0].channel, 0);
    }

    #[test]
    fn test_metronome_track() {
        let notes: Vec<Note> = (0..8)
            .map(|i| Note::new(60 + i as u8, i as f32 * 0.25, 0.25, 80))
            .collect();
        let result = result_with(notes, 2.0);
        let options = MidiExportOptions {
            metronome: true,
            ..Default::default()
        };
        let plan = MidiExport::from_result(&result, &options).unwrap();
        assert_eq!(plan.tracks.len(), 2);

        let metronome = &plan.tracks[1];
        assert_eq!(metronome.channel, PERCUSSION_CHANNEL);
        let pitches: Vec<u8> = metronome.notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![KICK, HI_HAT, HI_HAT, HI_HAT]);
        assert_eq!(metronome.notes[0].velocity, KICK_VELOCITY);
        assert_eq!(metronome.notes[1].velocity, HI_HAT_VELOCITY);
    }

    #[test]
    fn test_metronome_skipped_for_sparse_music() {
        let result = result_with(vec![Note::new(60, 0.0, 0.5, 80)], 4.0);
        let options = MidiExportOptions {
            metronome: true,
            ..Default::default()
        };
        let plan = MidiExport::from_result(&result, &options).unwrap();
        assert_eq!(plan.tracks.len(), 1);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut plan = MidiExport::from_result(
            &result_with(vec![Note::new(60, 0.0, 0.5, 80)], 1.0),
            &MidiExportOptions::default(),
        )
        .unwrap();
        plan.tracks[0].notes.push(MidiNoteEvent {
            pitch: 60,
            velocity: 80,
            start_tick: 480,
            duration_ticks: 480,
        });
        assert!(matches!(
            plan.validate(),
            Err(TranscriptionError::ProcessingError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_tempo() {
        let mut plan = MidiExport::from_result(
            &result_with(vec![Note::new(60, 0.0, 0.5, 80)], 1.0),
            &MidiExportOptions::default(),
        )
        .unwrap();
        for tempo in [f32::NAN, f32::INFINITY, 0.0, -90.0] {
            plan.tempo_bpm = tempo;
            assert!(matches!(
                plan.validate(),
                Err(TranscriptionError::NumericalError(_))
            ));
        }

        plan.tempo_bpm = 120.0;
        plan.ticks_per_quarter = 0;
        assert!(matches!(
            plan.validate(),
            Err(TranscriptionError::ProcessingError(_))
        ));
    }

    #[test]
    fn test_write_to_writer() {
        let result = result_with(vec![Note::new(64, 0.0, 0.5, 90)], 1.0);
        let plan = MidiExport::from_result(&result, &MidiExportOptions::default()).unwrap();
        let mut writer = RecordingWriter::default();
        plan.write_to(&mut writer).unwrap();
        assert_eq!(writer.written.len(), 1);
        assert_eq!(writer.written[0], plan);
    }
}

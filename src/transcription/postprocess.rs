//! Note post-processing
//!
//! Runs, in order:
//!
//! 1. Duration and pitch-range filtering
//! 2. Overlap resolution within each lane (the earlier note is trimmed to end
//!    at the later onset; a note trimmed below the duration floor is dropped)
//! 3. Optional quantization to the subdivisions of the tracked beats, blended
//!    by strength, followed by a second overlap pass and floor filter
//! 4. Dynamics: velocity from pitch and local note density, moving-average
//!    smoothing, short-note softening, optional downbeat accent, clamping
//!
//! Every step is deterministic. A monophonic stream is one lane; in
//! polyphonic output each pitch is its own lane.

use super::Note;
use crate::analysis::result::BeatGrid;
use crate::config::TranscriptionConfig;
use std::collections::BTreeMap;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-6;

/// Notes shorter than this are softened
const SHORT_NOTE_SECONDS: f32 = 0.1;
const SHORT_NOTE_FACTOR: f32 = 0.8;

/// Accent for notes starting on a bar line
const DOWNBEAT_ACCENT: f32 = 1.1;

/// How notes are grouped into non-overlapping lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voicing {
    /// All notes share one lane
    Monophonic,
    /// One lane per pitch
    Polyphonic,
}

impl Voicing {
    fn lane(&self, note: &Note) -> u8 {
        match self {
            Voicing::Monophonic => 0,
            Voicing::Polyphonic => note.pitch,
        }
    }
}

/// Post-processor bound to one request's configuration and beat grid
#[derive(Debug, Clone, Copy)]
pub struct PostProcessor<'a> {
    config: &'a TranscriptionConfig,
    beat_grid: &'a BeatGrid,
    downbeat_offset: usize,
    voicing: Voicing,
}

impl<'a> PostProcessor<'a> {
    /// Create a post-processor
    pub fn new(
        config: &'a TranscriptionConfig,
        beat_grid: &'a BeatGrid,
        downbeat_offset: usize,
        voicing: Voicing,
    ) -> Self {
        Self {
            config,
            beat_grid,
            downbeat_offset,
            voicing,
        }
    }

    /// Run every post-processing step
    ///
    /// # Returns
    ///
    /// Final notes sorted by onset (then pitch)
    pub fn process(&self, notes: Vec<Note>) -> Vec<Note> {
        let config = self.config;
        let input = notes.len();

        let notes = self.filter(notes);
        let mut notes = resolve_overlaps(notes, self.voicing, config.min_note_duration);

        if config.quantize {
            notes = quantize_notes(
                notes,
                self.beat_grid,
                config.grid_subdivisions,
                config.quantize_strength,
                config.quantize_durations,
            );
            notes = resolve_overlaps(notes, self.voicing, config.min_note_duration);
            notes = self.filter(notes);
        }

        self.apply_dynamics(&mut notes);

        log::debug!(
            "Post-processing: {} notes in, {} notes out",
            input,
            notes.len()
        );
        notes
    }

    /// Drop notes outside the duration and pitch limits
    pub fn filter(&self, notes: Vec<Note>) -> Vec<Note> {
        let config = self.config;
        notes
            .into_iter()
            .filter(|n| n.duration > 0.0 && n.duration >= config.min_note_duration)
            .filter(|n| config.max_note_duration.is_none_or(|max| n.duration <= max))
            .filter(|n| (config.min_pitch..=config.max_pitch).contains(&n.pitch))
            .collect()
    }

    /// Assign velocities
    pub fn apply_dynamics(&self, notes: &mut [Note]) {
        if notes.is_empty() {
            return;
        }
        let config = self.config;
        let lo = config.min_velocity as f32;
        let hi = config.max_velocity as f32;
        let mid = (lo + hi) / 2.0;
        let window = config.smoothing_window.max(1);
        let half = window / 2;
        let n = notes.len();

        let raw: Vec<f32> = (0..n)
            .map(|i| {
                let note = &notes[i];
                let pitch_factor = (1.0 - (note.pitch as f32 - 60.0) / 60.0).clamp(0.7, 1.3);
                let neighbours = (i + half + 1).min(n) - i.saturating_sub(half);
                let density = neighbours as f32 / (window + 1) as f32;
                let density_factor = 1.0 / (1.0 + 0.2 * density);
                let base = match self.voicing {
                    Voicing::Monophonic => mid,
                    Voicing::Polyphonic => note.velocity as f32,
                };
                (base * pitch_factor * density_factor).clamp(lo, hi)
            })
            .collect();

        // Centred moving average, truncated at the phrase edges
        let smoothed: Vec<f32> = (0..n)
            .map(|i| {
                let span = &raw[i.saturating_sub(half)..(i + half + 1).min(n)];
                span.iter().sum::<f32>() / span.len() as f32
            })
            .collect();

        let bar_starts = if config.accent_downbeats {
            self.beat_grid.downbeats(self.downbeat_offset)
        } else {
            vec![]
        };
        let tolerance = 0.1 * self.beat_grid.beat_period();

        for (note, &velocity) in notes.iter_mut().zip(&smoothed) {
            let mut v = velocity;
            if note.duration < SHORT_NOTE_SECONDS {
                v *= SHORT_NOTE_FACTOR;
            }
            if bar_starts.iter().any(|&t| (note.onset - t).abs() <= tolerance) {
                v *= DOWNBEAT_ACCENT;
            }
            note.velocity = v.round().clamp(lo, hi) as u8;
        }
    }
}

/// Trim overlapping notes within each lane
///
/// The earlier of two overlapping notes is shortened to end at the later
/// onset; if that leaves it shorter than `min_duration` (or empty) it is
/// dropped. Output is sorted by onset, then pitch.
pub fn resolve_overlaps(notes: Vec<Note>, voicing: Voicing, min_duration: f32) -> Vec<Note> {
    let mut lanes: BTreeMap<u8, Vec<Note>> = BTreeMap::new();
    for note in notes {
        lanes.entry(voicing.lane(&note)).or_default().push(note);
    }

    let mut resolved = Vec::new();
    for (_, mut lane) in lanes {
        sort_notes(&mut lane);
        let mut kept: Vec<Note> = Vec::with_capacity(lane.len());
        for note in lane {
            if let Some(previous) = kept.last_mut() {
                if previous.end() > note.onset + EPSILON {
                    previous.duration = note.onset - previous.onset;
                    if previous.duration <= EPSILON || previous.duration < min_duration {
                        kept.pop();
                    }
                }
            }
            kept.push(note);
        }
        resolved.extend(kept);
    }

    sort_notes(&mut resolved);
    resolved
}

/// Snap note timing toward the beat grid
///
/// Each time moves toward [`BeatGrid::snap`] with `subdivisions` steps per
/// beat: `onset' = onset + strength·(snap(onset) - onset)`. With `durations`,
/// note ends move the same way. A note whose snapped span collapses keeps one
/// grid step.
///
/// # Example
///
/// ```
/// use stratum_transcribe::analysis::result::BeatGrid;
/// use stratum_transcribe::features::beat_tracking::TimeSignature;
/// use stratum_transcribe::transcription::postprocess::quantize_notes;
/// use stratum_transcribe::transcription::Note;
///
/// let grid = BeatGrid::regular(120.0, TimeSignature::COMMON, 2.0);
/// let notes = vec![Note::new(60, 0.49, 0.52, 80)];
/// let q = quantize_notes(notes, &grid, 4, 1.0, true);
/// assert!((q[0].onset - 0.5).abs() < 1e-6);
/// assert!((q[0].duration - 0.5).abs() < 1e-6);
/// ```
pub fn quantize_notes(
    notes: Vec<Note>,
    grid: &BeatGrid,
    subdivisions: u32,
    strength: f32,
    durations: bool,
) -> Vec<Note> {
    let step = grid.subdivision(subdivisions);
    if step.is_nan() || step <= 0.0 || strength <= 0.0 {
        return notes;
    }
    let snap = |t: f32| grid.snap(t, subdivisions);

    notes
        .into_iter()
        .map(|note| {
            let onset = (note.onset + strength * (snap(note.onset) - note.onset)).max(0.0);
            let duration = if durations {
                let end = note.end() + strength * (snap(note.end()) - note.end());
                if end - onset > EPSILON {
                    end - onset
                } else {
                    step
                }
            } else {
                note.duration
            };
            Note {
                onset,
                duration,
                ..note
            }
        })
        .collect()
}

fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        a.onset
            .partial_cmp(&b.onset)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.pitch.cmp(&b.pitch))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::beat_tracking::TimeSignature;

    fn grid() -> BeatGrid {
        BeatGrid::regular(120.0, TimeSignature::COMMON, 8.0)
    }

    #[test]
    fn test_filter_duration_and_range() {
        let config = TranscriptionConfig {
            max_note_duration: Some(2.0),
            ..Default::default()
        };
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        let notes = vec![
            Note::new(60, 0.0, 0.03, 80),
            Note::new(60, 0.1, 0.5, 80),
            Note::new(10, 0.7, 0.5, 80),
            Note::new(120, 1.3, 0.5, 80),
            Note::new(62, 2.0, 3.0, 80),
        ];
        let kept = processor.filter(notes);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].onset, 0.1);
    }

    #[test]
    fn test_resolve_overlaps_monophonic() {
        let notes = vec![
            Note::new(60, 0.0, 1.0, 80),
            Note::new(64, 0.5, 1.0, 80),
            Note::new(67, 0.52, 0.5, 80),
        ];
        let resolved = resolve_overlaps(notes, Voicing::Monophonic, 0.05);
        // 64 is trimmed to 0.02 s and dropped
        let pitches: Vec<u8> = resolved.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 67]);
        assert!((resolved[0].duration - 0.5).abs() < 1e-6);
        for pair in resolved.windows(2) {
            assert!(pair[1].onset >= pair[0].end() - 1e-6);
        }
    }

    #[test]
    fn test_resolve_overlaps_identical_onset() {
        let notes = vec![Note::new(60, 1.0, 0.5, 80), Note::new(62, 1.0, 0.4, 80)];
        let resolved = resolve_overlaps(notes, Voicing::Monophonic, 0.05);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pitch, 62);
    }

    #[test]
    fn test_resolve_overlaps_polyphonic_lanes() {
        let notes = vec![
            Note::new(60, 0.0, 1.0, 80),
            Note::new(64, 0.2, 1.0, 80),
            Note::new(60, 0.5, 1.0, 80),
        ];
        let resolved = resolve_overlaps(notes, Voicing::Polyphonic, 0.05);
        assert_eq!(resolved.len(), 3);
        let c4: Vec<&Note> = resolved.iter().filter(|n| n.pitch == 60).collect();
        assert!((c4[0].duration - 0.5).abs() < 1e-6);
        let e4 = resolved.iter().find(|n| n.pitch == 64).unwrap();
        assert!((e4.duration - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_full_strength() {
        let notes = vec![Note::new(60, 0.06, 0.45, 80), Note::new(62, 0.51, 0.2, 80)];
        let q = quantize_notes(notes, &grid(), 4, 1.0, true);
        assert!((q[0].onset - 0.0).abs() < 1e-6);
        assert!((q[0].end() - 0.5).abs() < 1e-6);
        assert!((q[1].onset - 0.5).abs() < 1e-6);
        assert!((q[1].end() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_partial_strength() {
        let notes = vec![Note::new(60, 0.1, 0.4, 80)];
        let q = quantize_notes(notes, &grid(), 4, 0.5, false);
        assert!((q[0].onset - 0.1125).abs() < 1e-6);
        assert!((q[0].duration - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_idempotent() {
        let notes = vec![
            Note::new(60, 0.07, 0.3, 80),
            Note::new(64, 0.61, 0.33, 80),
            Note::new(67, 1.13, 0.2, 80),
        ];
        let once = quantize_notes(notes, &grid(), 4, 1.0, true);
        let twice = quantize_notes(once.clone(), &grid(), 4, 1.0, true);
        for (a, b) in once.iter().zip(&twice) {
            assert!((a.onset - b.onset).abs() < 1e-6);
            assert!((a.duration - b.duration).abs() < 1e-6);
        }
    }

    #[test]
    fn test_quantize_collapsed_note_keeps_one_step() {
        let notes = vec![Note::new(60, 0.5, 0.03, 80)];
        let q = quantize_notes(notes, &grid(), 4, 1.0, true);
        assert!((q[0].duration - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_process_quantized_onsets_on_grid() {
        let config = TranscriptionConfig {
            quantize: true,
            ..Default::default()
        };
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        let notes = vec![
            Note::new(60, 0.02, 0.47, 80),
            Note::new(64, 0.49, 0.5, 80),
            Note::new(67, 1.03, 0.45, 80),
        ];
        let out = processor.process(notes);
        assert_eq!(out.len(), 3);
        for note in &out {
            let steps = note.onset / 0.125;
            assert!((steps - steps.round()).abs() < 1e-4);
        }
        for pair in out.windows(2) {
            assert!(pair[1].onset >= pair[0].end() - 1e-5);
        }
    }

    #[test]
    fn test_quantize_keeps_beat_phase() {
        let shifted = BeatGrid {
            tempo_bpm: 120.0,
            beat_times: (0..16).map(|k| 0.1 + 0.5 * k as f32).collect(),
            time_signature: TimeSignature::COMMON,
        };
        let notes = vec![
            Note::new(60, 0.1, 0.5, 80),
            Note::new(62, 0.6, 0.5, 80),
            Note::new(64, 1.33, 0.3, 80),
        ];
        let q = quantize_notes(notes, &shifted, 4, 1.0, true);
        assert!((q[0].onset - 0.1).abs() < 1e-5, "on-beat note moved to {}", q[0].onset);
        assert!((q[0].end() - 0.6).abs() < 1e-5);
        assert!((q[1].onset - 0.6).abs() < 1e-5);
        assert!((q[1].end() - 1.1).abs() < 1e-5);
        // 1.33 is 0.23 s after the beat at 1.1: two sixteenths
        assert!((q[2].onset - 1.35).abs() < 1e-5);
    }

    #[test]
    fn test_process_quantizes_to_shifted_beats() {
        let config = TranscriptionConfig {
            quantize: true,
            ..Default::default()
        };
        let shifted = BeatGrid {
            tempo_bpm: 120.0,
            beat_times: (0..16).map(|k| 0.1 + 0.5 * k as f32).collect(),
            time_signature: TimeSignature::COMMON,
        };
        let processor = PostProcessor::new(&config, &shifted, 0, Voicing::Monophonic);
        let notes = vec![
            Note::new(60, 0.12, 0.47, 80),
            Note::new(64, 0.58, 0.5, 80),
            Note::new(67, 1.23, 0.3, 80),
        ];
        let out = processor.process(notes);
        assert_eq!(out.len(), 3);
        for note in &out {
            let steps = (note.onset - 0.1) / 0.125;
            assert!((steps - steps.round()).abs() < 1e-3, "onset {}", note.onset);
        }
    }

    #[test]
    fn test_dynamics_within_range() {
        let config = TranscriptionConfig::default();
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        let mut notes: Vec<Note> = (0..12)
            .map(|i| Note::new(40 + 5 * i as u8, i as f32 * 0.25, if i % 3 == 0 { 0.05 } else { 0.2 }, 1))
            .collect();
        processor.apply_dynamics(&mut notes);
        for note in &notes {
            assert!((60..=100).contains(&note.velocity), "{}", note.velocity);
        }
    }

    #[test]
    fn test_dynamics_lower_pitch_louder() {
        let config = TranscriptionConfig::default();
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        // A low run then a high run, far enough apart that smoothing can't mix them
        let mut notes: Vec<Note> = (0..12)
            .map(|i| Note::new(if i < 6 { 48 } else { 96 }, i as f32 * 0.5, 0.4, 1))
            .collect();
        processor.apply_dynamics(&mut notes);
        assert!(notes[0].velocity > notes[11].velocity);
    }

    #[test]
    fn test_dynamics_smooths_short_phrase() {
        let config = TranscriptionConfig::default();
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        // Every note lies inside every other note's smoothing window
        let mut notes = vec![
            Note::new(40, 0.0, 0.4, 1),
            Note::new(60, 0.5, 0.4, 1),
            Note::new(100, 1.0, 0.4, 1),
        ];
        processor.apply_dynamics(&mut notes);
        assert_eq!(notes[0].velocity, notes[1].velocity);
        assert_eq!(notes[1].velocity, notes[2].velocity);
    }

    #[test]
    fn test_dynamics_downbeat_accent() {
        let config = TranscriptionConfig {
            accent_downbeats: true,
            ..Default::default()
        };
        let grid = grid();
        let processor = PostProcessor::new(&config, &grid, 0, Voicing::Monophonic);
        // Same pitch, one on the bar line at 2.0 s and one off it
        let mut notes = vec![Note::new(72, 1.5, 0.4, 1), Note::new(72, 2.0, 0.4, 1)];
        processor.apply_dynamics(&mut notes);
        assert!(notes[1].velocity > notes[0].velocity);
    }
}

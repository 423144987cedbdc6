//! Consolidation segmenter
//!
//! Merges maximal runs of consecutive frames whose frequency rounds to the same
//! semitone into one note. The pitch stream is consumed in a single pass, so a
//! lazy [`crate::features::pitch::PitchTrack`] can be fed in directly.
//!
//! - onset = time of the first frame in the run
//! - duration = (time of the last frame + hop) - onset
//! - runs shorter than the minimum duration are discarded
//!
//! Notes produced this way never overlap: each frame belongs to at most one run.

use super::{amplitude_to_velocity, Note};
use crate::features::pitch::PitchObservation;

/// An open run of same-pitch frames
#[derive(Debug, Clone, Copy)]
pub(crate) struct NoteRun {
    pub pitch: u8,
    pub start_time: f32,
    pub last_time: f32,
    pub level_sum: f32,
    pub frames: u32,
}

impl NoteRun {
    pub fn start(pitch: u8, time: f32, level: f32) -> Self {
        Self {
            pitch,
            start_time: time,
            last_time: time,
            level_sum: level,
            frames: 1,
        }
    }

    pub fn extend(&mut self, time: f32, level: f32) {
        self.last_time = time;
        self.level_sum += level;
        self.frames += 1;
    }

    pub fn mean_level(&self) -> f32 {
        self.level_sum / self.frames.max(1) as f32
    }

    /// Close the run into a note, or `None` if it is shorter than `min_duration`
    pub fn finish(&self, hop_seconds: f32, min_duration: f32, velocity: u8) -> Option<Note> {
        let duration = self.last_time + hop_seconds - self.start_time;
        (duration >= min_duration && duration > 0.0)
            .then(|| Note::new(self.pitch, self.start_time, duration, velocity))
    }
}

/// Consolidate a pitch stream into notes
///
/// # Arguments
///
/// * `observations` - Time-ordered per-frame pitch observations
/// * `hop_seconds` - Hop between frames in seconds
/// * `min_duration` - Minimum note duration in seconds
///
/// # Returns
///
/// Notes in time order. Velocity follows the mean amplitude of the run.
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::pitch::PitchObservation;
/// use stratum_transcribe::transcription::consolidate;
///
/// let obs = |time, hz| PitchObservation { time, frequency_hz: hz, magnitude: 0.5, confidence: 0.8 };
/// let stream = vec![obs(0.0, Some(440.0)), obs(0.1, Some(441.0)), obs(0.2, None)];
/// let notes = consolidate(stream, 0.1, 0.05);
/// assert_eq!(notes.len(), 1);
/// assert_eq!(notes[0].pitch, 69);
/// assert!((notes[0].duration - 0.2).abs() < 1e-6);
/// ```
pub fn consolidate<I>(observations: I, hop_seconds: f32, min_duration: f32) -> Vec<Note>
where
    I: IntoIterator<Item = PitchObservation>,
{
    let mut notes = Vec::new();
    let mut current: Option<NoteRun> = None;

    let close = |run: NoteRun, notes: &mut Vec<Note>| {
        if let Some(note) = run.finish(
            hop_seconds,
            min_duration,
            amplitude_to_velocity(run.mean_level()),
        ) {
            notes.push(note);
        }
    };

    for obs in observations {
        match (obs.semitone(), current.as_mut()) {
            (Some(pitch), Some(run)) if run.pitch == pitch => run.extend(obs.time, obs.magnitude),
            (Some(pitch), _) => {
                if let Some(run) = current.take() {
                    close(run, &mut notes);
                }
                current = Some(NoteRun::start(pitch, obs.time, obs.magnitude));
            }
            (None, _) => {
                if let Some(run) = current.take() {
                    close(run, &mut notes);
                }
            }
        }
    }
    if let Some(run) = current {
        close(run, &mut notes);
    }

    log::debug!("Consolidated {} notes", notes.len());
    notes
}

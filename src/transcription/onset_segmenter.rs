//! Onset-based segmenter
//!
//! Splits the pitch stream at detected onsets. Each inter-onset interval
//! becomes at most one note whose pitch is the most frequent semitone among the
//! interval's observations; ties go to the semitone that occurred first.
//!
//! - duration = next onset - this onset
//! - the last interval extends to the end of the signal
//! - intervals without voiced frames emit nothing
//!
//! Intervals are disjoint, so the notes never overlap.

use super::{amplitude_to_velocity, Note};
use crate::features::pitch::PitchObservation;
use std::collections::HashMap;

/// Segment a pitch stream at onset boundaries
///
/// # Arguments
///
/// * `observations` - Time-ordered per-frame pitch observations
/// * `onsets` - Onset times in seconds, increasing
/// * `signal_end` - End time of the signal in seconds
///
/// # Returns
///
/// One note per voiced interval, in time order.
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::pitch::PitchObservation;
/// use stratum_transcribe::transcription::segment_by_onsets;
///
/// let obs = |time, hz| PitchObservation { time, frequency_hz: Some(hz), magnitude: 0.5, confidence: 0.8 };
/// let stream = vec![obs(0.0, 440.0), obs(0.1, 440.0), obs(0.2, 494.0), obs(0.3, 494.0)];
/// let notes = segment_by_onsets(&stream, &[0.0, 0.2], 0.4);
/// assert_eq!(notes.iter().map(|n| n.pitch).collect::<Vec<_>>(), vec![69, 71]);
/// ```
pub fn segment_by_onsets(
    observations: &[PitchObservation],
    onsets: &[f32],
    signal_end: f32,
) -> Vec<Note> {
    let mut notes = Vec::new();

    for (i, &start) in onsets.iter().enumerate() {
        let end = onsets.get(i + 1).copied().unwrap_or(signal_end);
        if end <= start {
            continue;
        }

        let interval = observations
            .iter()
            .filter(|obs| obs.time >= start && obs.time < end);

        // pitch -> (votes, first position, amplitude sum)
        let mut votes: HashMap<u8, (u32, usize, f32)> = HashMap::new();
        for (position, obs) in interval.enumerate() {
            if let Some(pitch) = obs.semitone() {
                let entry = votes.entry(pitch).or_insert((0, position, 0.0));
                entry.0 += 1;
                entry.2 += obs.magnitude;
            }
        }

        let winner = votes
            .into_iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)));

        if let Some((pitch, (count, _, amplitude_sum))) = winner {
            let velocity = amplitude_to_velocity(amplitude_sum / count as f32);
            notes.push(Note::new(pitch, start, end - start, velocity));
        }
    }

    log::debug!(
        "Segmented {} notes from {} onsets",
        notes.len(),
        onsets.len()
    );
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::midi_to_hz;

    fn stream(pitches: &[Option<u8>], hop: f32) -> Vec<PitchObservation> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, p)| PitchObservation {
                time: i as f32 * hop,
                frequency_hz: p.map(|p| midi_to_hz(p as f32)),
                magnitude: 0.5,
                confidence: 0.8,
            })
            .collect()
    }

    #[test]
    fn test_majority_vote_per_interval() {
        let pitches = [
            Some(60), Some(61), Some(60), Some(60), Some(64), Some(64), Some(65), Some(64),
        ];
        let notes = segment_by_onsets(&stream(&pitches, 0.1), &[0.0, 0.4], 0.8);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 60);
        assert!((notes[0].duration - 0.4).abs() < 1e-6);
        assert_eq!(notes[1].pitch, 64);
        assert!((notes[1].end() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let pitches = [Some(62), Some(60), Some(60), Some(62)];
        let notes = segment_by_onsets(&stream(&pitches, 0.1), &[0.0], 0.4);
        assert_eq!(notes[0].pitch, 62);
    }

    #[test]
    fn test_unvoiced_interval_skipped() {
        let pitches = [Some(60), Some(60), None, None, Some(67)];
        let notes = segment_by_onsets(&stream(&pitches, 0.1), &[0.0, 0.2, 0.4], 0.5);
        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 67]);
    }

    #[test]
    fn test_no_onsets_no_notes() {
        let pitches = [Some(60); 5];
        assert!(segment_by_onsets(&stream(&pitches, 0.1), &[], 0.5).is_empty());
    }
}

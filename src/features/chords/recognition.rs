//! Chord progression recognition
//!
//! # Algorithm
//!
//! 1. Split the recording into consecutive windows of `chord_window_seconds`
//! 2. Match each window's histogram to the best chord template
//! 3. Windows below the similarity threshold produce no chord
//! 4. A chord span runs from its first window until the next different chord;
//!    the last span ends at the analysed end

use super::templates::{ChordMatch, ChordTemplates};
use super::Chord;
use crate::features::chroma::Chroma;
use crate::transcription::Note;

/// Octave-4 base pitch for block chords (middle C)
const BLOCK_CHORD_BASE: u8 = 60;

/// Consecutive `(start, end)` windows covering `[0, duration_seconds)`
pub fn chord_windows(duration_seconds: f32, window_seconds: f32) -> Vec<(f32, f32)> {
    if duration_seconds <= 0.0 || window_seconds <= 0.0 {
        return Vec::new();
    }
    let count = (duration_seconds / window_seconds).ceil() as usize;
    (0..count)
        .map(|i| {
            let start = i as f32 * window_seconds;
            (start, (start + window_seconds).min(duration_seconds))
        })
        .filter(|(start, end)| end > start)
        .collect()
}

/// Recognize a chord progression from windowed histograms
///
/// # Arguments
///
/// * `windows` - Window start time and histogram, time ordered
/// * `analysis_end` - End of the analysed material in seconds
/// * `threshold` - Minimum cosine similarity for a window to carry a chord
/// * `templates` - Chord templates
///
/// # Returns
///
/// Time-ordered, non-overlapping chord spans. Adjacent spans always differ.
pub fn recognize_chords(
    windows: &[(f32, Chroma)],
    analysis_end: f32,
    threshold: f32,
    templates: &ChordTemplates,
) -> Vec<Chord> {
    let labelled: Vec<(f32, ChordMatch)> = windows
        .iter()
        .filter_map(|(time, chroma)| {
            templates
                .best_match(chroma)
                .filter(|m| m.similarity >= threshold)
                .map(|m| (*time, m))
        })
        .collect();

    let mut chords: Vec<Chord> = Vec::new();
    // Similarities of the windows merged into the open span
    let mut similarities: Vec<f32> = Vec::new();

    for (time, m) in labelled {
        if let Some(open) = chords.last_mut() {
            if open.root == m.root && open.quality == m.quality {
                similarities.push(m.similarity);
                continue;
            }
            open.end = time;
            open.confidence = mean(&similarities);
        }
        similarities.clear();
        similarities.push(m.similarity);
        chords.push(Chord {
            root: m.root,
            quality: m.quality,
            start: time,
            end: time,
            confidence: m.similarity,
        });
    }

    if let Some(last) = chords.last_mut() {
        last.end = analysis_end.max(last.start);
        last.confidence = mean(&similarities);
    }
    chords.retain(|c| c.end > c.start);

    log::debug!("Recognized {} chord spans", chords.len());
    chords
}

/// Block-chord notes for a progression
///
/// Each chord is voiced from `60 + root` with velocity `confidence × 100`.
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::chords::{chord_notes, Chord, ChordQuality};
///
/// let chords = [Chord { root: 7, quality: ChordQuality::Major, start: 0.0, end: 2.0, confidence: 0.9 }];
/// let notes = chord_notes(&chords);
/// let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
/// assert_eq!(pitches, vec![67, 71, 74]);
/// assert_eq!(notes[0].velocity, 90);
/// ```
pub fn chord_notes(chords: &[Chord]) -> Vec<Note> {
    chords
        .iter()
        .flat_map(|chord| {
            let velocity = (chord.confidence * 100.0).round().clamp(1.0, 127.0) as u8;
            chord
                .pitches(BLOCK_CHORD_BASE)
                .into_iter()
                .map(move |pitch| Note::new(pitch, chord.start, chord.duration(), velocity))
        })
        .collect()
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chords::ChordQuality;

    fn chroma_of(pcs: &[usize]) -> Chroma {
        let mut chroma = [0.0f32; 12];
        for &pc in pcs {
            chroma[pc] = 1.0;
        }
        chroma
    }

    #[test]
    fn test_chord_windows() {
        assert_eq!(chord_windows(1.2, 0.5), vec![(0.0, 0.5), (0.5, 1.0), (1.0, 1.2)]);
        assert!(chord_windows(0.0, 0.5).is_empty());
    }

    #[test]
    fn test_recognize_progression() {
        let templates = ChordTemplates::new();
        let c = chroma_of(&[0, 4, 7]);
        let f = chroma_of(&[5, 9, 0]);
        let g = chroma_of(&[7, 11, 2]);
        let windows = vec![(0.0, c), (0.5, c), (1.0, f), (1.5, g), (2.0, c)];

        let chords = recognize_chords(&windows, 2.5, 0.6, &templates);
        let names: Vec<String> = chords.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["C", "F", "G", "C"]);
        assert_eq!(chords[0].start, 0.0);
        assert_eq!(chords[0].end, 1.0);
        assert_eq!(chords[3].end, 2.5);
        for pair in chords.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_recognize_skips_weak_windows() {
        let templates = ChordTemplates::new();
        let c = chroma_of(&[0, 4, 7]);
        // Chromatic cluster matches no template well
        let noise = [1.0f32; 12];
        let windows = vec![(0.0, c), (0.5, noise), (1.0, c)];

        let chords = recognize_chords(&windows, 1.5, 0.6, &templates);
        assert_eq!(chords.len(), 1);
        assert_eq!(chords[0].quality, ChordQuality::Major);
        assert_eq!(chords[0].end, 1.5);
    }

    #[test]
    fn test_recognize_empty() {
        let templates = ChordTemplates::new();
        assert!(recognize_chords(&[], 1.0, 0.6, &templates).is_empty());
        assert!(recognize_chords(&[(0.0, [0.0; 12])], 1.0, 0.6, &templates).is_empty());
    }

    #[test]
    fn test_chord_notes_seventh() {
        let chords = [Chord {
            root: 2,
            quality: ChordQuality::Minor7,
            start: 1.0,
            end: 1.5,
            confidence: 0.004,
        }];
        let notes = chord_notes(&chords);
        assert_eq!(notes.len(), 4);
        assert_eq!(notes[0].pitch, 62);
        assert_eq!(notes[3].pitch, 72);
        assert_eq!(notes[0].velocity, 1);
        assert!((notes[0].duration - 0.5).abs() < 1e-6);
    }
}

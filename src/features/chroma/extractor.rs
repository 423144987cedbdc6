//! Chroma vector extraction
//!
//! Audio chroma folds STFT bin energy onto pitch classes using an
//! equal-tempered mapping with A4 = 440 Hz. Note chroma accumulates each
//! note's sounding time inside a window on its pitch class.

use super::Chroma;
use crate::features::pitch::hz_to_midi;
use crate::features::spectrum::SpectrumAnalyzer;
use crate::io::Signal;
use crate::transcription::Note;

/// Lowest frequency folded into audio chroma (A1)
const MIN_CHROMA_HZ: f32 = 55.0;

/// Highest frequency folded into audio chroma
const MAX_CHROMA_HZ: f32 = 5000.0;

/// Extract chroma vectors from a signal
///
/// # Arguments
///
/// * `signal` - Input signal
/// * `frame_size` - FFT frame size (e.g., 2048)
/// * `hop_size` - Hop size (e.g., 512)
///
/// # Returns
///
/// One chroma vector of squared magnitudes per frame (unnormalized)
///
/// # Example
///
/// ```no_run
/// use stratum_transcribe::features::chroma::extract_chroma;
/// use stratum_transcribe::io::Signal;
///
/// let samples = vec![0.0f32; 44100 * 5];
/// let signal = Signal::new(&samples, 44100)?;
/// let chroma = extract_chroma(&signal, 2048, 512);
/// # Ok::<(), stratum_transcribe::TranscriptionError>(())
/// ```
pub fn extract_chroma(signal: &Signal<'_>, frame_size: usize, hop_size: usize) -> Vec<Chroma> {
    let sample_rate = signal.sample_rate();
    let mut analyzer = SpectrumAnalyzer::new(frame_size);

    // Pitch class of every bin in the chroma band
    let bin_classes: Vec<Option<usize>> = (0..analyzer.num_bins())
        .map(|bin| {
            let hz = analyzer.bin_frequency(bin as f32, sample_rate);
            (MIN_CHROMA_HZ..=MAX_CHROMA_HZ)
                .contains(&hz)
                .then(|| (hz_to_midi(hz).round() as i32).rem_euclid(12) as usize)
        })
        .collect();

    log::debug!(
        "Extracting chroma: {} samples at {} Hz",
        signal.len(),
        sample_rate
    );

    signal
        .frames(frame_size, hop_size)
        .map(|frame| {
            let spectrum = analyzer.analyze(frame.samples);
            let mut chroma = [0.0f32; 12];
            for (mag, class) in spectrum.magnitudes.iter().zip(&bin_classes) {
                if let Some(pc) = class {
                    chroma[*pc] += mag * mag;
                }
            }
            chroma
        })
        .collect()
}

/// Duration-weighted pitch-class histogram of notes inside `[start, end)`
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::chroma::chroma_from_notes;
/// use stratum_transcribe::transcription::Note;
///
/// let notes = [Note::new(60, 0.0, 1.0, 80), Note::new(67, 0.5, 1.0, 80)];
/// let chroma = chroma_from_notes(&notes, 0.0, 1.0);
/// assert_eq!(chroma[0], 1.0);
/// assert_eq!(chroma[7], 0.5);
/// ```
pub fn chroma_from_notes(notes: &[Note], start: f32, end: f32) -> Chroma {
    let mut chroma = [0.0f32; 12];
    for note in notes {
        let overlap = note.end().min(end) - note.onset.max(start);
        if overlap > 0.0 {
            chroma[(note.pitch % 12) as usize] += overlap;
        }
    }
    chroma
}

/// Sum a run of chroma vectors
pub fn sum_chroma<'a, I>(vectors: I) -> Chroma
where
    I: IntoIterator<Item = &'a Chroma>,
{
    let mut total = [0.0f32; 12];
    for chroma in vectors {
        for (acc, &x) in total.iter_mut().zip(chroma) {
            *acc += x;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::midi_to_hz;
    use std::f32::consts::PI;

    #[test]
    fn test_audio_chroma_of_a4() {
        let sample_rate = 44100;
        let freq = midi_to_hz(69.0);
        let samples: Vec<f32> = (0..8192)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        let signal = Signal::new(&samples, sample_rate).unwrap();
        let frames = extract_chroma(&signal, 4096, 2048);
        let total = sum_chroma(&frames);
        let best = total
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0;
        assert_eq!(best, 9);
    }

    #[test]
    fn test_silent_chroma_is_zero() {
        let samples = vec![0.0f32; 4096];
        let signal = Signal::new(&samples, 44100).unwrap();
        let frames = extract_chroma(&signal, 2048, 1024);
        assert!(frames.iter().all(|c| c.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_note_chroma_window_clipping() {
        let notes = [Note::new(62, 0.8, 1.0, 80), Note::new(74, 1.5, 0.2, 80)];
        let chroma = chroma_from_notes(&notes, 1.0, 2.0);
        assert!((chroma[2] - 1.0).abs() < 1e-5);
        assert!(chroma.iter().enumerate().all(|(i, &x)| i == 2 || x == 0.0));
    }

    #[test]
    fn test_sum_chroma() {
        let mut a = [0.0f32; 12];
        a[0] = 1.0;
        let mut b = [0.0f32; 12];
        b[0] = 2.0;
        b[5] = 1.0;
        let total = sum_chroma(&[a, b]);
        assert_eq!(total[0], 3.0);
        assert_eq!(total[5], 1.0);
    }
}

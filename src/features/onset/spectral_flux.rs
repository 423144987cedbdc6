//! Spectral flux onset strength
//!
//! Measures frame-to-frame increases in log-compressed spectral magnitude.
//!
//! # Algorithm
//!
//! 1. Compress magnitudes: `Y[k] = ln(1 + γ·|X[k]|)` with γ = 100
//! 2. Half-wave rectified difference against the previous frame:
//!    `flux[n] = Σ max(0, Y_n[k] - Y_{n-1}[k])`
//! 3. The first frame is compared against silence, so a signal that starts
//!    with a note has an onset at t = 0
//!
//! # Example
//!
//! ```no_run
//! use stratum_transcribe::features::onset::spectral_flux::onset_strength_from_signal;
//! use stratum_transcribe::io::Signal;
//!
//! let samples = vec![0.0f32; 44100];
//! let signal = Signal::new(&samples, 44100)?;
//! let strength = onset_strength_from_signal(&signal, 2048, 512);
//! println!("{} frames", strength.len());
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

use crate::features::spectrum::magnitude_spectrogram;
use crate::io::Signal;

/// Log compression factor
const COMPRESSION: f32 = 100.0;

/// Onset strength from a precomputed magnitude spectrogram
///
/// # Arguments
///
/// * `spectrogram` - Magnitude spectrogram (n_frames × n_bins)
///
/// # Returns
///
/// One non-negative strength value per frame
pub fn onset_strength(spectrogram: &[Vec<f32>]) -> Vec<f32> {
    let mut strength = Vec::with_capacity(spectrogram.len());
    let mut previous: Vec<f32> = Vec::new();

    for frame in spectrogram {
        let compressed: Vec<f32> = frame
            .iter()
            .map(|&m| (1.0 + COMPRESSION * m).ln())
            .collect();

        let flux: f32 = compressed
            .iter()
            .enumerate()
            .map(|(k, &y)| (y - previous.get(k).copied().unwrap_or(0.0)).max(0.0))
            .sum();

        strength.push(flux);
        previous = compressed;
    }

    log::debug!("Computed onset strength over {} frames", strength.len());
    strength
}

/// Onset strength computed directly from a signal
pub fn onset_strength_from_signal(
    signal: &Signal<'_>,
    window_size: usize,
    hop_size: usize,
) -> Vec<f32> {
    onset_strength(&magnitude_spectrogram(signal, window_size, hop_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_silence_is_zero() {
        let spec = vec![vec![0.0f32; 16]; 10];
        let strength = onset_strength(&spec);
        assert_eq!(strength.len(), 10);
        assert!(strength.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_flux_peaks_at_energy_increase() {
        let mut spec = vec![vec![0.0f32; 16]; 10];
        for frame in spec.iter_mut().skip(5) {
            frame[3] = 1.0;
        }
        let strength = onset_strength(&spec);
        let peak = strength
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc })
            .0;
        assert_eq!(peak, 5);
        // Sustained energy produces no further flux
        assert_eq!(strength[7], 0.0);
    }

    #[test]
    fn test_flux_ignores_decrease() {
        let mut spec = vec![vec![1.0f32; 8]; 4];
        spec[2] = vec![0.0; 8];
        let strength = onset_strength(&spec);
        assert_eq!(strength[1], 0.0);
        assert_eq!(strength[2], 0.0);
        assert!(strength[3] > 0.0);
    }

    #[test]
    fn test_first_frame_against_silence() {
        let spec = vec![vec![1.0f32; 4]; 3];
        let strength = onset_strength(&spec);
        assert!(strength[0] > 0.0);
        assert_eq!(strength[1], 0.0);
    }

    #[test]
    fn test_from_signal_length() {
        let samples = vec![0.1f32; 8000];
        let signal = Signal::new(&samples, 8000).unwrap();
        let strength = onset_strength_from_signal(&signal, 512, 256);
        assert_eq!(strength.len(), (8000 - 512) / 256 + 1);
    }
}

//! Mel-frequency cepstral coefficients
//!
//! # Algorithm
//!
//! 1. Triangular mel filterbank (HTK mel scale) over `0..sr/2` applied to the
//!    power spectrum
//! 2. Natural log of each band energy
//! 3. Orthonormal DCT-II, keeping the first coefficients
//!
//! # Reference
//!
//! Davis, S., & Mermelstein, P. (1980). Comparison of Parametric Representations
//! for Monosyllabic Word Recognition in Continuously Spoken Sentences.
//! *IEEE Transactions on Acoustics, Speech, and Signal Processing*, 28(4), 357-366.

use std::f32::consts::PI;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Number of cepstral coefficients kept
pub const NUM_MFCC: usize = 13;

/// Default number of mel bands
pub const NUM_MEL_BANDS: usize = 40;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank bound to one spectrum layout
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build `num_bands` filters for spectra of `num_bins` bins at `sample_rate`
    pub fn new(num_bands: usize, num_bins: usize, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let bin_hz = if num_bins > 1 {
            nyquist / (num_bins - 1) as f32
        } else {
            nyquist
        };

        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..num_bands + 2)
            .map(|i| mel_to_hz(max_mel * i as f32 / (num_bands + 1) as f32))
            .collect();

        let filters = (0..num_bands)
            .map(|b| {
                let (lower, centre, upper) = (edges[b], edges[b + 1], edges[b + 2]);
                (0..num_bins)
                    .map(|k| {
                        let f = k as f32 * bin_hz;
                        if f <= lower || f >= upper {
                            0.0
                        } else if f <= centre {
                            (f - lower) / (centre - lower).max(EPSILON)
                        } else {
                            (upper - f) / (upper - centre).max(EPSILON)
                        }
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Log band energies of a magnitude spectrum
    pub fn log_energies(&self, magnitudes: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .zip(magnitudes)
                    .map(|(w, m)| w * m * m)
                    .sum();
                (energy + EPSILON).ln()
            })
            .collect()
    }

    /// First [`NUM_MFCC`] cepstral coefficients of a magnitude spectrum
    pub fn mfcc(&self, magnitudes: &[f32]) -> [f32; NUM_MFCC] {
        dct_ii(&self.log_energies(magnitudes))
    }
}

/// Orthonormal DCT-II truncated to [`NUM_MFCC`] coefficients
fn dct_ii(input: &[f32]) -> [f32; NUM_MFCC] {
    let n = input.len();
    let mut out = [0.0f32; NUM_MFCC];
    if n == 0 {
        return out;
    }
    for (k, slot) in out.iter_mut().enumerate().take(n) {
        let sum: f32 = input
            .iter()
            .enumerate()
            .map(|(i, &x)| x * (PI * k as f32 * (2 * i + 1) as f32 / (2 * n) as f32).cos())
            .sum();
        let scale = if k == 0 {
            (1.0 / n as f32).sqrt()
        } else {
            (2.0 / n as f32).sqrt()
        };
        *slot = sum * scale;
    }
    out
}

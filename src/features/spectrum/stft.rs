//! Magnitude spectra of windowed frames
//!
//! A [`SpectrumAnalyzer`] plans one forward FFT and reuses its buffers for
//! every frame of a pass, so frames can be processed lazily without
//! materializing the whole spectrogram.

use super::window::hann_window;
use crate::io::Signal;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Magnitude spectrum of one frame plus the statistics callers threshold on
#[derive(Debug, Clone)]
pub struct FrameSpectrum {
    /// Magnitudes for bins `0..=window_size/2`
    pub magnitudes: Vec<f32>,

    /// Upper bound on any bin magnitude: `Σ|x[n]·w[n]|`
    pub magnitude_bound: f32,

    /// RMS of the raw (unwindowed) frame samples
    pub rms: f32,
}

impl FrameSpectrum {
    /// True when the frame carries no energy at all
    pub fn is_silent(&self) -> bool {
        self.magnitude_bound <= EPSILON
    }

    /// Largest magnitude in the spectrum
    pub fn max_magnitude(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0f32, f32::max)
    }
}

/// Reusable windowed-FFT engine
pub struct SpectrumAnalyzer {
    window_size: usize,
    window: Vec<f32>,
    window_sum: f32,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window_size", &self.window_size)
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// Plan an FFT of `window_size` points with a Hann window
    pub fn new(window_size: usize) -> Self {
        let window = hann_window(window_size);
        let window_sum = window.iter().sum::<f32>().max(EPSILON);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);

        Self {
            window_size,
            window,
            window_sum,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); window_size],
        }
    }

    /// FFT length
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Sum of the window coefficients (amplitude normalization)
    pub fn window_sum(&self) -> f32 {
        self.window_sum
    }

    /// Centre frequency of bin `k`
    pub fn bin_frequency(&self, bin: f32, sample_rate: u32) -> f32 {
        bin * sample_rate as f32 / self.window_size as f32
    }

    /// Fractional bin index of a frequency
    pub fn frequency_bin(&self, frequency_hz: f32, sample_rate: u32) -> f32 {
        frequency_hz * self.window_size as f32 / sample_rate as f32
    }

    /// Window, transform and take magnitudes of one frame
    ///
    /// Frames shorter than the window are zero-padded.
    pub fn analyze(&mut self, samples: &[f32]) -> FrameSpectrum {
        let n = samples.len().min(self.window_size);

        let mut bound = 0.0f32;
        let mut sum_sq = 0.0f32;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            if i < n {
                let x = samples[i];
                let v = x * self.window[i];
                bound += v.abs();
                sum_sq += x * x;
                *slot = Complex::new(v, 0.0);
            } else {
                *slot = Complex::new(0.0, 0.0);
            }
        }

        self.fft.process(&mut self.buffer);

        let magnitudes = self.buffer[..self.num_bins()]
            .iter()
            .map(|c| c.norm())
            .collect();

        FrameSpectrum {
            magnitudes,
            magnitude_bound: bound,
            rms: if n > 0 { (sum_sq / n as f32).sqrt() } else { 0.0 },
        }
    }
}

/// Compute the full magnitude spectrogram of a signal (n_frames × n_bins)
///
/// Used by passes that need random access across frames (onset strength,
/// chroma); single-pass consumers should drive a [`SpectrumAnalyzer`] directly.
pub fn magnitude_spectrogram(
    signal: &Signal<'_>,
    window_size: usize,
    hop_size: usize,
) -> Vec<Vec<f32>> {
    let mut analyzer = SpectrumAnalyzer::new(window_size);
    let frames = signal.frames(window_size, hop_size);

    log::debug!(
        "Computing magnitude spectrogram: {} frames, window={}, hop={}",
        frames.total(),
        window_size,
        hop_size
    );

    frames
        .map(|frame| analyzer.analyze(frame.samples).magnitudes)
        .collect()
}

/// Refine a spectral peak by fitting a parabola through log magnitudes
///
/// Returns `(fractional_bin, interpolated_magnitude)`. Edge bins are returned
/// unchanged.
pub fn interpolate_peak(magnitudes: &[f32], bin: usize) -> (f32, f32) {
    if bin == 0 || bin + 1 >= magnitudes.len() {
        return (bin as f32, magnitudes.get(bin).copied().unwrap_or(0.0));
    }

    let a = (magnitudes[bin - 1] + EPSILON).ln();
    let b = (magnitudes[bin] + EPSILON).ln();
    let c = (magnitudes[bin + 1] + EPSILON).ln();

    let denom = a - 2.0 * b + c;
    if denom.abs() <= EPSILON {
        return (bin as f32, magnitudes[bin]);
    }

    let offset = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    let peak_log = b - 0.25 * (a - c) * offset;

    (bin as f32 + offset, peak_log.exp())
}

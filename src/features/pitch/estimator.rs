//! Dominant-frequency pitch estimation
//!
//! For each frame: Hann window, magnitude spectrum, then the bin of maximum
//! magnitude inside the search band, provided it exceeds a fraction of the
//! frame's maximum possible magnitude. The peak is refined by parabolic
//! interpolation on log magnitudes.
//!
//! The threshold is relative to `Σ|x[n]·w[n]|`, the L1 bound no DFT bin can
//! exceed. A pure tone reaches roughly π/4 of that bound whatever its level,
//! while broadband noise and digital silence stay far below it.
//!
//! # Example
//!
//! ```no_run
//! use stratum_transcribe::features::pitch::estimator::PitchEstimator;
//! use stratum_transcribe::io::Signal;
//!
//! let samples = vec![0.0f32; 44100];
//! let signal = Signal::new(&samples, 44100)?;
//! let estimator = PitchEstimator::new(2048, 512, 0.1);
//! for obs in estimator.track(&signal) {
//!     println!("{:.3}s: {:?}", obs.time, obs.frequency_hz);
//! }
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

use super::PitchObservation;
use crate::config::TranscriptionConfig;
use crate::features::spectrum::stft::{interpolate_peak, SpectrumAnalyzer};
use crate::io::{Frames, Signal};

/// Frame pitch estimator parameters
#[derive(Debug, Clone, Copy)]
pub struct PitchEstimator {
    /// Window length in samples
    pub window_size: usize,

    /// Hop between frames in samples
    pub hop_size: usize,

    /// Fraction of the maximum possible magnitude a peak must exceed
    pub magnitude_threshold: f32,

    /// Lowest candidate fundamental in Hz
    pub min_frequency_hz: f32,

    /// Highest candidate fundamental in Hz
    pub max_frequency_hz: f32,
}

impl PitchEstimator {
    /// Create an estimator with the default 30 Hz - 5 kHz search band
    pub fn new(window_size: usize, hop_size: usize, magnitude_threshold: f32) -> Self {
        Self {
            window_size,
            hop_size,
            magnitude_threshold,
            min_frequency_hz: 30.0,
            max_frequency_hz: 5000.0,
        }
    }

    /// Build from the request configuration
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            window_size: config.window_size,
            hop_size: config.hop_size,
            magnitude_threshold: config.magnitude_threshold,
            min_frequency_hz: config.min_frequency_hz,
            max_frequency_hz: config.max_frequency_hz,
        }
    }

    /// Start a single forward pass over the signal
    pub fn track<'a>(&self, signal: &Signal<'a>) -> PitchTrack<'a> {
        log::debug!(
            "Tracking pitch: {} samples, window={}, hop={}, threshold={:.2}",
            signal.len(),
            self.window_size,
            self.hop_size,
            self.magnitude_threshold
        );

        PitchTrack {
            params: *self,
            sample_rate: signal.sample_rate(),
            frames: signal.frames(self.window_size, self.hop_size),
            analyzer: SpectrumAnalyzer::new(self.window_size),
        }
    }
}

/// Lazy, time-ordered sequence of pitch observations (one per frame)
#[derive(Debug)]
pub struct PitchTrack<'a> {
    params: PitchEstimator,
    sample_rate: u32,
    frames: Frames<'a>,
    analyzer: SpectrumAnalyzer,
}

impl PitchTrack<'_> {
    /// Frames remaining in this pass
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn observe(&mut self, time: f32, samples: &[f32]) -> PitchObservation {
        let absent = PitchObservation {
            time,
            frequency_hz: None,
            magnitude: 0.0,
            confidence: 0.0,
        };

        let spectrum = self.analyzer.analyze(samples);
        if spectrum.is_silent() {
            return absent;
        }

        let threshold = self.params.magnitude_threshold * spectrum.magnitude_bound;
        let n_bins = spectrum.magnitudes.len();
        let lo = (self
            .analyzer
            .frequency_bin(self.params.min_frequency_hz, self.sample_rate)
            .floor() as usize)
            .max(1);
        let hi = (self
            .analyzer
            .frequency_bin(self.params.max_frequency_hz, self.sample_rate)
            .ceil() as usize)
            .min(n_bins.saturating_sub(2));

        if lo > hi {
            return absent;
        }

        let mut best: Option<(usize, f32)> = None;
        for bin in lo..=hi {
            let mag = spectrum.magnitudes[bin];
            if mag > threshold && best.is_none_or(|(_, m)| mag > m) {
                best = Some((bin, mag));
            }
        }

        let Some((bin, _)) = best else {
            return absent;
        };

        let (frac_bin, peak) = interpolate_peak(&spectrum.magnitudes, bin);
        let frequency = self.analyzer.bin_frequency(frac_bin, self.sample_rate);

        PitchObservation {
            time,
            frequency_hz: Some(frequency),
            magnitude: 2.0 * peak / self.analyzer.window_sum(),
            confidence: (peak / spectrum.magnitude_bound).clamp(0.0, 1.0),
        }
    }
}

impl Iterator for PitchTrack<'_> {
    type Item = PitchObservation;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        Some(self.observe(frame.time, frame.samples))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.frames.size_hint()
    }
}

/// Collect the pitch track of a whole signal
pub fn estimate_pitches(signal: &Signal<'_>, estimator: &PitchEstimator) -> Vec<PitchObservation> {
    let observations: Vec<PitchObservation> = estimator.track(signal).collect();
    let voiced = observations
        .iter()
        .filter(|o| o.frequency_hz.is_some())
        .count();
    log::debug!(
        "Pitch track: {} frames, {} voiced",
        observations.len(),
        voiced
    );
    observations
}

//! Autocorrelation-based tempo estimation
//!
//! Finds the dominant periodicity of an onset-strength curve.
//!
//! # Algorithm
//!
//! 1. Remove the mean of the onset-strength curve
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(x)|²)`
//! 3. Normalize by `ACF[0]` so values lie in [-1, 1]
//! 4. Weight each lag in the tempo range by a log-Gaussian prior centred on
//!    120 BPM (one octave standard deviation) to resolve octave ambiguity
//! 5. Refine the winning lag by parabolic interpolation
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.
//!
//! # Example
//!
//! ```
//! use stratum_transcribe::features::period::autocorrelation::estimate_tempo;
//!
//! // Impulse every 43 frames at 86.13 frames/s ≈ 120 BPM
//! let mut strength = vec![0.0f32; 860];
//! for i in (0..860).step_by(43) {
//!     strength[i] = 1.0;
//! }
//! let estimate = estimate_tempo(&strength, 44100.0 / 512.0, 50.0, 200.0)?.unwrap();
//! assert!((estimate.bpm - 120.0).abs() < 2.0);
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

use super::{BpmCandidate, BpmEstimate};
use crate::error::TranscriptionError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// Centre of the tempo prior
const PRIOR_CENTER_BPM: f32 = 120.0;

/// Width of the tempo prior in octaves
const PRIOR_SIGMA_OCTAVES: f32 = 1.0;

/// Estimate tempo from an onset-strength curve
///
/// # Arguments
///
/// * `onset_strength` - Onset strength per frame
/// * `frame_rate` - Frames per second of the curve (`sample_rate / hop_size`)
/// * `min_bpm` / `max_bpm` - Tempo search range
///
/// # Returns
///
/// `Ok(None)` when the curve is too short or carries no periodic energy;
/// otherwise the best estimate with its normalized autocorrelation as
/// confidence.
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` for a non-positive frame rate or
/// an inverted tempo range.
pub fn estimate_tempo(
    onset_strength: &[f32],
    frame_rate: f32,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<Option<BpmEstimate>, TranscriptionError> {
    if frame_rate <= EPSILON {
        return Err(TranscriptionError::InvalidInput(format!(
            "Invalid frame rate: {}",
            frame_rate
        )));
    }
    if min_bpm <= EPSILON || min_bpm >= max_bpm {
        return Err(TranscriptionError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            min_bpm, max_bpm
        )));
    }

    let candidates = rank_tempo_candidates(onset_strength, frame_rate, min_bpm, max_bpm);
    let Some(&(lag, _)) = candidates.first() else {
        return Ok(None);
    };

    let acf = normalized_autocorrelation(onset_strength);
    let (period, confidence) = refine_lag(&acf, lag);
    let bpm = 60.0 * frame_rate / period;

    log::debug!(
        "Tempo estimate: {:.2} BPM (lag {:.2} frames, confidence {:.3})",
        bpm,
        period,
        confidence
    );

    Ok(Some(BpmEstimate {
        bpm,
        period_frames: period,
        confidence: confidence.clamp(0.0, 1.0),
    }))
}

/// Rank all lags in the tempo range by prior-weighted autocorrelation
///
/// Returns `(lag, weighted_score)` pairs, best first. Empty when the curve is
/// flat or shorter than the longest period searched.
fn rank_tempo_candidates(
    onset_strength: &[f32],
    frame_rate: f32,
    min_bpm: f32,
    max_bpm: f32,
) -> Vec<(usize, f32)> {
    let min_lag = ((60.0 * frame_rate / max_bpm).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / min_bpm).ceil() as usize;

    if onset_strength.len() <= min_lag + 1 {
        log::debug!(
            "Onset curve too short for tempo estimation: {} frames",
            onset_strength.len()
        );
        return vec![];
    }

    let acf = normalized_autocorrelation(onset_strength);
    if acf.is_empty() {
        return vec![];
    }
    let max_lag = max_lag.min(acf.len() - 1);

    let mut ranked: Vec<(usize, f32)> = (min_lag..=max_lag)
        .filter(|&lag| acf[lag] > 0.0)
        .map(|lag| {
            let bpm = 60.0 * frame_rate / lag as f32;
            (lag, acf[lag] * tempo_prior(bpm))
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked
}

/// Top tempo candidates (distinct lags, best first) for diagnostics
pub fn tempo_candidates(
    onset_strength: &[f32],
    frame_rate: f32,
    min_bpm: f32,
    max_bpm: f32,
    limit: usize,
) -> Vec<BpmCandidate> {
    let acf = normalized_autocorrelation(onset_strength);
    rank_tempo_candidates(onset_strength, frame_rate, min_bpm, max_bpm)
        .into_iter()
        .take(limit)
        .map(|(lag, _)| BpmCandidate {
            bpm: 60.0 * frame_rate / lag as f32,
            confidence: acf[lag].clamp(0.0, 1.0),
        })
        .collect()
}

/// Log-Gaussian tempo prior, 1.0 at the centre
fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_SIGMA_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Parabolic refinement of an integer lag; returns `(lag, acf_value)`
fn refine_lag(acf: &[f32], lag: usize) -> (f32, f32) {
    if lag == 0 || lag + 1 >= acf.len() {
        return (lag as f32, acf[lag]);
    }
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() <= EPSILON {
        return (lag as f32, b);
    }
    let offset = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    (lag as f32 + offset, b - 0.25 * (a - c) * offset)
}

/// Mean-removed autocorrelation normalized by its zero-lag value
///
/// Returns an empty vector for a constant (or empty) curve.
pub fn normalized_autocorrelation(signal: &[f32]) -> Vec<f32> {
    if signal.is_empty() {
        return vec![];
    }
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    let centered: Vec<f32> = signal.iter().map(|&x| x - mean).collect();

    let acf = compute_autocorrelation_fft(&centered);
    let zero_lag = acf[0];
    if zero_lag <= EPSILON {
        return vec![];
    }
    acf.iter().map(|&x| x / zero_lag).collect()
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²), zero-padded to avoid
/// circular wrap-around.
fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    for x in &mut buffer {
        *x = *x * x.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}

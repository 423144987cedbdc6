//! Rhythm analyzer
//!
//! Turns a signal into a [`BeatGrid`] independently of pitch analysis:
//!
//! 1. Spectral-flux onset strength over the whole signal
//! 2. Tempo from the onset autocorrelation (or the caller's override)
//! 3. Dynamic-programming beat tracking at that period
//! 4. Meter and downbeat phase from onset strength at the beats
//! 5. Rest markers from low-RMS spans
//!
//! When the onset curve carries no periodic energy, the tempo confidence is
//! below threshold, or fewer than two beats are found, the configured fallback
//! grid (nominally 120 BPM, 4/4) is substituted and a flag records it.
//!
//! # Example
//!
//! ```no_run
//! use stratum_transcribe::features::beat_tracking::rhythm::analyze_rhythm;
//! use stratum_transcribe::io::Signal;
//! use stratum_transcribe::TranscriptionConfig;
//!
//! let samples = vec![0.0f32; 44100 * 4];
//! let signal = Signal::new(&samples, 44100)?;
//! let rhythm = analyze_rhythm(&signal, &TranscriptionConfig::default())?;
//! println!("{:.1} BPM in {}", rhythm.beat_grid.tempo_bpm, rhythm.beat_grid.time_signature);
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

use super::dp_tracker::{track_beats, DEFAULT_TIGHTNESS};
use super::time_signature::detect_time_signature;
use crate::analysis::metadata::TranscriptionFlag;
use crate::analysis::result::BeatGrid;
use crate::config::TranscriptionConfig;
use crate::error::TranscriptionError;
use crate::features::onset::spectral_flux::onset_strength_from_signal;
use crate::features::period::autocorrelation::{estimate_tempo, tempo_candidates};
use crate::io::Signal;
use crate::preprocessing::silence::{detect_silence, Rest, SilenceDetector};

/// Output of the rhythm stage
#[derive(Debug, Clone)]
pub struct RhythmAnalysis {
    /// Tempo, beat times and meter
    pub beat_grid: BeatGrid,

    /// Index of the first downbeat in `beat_grid.beat_times`
    pub downbeat_offset: usize,

    /// Silent spans long enough to notate as rests
    pub rests: Vec<Rest>,

    /// Tempo confidence (0.0-1.0); 1.0 for a caller-supplied tempo
    pub tempo_confidence: f32,

    /// Meter confidence (0.0-1.0)
    pub time_signature_confidence: f32,

    /// Fallbacks taken during analysis
    pub flags: Vec<TranscriptionFlag>,
}

/// Analyze tempo, beats, meter and rests of a signal
///
/// # Arguments
///
/// * `signal` - Input signal
/// * `config` - Request configuration (STFT, tempo range, fallbacks, silence)
///
/// # Returns
///
/// A complete [`RhythmAnalysis`]; low-confidence detection never fails, it
/// substitutes the fallback grid instead.
///
/// # Errors
///
/// Returns `TranscriptionError` only for structurally invalid parameters.
pub fn analyze_rhythm(
    signal: &Signal<'_>,
    config: &TranscriptionConfig,
) -> Result<RhythmAnalysis, TranscriptionError> {
    let frame_rate = signal.sample_rate() as f32 / config.hop_size as f32;
    let duration = signal.duration_seconds();

    let strength = onset_strength_from_signal(signal, config.window_size, config.hop_size);
    let rests = detect_silence(
        signal,
        &SilenceDetector {
            threshold_db: config.silence_threshold_db,
            min_duration_seconds: config.min_rest_duration,
            frame_size: config.hop_size,
        },
    );

    let mut flags = Vec::new();

    let (tempo, tempo_confidence) = match config.tempo_override {
        Some(bpm) => {
            log::debug!("Using caller-supplied tempo {:.2} BPM", bpm);
            (Some((bpm, 60.0 * frame_rate / bpm)), 1.0)
        }
        None => match estimate_tempo(&strength, frame_rate, config.min_bpm, config.max_bpm)? {
            Some(estimate) if estimate.confidence >= config.tempo_confidence_threshold => {
                (Some((estimate.bpm, estimate.period_frames)), estimate.confidence)
            }
            Some(estimate) => {
                log::warn!(
                    "Tempo confidence {:.3} below threshold {:.3}",
                    estimate.confidence,
                    config.tempo_confidence_threshold
                );
                log::debug!(
                    "Tempo candidates: {:?}",
                    tempo_candidates(&strength, frame_rate, config.min_bpm, config.max_bpm, 3)
                );
                (None, estimate.confidence)
            }
            None => (None, 0.0),
        },
    };

    let beat_frames = match tempo {
        Some((_, period)) if period >= 1.0 => track_beats(&strength, period, DEFAULT_TIGHTNESS)?,
        _ => vec![],
    };

    if tempo.is_none() || beat_frames.len() < 2 {
        let bpm = config.tempo_override.unwrap_or(config.fallback_bpm);
        if config.tempo_override.is_none() {
            log::warn!(
                "Tempo detection unreliable, using fallback grid at {:.1} BPM",
                bpm
            );
            flags.push(TranscriptionFlag::TempoFallback);
        }
        flags.push(TranscriptionFlag::TimeSignatureAssumed);

        return Ok(RhythmAnalysis {
            beat_grid: BeatGrid::regular(bpm, config.fallback_time_signature, duration),
            downbeat_offset: 0,
            rests,
            tempo_confidence,
            time_signature_confidence: 0.0,
            flags,
        });
    }

    let tempo_bpm = tempo.map_or(config.fallback_bpm, |(bpm, _)| bpm);
    let beat_times: Vec<f32> = beat_frames
        .iter()
        .map(|&frame| frame as f32 / frame_rate)
        .collect();
    let beat_strengths: Vec<f32> = beat_frames
        .iter()
        .map(|&frame| local_max(&strength, frame))
        .collect();

    let meter = detect_time_signature(&beat_strengths);
    let time_signature = if meter.detected {
        meter.time_signature
    } else {
        flags.push(TranscriptionFlag::TimeSignatureAssumed);
        config.fallback_time_signature
    };

    log::debug!(
        "Rhythm: {:.2} BPM, {} beats, {} (downbeat offset {}), {} rests",
        tempo_bpm,
        beat_times.len(),
        time_signature,
        meter.downbeat_offset,
        rests.len()
    );

    Ok(RhythmAnalysis {
        beat_grid: BeatGrid {
            tempo_bpm,
            beat_times,
            time_signature,
        },
        downbeat_offset: meter.downbeat_offset,
        rests,
        tempo_confidence,
        time_signature_confidence: meter.confidence,
        flags,
    })
}

/// Strongest onset value within one frame of `frame`
fn local_max(strength: &[f32], frame: usize) -> f32 {
    let lo = frame.saturating_sub(1);
    let hi = (frame + 2).min(strength.len());
    strength[lo..hi].iter().copied().fold(0.0f32, f32::max)
}

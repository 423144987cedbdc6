//! Dominant-instrument classification
//!
//! Scores timbral features against heuristic profiles for six instrument
//! classes and normalizes the scores to sum to 1. Advisory only: the note
//! sequence never depends on the result.
//!
//! Profiles (normalized centroid `c = clamp(centroid / 4000 Hz, 0, 1)`,
//! normalized spread `b = clamp(bandwidth / 4000 Hz, 0, 1)`, zero-crossing
//! rate `z`, harmonic ratio `h`, attack time `a` in seconds, and spectral
//! warmth `w = 0.5 + 0.5·tanh(mfcc[1] / 10)` from the first cepstral tilt
//! coefficient):
//!
//! ```text
//! piano     (1 - |c - 0.3|) · (1 - z) · h
//! guitar    (1 - |c - 0.4|) · (1 - |z - 0.05|) · (1 - 0.25 w)
//! violin    c · h · (1 - z)
//! brass     c · (1 - a) · h
//! woodwind  0.7 c · a · h
//! drums     z · (1 - h) · (1 - a) · (0.75 + 0.25 b)
//! ```
//!
//! The remaining cepstral coefficients, rolloff and flatness are reported in
//! [`InstrumentClassification::features`] but not scored.

use crate::features::timbre::{extract_timbre, TimbreFeatures};
use crate::io::Signal;
use serde::{Deserialize, Serialize};

/// Centroid that maps to full brightness
const CENTROID_SCALE_HZ: f32 = 4000.0;

/// Bandwidth that maps to full spread
const BANDWIDTH_SCALE_HZ: f32 = 4000.0;

/// Divisor of the cepstral tilt before squashing
const MFCC_TILT_SCALE: f32 = 10.0;

/// Score normalization guard
const SCORE_EPSILON: f32 = 1e-6;

/// Instrument class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentClass {
    /// Keyboard
    Piano,
    /// Plucked string
    Guitar,
    /// Bowed string
    Violin,
    /// Brass
    Brass,
    /// Woodwind
    Woodwind,
    /// Unpitched percussion
    Drums,
}

impl InstrumentClass {
    /// All classes in scoring order (ties resolve to the earlier class)
    pub const ALL: [InstrumentClass; 6] = [
        InstrumentClass::Piano,
        InstrumentClass::Guitar,
        InstrumentClass::Violin,
        InstrumentClass::Brass,
        InstrumentClass::Woodwind,
        InstrumentClass::Drums,
    ];

    /// Lowercase class name
    pub fn name(&self) -> &'static str {
        match self {
            InstrumentClass::Piano => "piano",
            InstrumentClass::Guitar => "guitar",
            InstrumentClass::Violin => "violin",
            InstrumentClass::Brass => "brass",
            InstrumentClass::Woodwind => "woodwind",
            InstrumentClass::Drums => "drums",
        }
    }

    /// General MIDI program (0-based)
    ///
    /// Drums map to program 0 on the percussion channel.
    pub fn gm_program(&self) -> u8 {
        match self {
            InstrumentClass::Piano => 0,     // Acoustic Grand Piano
            InstrumentClass::Guitar => 24,   // Acoustic Guitar (nylon)
            InstrumentClass::Violin => 40,   // Violin
            InstrumentClass::Brass => 56,    // Trumpet
            InstrumentClass::Woodwind => 73, // Flute
            InstrumentClass::Drums => 0,
        }
    }

    /// True for classes played on the GM percussion channel
    pub fn is_percussion(&self) -> bool {
        matches!(self, InstrumentClass::Drums)
    }
}

impl std::fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentClassification {
    /// Highest-scoring class
    pub instrument: InstrumentClass,

    /// Normalized score of `instrument` (0.0-1.0)
    pub confidence: f32,

    /// Normalized scores for every class, in [`InstrumentClass::ALL`] order
    pub scores: Vec<(InstrumentClass, f32)>,

    /// Features the scores were computed from
    pub features: TimbreFeatures,
}

/// Classify the dominant instrument of a signal
///
/// # Arguments
///
/// * `signal` - Signal segment to analyse (typically the first seconds)
/// * `window_size` - STFT window size
/// * `hop_size` - STFT hop size
pub fn classify_instrument(
    signal: &Signal<'_>,
    window_size: usize,
    hop_size: usize,
) -> InstrumentClassification {
    let features = extract_timbre(signal, window_size, hop_size);
    let classification = score_instrument(features);
    log::debug!(
        "Instrument: {} (confidence {:.3})",
        classification.instrument,
        classification.confidence
    );
    classification
}

/// Score precomputed timbral features against the instrument profiles
pub fn score_instrument(features: TimbreFeatures) -> InstrumentClassification {
    let c = (features.spectral_centroid_hz / CENTROID_SCALE_HZ).clamp(0.0, 1.0);
    let z = features.zero_crossing_rate.clamp(0.0, 1.0);
    let h = features.harmonic_ratio.clamp(0.0, 1.0);
    let a = features.attack_time.clamp(0.0, 1.0);
    let b = (features.spectral_bandwidth_hz / BANDWIDTH_SCALE_HZ).clamp(0.0, 1.0);
    let w = 0.5 + 0.5 * (features.mfcc[1] / MFCC_TILT_SCALE).tanh();

    let raw: Vec<(InstrumentClass, f32)> = InstrumentClass::ALL
        .iter()
        .map(|&class| {
            let score = match class {
                InstrumentClass::Piano => (1.0 - (c - 0.3).abs()) * (1.0 - z) * h,
                InstrumentClass::Guitar => {
                    (1.0 - (c - 0.4).abs()) * (1.0 - (z - 0.05).abs()) * (1.0 - 0.25 * w)
                }
                InstrumentClass::Violin => c * h * (1.0 - z),
                InstrumentClass::Brass => c * (1.0 - a) * h,
                InstrumentClass::Woodwind => 0.7 * c * a * h,
                InstrumentClass::Drums => z * (1.0 - h) * (1.0 - a) * (0.75 + 0.25 * b),
            };
            (class, score.max(0.0))
        })
        .collect();

    let total: f32 = raw.iter().map(|(_, s)| s).sum::<f32>() + SCORE_EPSILON;
    let scores: Vec<(InstrumentClass, f32)> =
        raw.into_iter().map(|(class, s)| (class, s / total)).collect();

    let (instrument, confidence) = scores
        .iter()
        .copied()
        .fold((InstrumentClass::Piano, f32::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        });

    InstrumentClassification {
        instrument,
        confidence: confidence.max(0.0),
        scores,
        features,
    }
}

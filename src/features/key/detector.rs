//! Key detection algorithm
//!
//! Correlates a 12-bin pitch-class histogram against the Krumhansl-Schmuckler
//! profiles of all 24 keys (Pearson correlation). The best-correlating key is
//! the estimate; confidence is the normalized margin over the runner-up:
//!
//! ```text
//! confidence = (r1 - r2) / (1 - r2)      clamped to [0, 1]
//! ```
//!
//! Ties go to the first candidate in the order C major, C minor, C# major, …
//! An empty histogram yields C major with confidence 0.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::templates::KeyTemplates;
use super::{KeyDetectionResult, KeyScore};
use crate::analysis::result::{KeyEstimate, KeyMode};
use crate::features::chroma::Chroma;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Detect musical key from a pitch-class histogram
///
/// # Arguments
///
/// * `chroma` - 12-bin pitch-class histogram (any non-negative scale)
/// * `templates` - Key templates (Krumhansl-Schmuckler profiles)
///
/// # Returns
///
/// Key detection result with:
/// - Detected key and confidence (0.0-1.0)
/// - All 24 key correlations (ranked, highest first)
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::key::{detect_key, KeyTemplates};
/// use stratum_transcribe::analysis::result::KeyMode;
///
/// let templates = KeyTemplates::new();
/// let result = detect_key(&templates.major[0], &templates);
/// assert_eq!(result.key.tonic, 0);
/// assert_eq!(result.key.mode, KeyMode::Major);
/// assert!(result.key.confidence > 0.9);
/// ```
pub fn detect_key(chroma: &Chroma, templates: &KeyTemplates) -> KeyDetectionResult {
    let mut scores = Vec::with_capacity(24);
    for tonic in 0..12u8 {
        for mode in [KeyMode::Major, KeyMode::Minor] {
            scores.push(KeyScore {
                tonic,
                mode,
                correlation: pearson_correlation(chroma, templates.get(tonic, mode)),
            });
        }
    }

    // Stable sort keeps candidate order for ties
    scores.sort_by(|a, b| {
        b.correlation
            .partial_cmp(&a.correlation)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best = scores[0];
    let runner_up = scores[1].correlation;
    let confidence = if best.correlation <= EPSILON {
        0.0
    } else if 1.0 - runner_up <= EPSILON {
        if best.correlation >= runner_up { 1.0 } else { 0.0 }
    } else {
        ((best.correlation - runner_up) / (1.0 - runner_up)).clamp(0.0, 1.0)
    };

    let key = KeyEstimate {
        tonic: best.tonic,
        mode: best.mode,
        confidence,
    };

    log::debug!(
        "Detected key {} (r = {:.3}, runner-up r = {:.3}, confidence {:.3})",
        key.name(),
        best.correlation,
        runner_up,
        confidence
    );

    KeyDetectionResult {
        key,
        top_keys: scores.iter().take(3).copied().collect(),
        all_scores: scores,
    }
}

/// Pearson correlation of two 12-bin vectors (0 when either is constant)
pub fn pearson_correlation(a: &Chroma, b: &Chroma) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= EPSILON {
        0.0
    } else {
        cov / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_key_exact_profiles() {
        let templates = KeyTemplates::new();
        for tonic in 0..12u8 {
            for mode in [KeyMode::Major, KeyMode::Minor] {
                let result = detect_key(templates.get(tonic, mode), &templates);
                assert_eq!(result.key.tonic, tonic);
                assert_eq!(result.key.mode, mode);
                assert!(result.key.confidence > 0.9);
            }
        }
    }

    #[test]
    fn test_detect_key_triad_histogram() {
        let templates = KeyTemplates::new();
        let mut chroma = [0.0f32; 12];
        chroma[0] = 0.3; // C
        chroma[2] = 0.1; // D
        chroma[4] = 0.3; // E
        chroma[5] = 0.1; // F
        chroma[7] = 0.3; // G
        chroma[9] = 0.1; // A
        chroma[11] = 0.1; // B
        let result = detect_key(&chroma, &templates);
        assert_eq!(result.all_scores.len(), 24);
        assert_eq!(result.key.tonic, 0);
        assert_eq!(result.key.mode, KeyMode::Major);
        assert!(result.key.confidence >= 0.0 && result.key.confidence <= 1.0);
        assert_eq!(result.top_keys.len(), 3);
        assert_eq!(result.top_keys[0].tonic, 0);
    }

    #[test]
    fn test_detect_key_empty_histogram() {
        let templates = KeyTemplates::new();
        let result = detect_key(&[0.0; 12], &templates);
        assert_eq!(result.key.tonic, 0);
        assert_eq!(result.key.mode, KeyMode::Major);
        assert_eq!(result.key.confidence, 0.0);
    }

    #[test]
    fn test_scores_ranked() {
        let templates = KeyTemplates::new();
        let result = detect_key(&templates.minor[4], &templates);
        for pair in result.all_scores.windows(2) {
            assert!(pair[0].correlation >= pair[1].correlation);
        }
    }

    #[test]
    fn test_pearson_correlation() {
        let a: Chroma = std::array::from_fn(|i| i as f32);
        let b: Chroma = std::array::from_fn(|i| 2.0 * i as f32 + 1.0);
        let c: Chroma = std::array::from_fn(|i| -(i as f32));
        assert!((pearson_correlation(&a, &b) - 1.0).abs() < 1e-5);
        assert!((pearson_correlation(&a, &c) + 1.0).abs() < 1e-5);
        assert_eq!(pearson_correlation(&a, &[1.0; 12]), 0.0);
    }
}

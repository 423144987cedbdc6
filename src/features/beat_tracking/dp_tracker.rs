//! Dynamic-programming beat tracker
//!
//! Finds the beat sequence that maximizes onset strength at the beats while
//! keeping inter-beat intervals close to the target period.
//!
//! # Algorithm
//!
//! For each frame `t`:
//!
//! ```text
//! score[t] = onset[t] + max_{p ∈ [t-2P, t-P/2]} ( score[p] - α·ln((t-p)/P)² )
//! ```
//!
//! where `P` is the beat period in frames and `α` the tightness. The best
//! predecessor is stored as a back-link; the path is recovered from the
//! highest-scoring frame within the final period.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use crate::error::TranscriptionError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Default transition tightness
pub const DEFAULT_TIGHTNESS: f32 = 100.0;

/// Track beats on an onset-strength curve
///
/// # Arguments
///
/// * `onset_strength` - Onset strength per frame
/// * `period_frames` - Target beat period in frames (fractional)
/// * `tightness` - Penalty weight for deviating from the period
///
/// # Returns
///
/// Beat frame indices in increasing order. Empty for an empty or flat curve.
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` if the period is shorter than
/// one frame.
pub fn track_beats(
    onset_strength: &[f32],
    period_frames: f32,
    tightness: f32,
) -> Result<Vec<usize>, TranscriptionError> {
    if !(period_frames >= 1.0) {
        return Err(TranscriptionError::InvalidInput(format!(
            "Beat period must be at least one frame, got {:.3}",
            period_frames
        )));
    }
    let n = onset_strength.len();
    if n == 0 {
        return Ok(vec![]);
    }

    let std_dev = standard_deviation(onset_strength);
    if std_dev <= EPSILON {
        return Ok(vec![]);
    }
    let local: Vec<f32> = onset_strength.iter().map(|&x| x / std_dev).collect();

    let min_back = ((period_frames / 2.0).round() as usize).max(1);
    let max_back = ((2.0 * period_frames).round() as usize).max(min_back);

    let mut score = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];

    for t in 0..n {
        let mut best: Option<(usize, f32)> = None;
        if t >= min_back {
            let earliest = t.saturating_sub(max_back);
            for prev in earliest..=(t - min_back) {
                let ratio = (t - prev) as f32 / period_frames;
                let penalty = tightness * ratio.ln().powi(2);
                let candidate = score[prev] - penalty;
                if best.is_none_or(|(_, s)| candidate > s) {
                    best = Some((prev, candidate));
                }
            }
        }

        match best {
            Some((prev, s)) if s > 0.0 => {
                score[t] = local[t] + s;
                backlink[t] = Some(prev);
            }
            _ => {
                score[t] = local[t];
            }
        }
    }

    // Last beat: best cumulative score within the final period
    let tail_start = n.saturating_sub(period_frames.round() as usize + 1);
    let mut last = tail_start;
    for t in tail_start..n {
        if score[t] > score[last] {
            last = t;
        }
    }

    let mut beats = vec![last];
    let mut current = last;
    while let Some(prev) = backlink[current] {
        beats.push(prev);
        current = prev;
    }
    beats.reverse();

    log::debug!(
        "DP beat tracking: {} beats (period {:.2} frames)",
        beats.len(),
        period_frames
    );

    Ok(beats)
}

fn standard_deviation(values: &[f32]) -> f32 {
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance = values.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses(len: usize, period: usize, offset: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i >= offset && (i - offset) % period == 0 { 1.0 } else { 0.05 })
            .collect()
    }

    #[test]
    fn test_tracks_regular_pulses() {
        let strength = pulses(400, 40, 10);
        let beats = track_beats(&strength, 40.0, DEFAULT_TIGHTNESS).unwrap();
        let expected: Vec<usize> = (10..400).step_by(40).collect();
        assert_eq!(beats, expected);
    }

    #[test]
    fn test_bridges_missing_pulse() {
        let mut strength = pulses(400, 40, 0);
        strength[200] = 0.05;
        let beats = track_beats(&strength, 40.0, DEFAULT_TIGHTNESS).unwrap();
        // Period is kept through the gap
        assert!(beats.contains(&160));
        assert!(beats.contains(&240));
        for pair in beats.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((20..=80).contains(&gap), "gap {}", gap);
        }
    }

    #[test]
    fn test_beats_increasing() {
        let strength: Vec<f32> = (0..300).map(|i| ((i * 7919) % 13) as f32).collect();
        let beats = track_beats(&strength, 25.0, DEFAULT_TIGHTNESS).unwrap();
        assert!(beats.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_flat_curve_has_no_beats() {
        assert!(track_beats(&[0.0; 100], 20.0, DEFAULT_TIGHTNESS)
            .unwrap()
            .is_empty());
        assert!(track_beats(&[], 20.0, DEFAULT_TIGHTNESS).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_subframe_period() {
        assert!(track_beats(&[1.0, 0.0], 0.5, DEFAULT_TIGHTNESS).is_err());
    }
}

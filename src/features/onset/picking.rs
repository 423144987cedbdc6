//! Onset picking on a strength curve
//!
//! Onsets are local maxima of the onset-strength curve that clear an adaptive
//! threshold `median + k·MAD` as well as a floor of 10 % of the curve maximum,
//! separated by at least a minimum gap (the stronger of two close peaks wins).

use super::threshold::adaptive_threshold_median_mad;
use super::OnsetCandidate;
use crate::error::TranscriptionError;
use crate::features::period::peak_picking::find_peaks;

const EPSILON: f32 = 1e-10;

/// Floor relative to the strongest frame
const RELATIVE_FLOOR: f32 = 0.1;

/// Pick onsets from an onset-strength curve
///
/// # Arguments
///
/// * `strength` - Onset strength per frame
/// * `frame_rate` - Frames per second (`sample_rate / hop_size`)
/// * `k` - MAD multiplier of the adaptive threshold
/// * `min_gap_seconds` - Minimum spacing between onsets
///
/// # Returns
///
/// Onsets in time order. Empty for an empty or flat curve.
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` for a negative `k` or a
/// non-positive frame rate.
pub fn pick_onsets(
    strength: &[f32],
    frame_rate: f32,
    k: f32,
    min_gap_seconds: f32,
) -> Result<Vec<OnsetCandidate>, TranscriptionError> {
    if frame_rate <= EPSILON {
        return Err(TranscriptionError::InvalidInput(format!(
            "Invalid frame rate: {}",
            frame_rate
        )));
    }
    if strength.is_empty() {
        return Ok(vec![]);
    }

    let max_strength = strength.iter().copied().fold(0.0f32, f32::max);
    if max_strength <= EPSILON {
        log::debug!("Onset strength is flat, no onsets");
        return Ok(vec![]);
    }

    let adaptive = adaptive_threshold_median_mad(strength, k)?;
    let threshold = adaptive.max(RELATIVE_FLOOR * max_strength);
    let min_distance = ((min_gap_seconds.max(0.0) * frame_rate).ceil() as usize).max(1);

    let mut peaks = find_peaks(strength, threshold, min_distance);
    peaks.sort_by_key(|&(frame, _)| frame);

    let onsets: Vec<OnsetCandidate> = peaks
        .into_iter()
        .map(|(frame, value)| OnsetCandidate {
            frame,
            time_seconds: frame as f32 / frame_rate,
            confidence: (value / max_strength).clamp(0.0, 1.0),
        })
        .collect();

    log::debug!(
        "Picked {} onsets (threshold {:.3}, min distance {} frames)",
        onsets.len(),
        threshold,
        min_distance
    );

    Ok(onsets)
}

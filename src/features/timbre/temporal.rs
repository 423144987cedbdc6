//! Time-domain descriptors

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Sign changes per sample
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::timbre::temporal::zero_crossing_rate;
///
/// let alternating = [1.0, -1.0, 1.0, -1.0, 1.0];
/// assert_eq!(zero_crossing_rate(&alternating), 1.0);
/// ```
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Rise time of an envelope from 10 % to 90 % of its peak, in seconds
///
/// # Arguments
///
/// * `envelope` - Frame energies (e.g. RMS), one per hop
/// * `frame_period` - Seconds between envelope values
///
/// # Returns
///
/// 0.0 for an empty or silent envelope
pub fn attack_time(envelope: &[f32], frame_period: f32) -> f32 {
    let peak = envelope.iter().copied().fold(0.0f32, f32::max);
    if peak <= EPSILON {
        return 0.0;
    }
    let start = envelope.iter().position(|&e| e >= 0.1 * peak);
    let end = envelope.iter().position(|&e| e >= 0.9 * peak);
    match (start, end) {
        (Some(s), Some(e)) if e >= s => (e - s) as f32 * frame_period,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_crossing_rate() {
        assert_eq!(zero_crossing_rate(&[]), 0.0);
        assert_eq!(zero_crossing_rate(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, -1.0]), 0.5);
    }

    #[test]
    fn test_attack_time() {
        // Linear rise over 10 frames, then hold
        let mut envelope: Vec<f32> = (0..=10).map(|i| i as f32 / 10.0).collect();
        envelope.extend(std::iter::repeat_n(1.0, 10));
        // 10 % at frame 1, 90 % at frame 9
        assert!((attack_time(&envelope, 0.01) - 0.08).abs() < 1e-6);
        assert_eq!(attack_time(&[0.0; 5], 0.01), 0.0);
    }
}

//! Peak detection utilities
//!
//! Finds local maxima in 1D curves: onset-strength envelopes, autocorrelation
//! functions and harmonic salience spectra all go through [`find_peaks`].

const EPSILON: f32 = 1e-10;

/// Find peaks in a signal
///
/// Detects local maxima that reach an absolute threshold and are separated by
/// a minimum distance.
///
/// # Arguments
///
/// * `signal` - Signal to find peaks in
/// * `threshold` - Minimum peak height (absolute)
/// * `min_distance` - Minimum distance between kept peaks (in samples); when two
///   peaks are closer, the higher one wins
///
/// # Returns
///
/// Vector of (index, value) pairs, sorted by value (highest first)
///
/// # Algorithm
///
/// 1. Find all local maxima (`value > left && value >= right`, so plateaus
///    report their first sample)
/// 2. Boundary samples count when they exceed their single neighbour
/// 3. Filter by threshold
/// 4. Enforce minimum distance, greedily from the highest peak
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::period::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0.5, 2);
/// assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
/// ```
pub fn find_peaks(signal: &[f32], threshold: f32, min_distance: usize) -> Vec<(usize, f32)> {
    if signal.len() < 2 {
        return vec![];
    }

    let max_value = signal.iter().copied().fold(f32::MIN, f32::max);
    if max_value < EPSILON || max_value < threshold {
        return vec![];
    }

    let last = signal.len() - 1;
    let mut peaks = Vec::new();

    if signal[0] > signal[1] && signal[0] >= threshold {
        peaks.push((0, signal[0]));
    }

    for i in 1..last {
        let value = signal[i];
        if value > signal[i - 1] && value >= signal[i + 1] && value >= threshold {
            peaks.push((i, value));
        }
    }

    if signal[last] > signal[last - 1] && signal[last] >= threshold {
        peaks.push((last, signal[last]));
    }

    peaks.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    if min_distance > 1 && peaks.len() > 1 {
        let mut kept: Vec<(usize, f32)> = Vec::with_capacity(peaks.len());
        for (idx, value) in peaks {
            let too_close = kept
                .iter()
                .any(|(existing, _)| idx.abs_diff(*existing) < min_distance);
            if !too_close {
                kept.push((idx, value));
            }
        }
        peaks = kept;
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_peaks_basic() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        let peaks = find_peaks(&signal, 0.5, 2);
        assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
    }

    #[test]
    fn test_find_peaks_empty() {
        assert!(find_peaks(&[], 0.5, 2).is_empty());
        assert!(find_peaks(&[1.0], 0.5, 2).is_empty());
    }

    #[test]
    fn test_find_peaks_threshold() {
        let signal = vec![0.1, 0.2, 0.3, 0.4, 0.3, 0.2, 0.1];
        assert_eq!(find_peaks(&signal, 0.2, 1), vec![(3, 0.4)]);
        assert!(find_peaks(&signal, 0.5, 1).is_empty());
    }

    #[test]
    fn test_find_peaks_min_distance_keeps_higher() {
        let signal = vec![0.0, 0.5, 1.0, 0.8, 0.9, 0.3, 0.1];
        let peaks = find_peaks(&signal, 0.3, 3);
        assert_eq!(peaks, vec![(2, 1.0)]);
    }

    #[test]
    fn test_find_peaks_edges() {
        let peaks = find_peaks(&[1.0, 0.5, 0.3], 0.5, 1);
        assert_eq!(peaks, vec![(0, 1.0)]);

        let peaks = find_peaks(&[0.3, 0.5, 1.0], 0.5, 1);
        assert_eq!(peaks, vec![(2, 1.0)]);
    }

    #[test]
    fn test_find_peaks_plateau_reported_once() {
        let signal = vec![0.0, 1.0, 1.0, 1.0, 0.0];
        let peaks = find_peaks(&signal, 0.5, 1);
        assert_eq!(peaks, vec![(1, 1.0)]);
    }

    #[test]
    fn test_find_peaks_sorted() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2, 0.6, 0.1];
        let peaks = find_peaks(&signal, 0.3, 1);
        for pair in peaks.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(peaks.len(), 3);
    }
}

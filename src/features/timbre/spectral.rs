//! Per-frame spectral shape descriptors
//!
//! All functions take a magnitude spectrum (bins `0..=N/2`) and the frequency
//! spacing of its bins. Silent spectra yield 0.

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Fraction of spectral magnitude below the rolloff frequency
pub const ROLLOFF_FRACTION: f32 = 0.85;

/// Magnitude-weighted mean frequency (brightness)
pub fn spectral_centroid(magnitudes: &[f32], bin_hz: f32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f32 * bin_hz * m)
        .sum::<f32>()
        / total
}

/// Magnitude-weighted spread around the centroid
pub fn spectral_bandwidth(magnitudes: &[f32], bin_hz: f32, centroid_hz: f32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    let variance = magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| {
            let d = k as f32 * bin_hz - centroid_hz;
            m * d * d
        })
        .sum::<f32>()
        / total;
    variance.sqrt()
}

/// Frequency below which `fraction` of the total magnitude lies
pub fn spectral_rolloff(magnitudes: &[f32], bin_hz: f32, fraction: f32) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    let target = fraction * total;
    let mut cumulative = 0.0f32;
    for (k, &m) in magnitudes.iter().enumerate() {
        cumulative += m;
        if cumulative >= target {
            return k as f32 * bin_hz;
        }
    }
    (magnitudes.len().saturating_sub(1)) as f32 * bin_hz
}

/// Geometric over arithmetic mean of the power spectrum (0 = tonal, 1 = noise)
pub fn spectral_flatness(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let n = magnitudes.len() as f32;
    let arithmetic = magnitudes.iter().map(|&m| m * m).sum::<f32>() / n;
    if arithmetic <= EPSILON {
        return 0.0;
    }
    let log_mean = magnitudes
        .iter()
        .map(|&m| (m * m + EPSILON).ln())
        .sum::<f32>()
        / n;
    (log_mean.exp() / arithmetic).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_and_bandwidth() {
        // Two equal peaks at bins 2 and 6 with 10 Hz spacing
        let mut mags = vec![0.0f32; 9];
        mags[2] = 1.0;
        mags[6] = 1.0;
        let centroid = spectral_centroid(&mags, 10.0);
        assert!((centroid - 40.0).abs() < 1e-4);
        let bandwidth = spectral_bandwidth(&mags, 10.0, centroid);
        assert!((bandwidth - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_rolloff() {
        let mags = vec![1.0f32; 10];
        // 85% of 10 reached at the 9th bin (index 8)
        assert_eq!(spectral_rolloff(&mags, 5.0, ROLLOFF_FRACTION), 40.0);
    }

    #[test]
    fn test_flatness() {
        assert!((spectral_flatness(&[2.0; 16]) - 1.0).abs() < 1e-4);
        let mut peaked = vec![0.0f32; 16];
        peaked[3] = 1.0;
        assert!(spectral_flatness(&peaked) < 0.01);
        assert_eq!(spectral_flatness(&[0.0; 16]), 0.0);
    }

    #[test]
    fn test_silent_spectrum() {
        let mags = vec![0.0f32; 8];
        assert_eq!(spectral_centroid(&mags, 10.0), 0.0);
        assert_eq!(spectral_rolloff(&mags, 10.0, ROLLOFF_FRACTION), 0.0);
    }
}

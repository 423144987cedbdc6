//! Chroma normalization strategies

use super::Chroma;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Scale to unit L2 norm (zero vectors are returned unchanged)
pub fn normalize_l2(chroma: &Chroma) -> Chroma {
    let norm = chroma.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm <= EPSILON {
        return *chroma;
    }
    chroma.map(|x| x / norm)
}

/// Scale so the bins sum to 1 (zero vectors are returned unchanged)
pub fn normalize_sum(chroma: &Chroma) -> Chroma {
    let total: f32 = chroma.iter().sum();
    if total <= EPSILON {
        return *chroma;
    }
    chroma.map(|x| x / total)
}

/// Sharpen chroma vector to emphasize prominent semitones
///
/// # Arguments
///
/// * `chroma` - 12-element chroma vector
/// * `power` - Sharpening power (e.g., 1.5 or 2.0)
///
/// # Returns
///
/// Sharpened chroma vector (L2 normalized)
pub fn sharpen_chroma(chroma: &Chroma, power: f32) -> Chroma {
    normalize_l2(&chroma.map(|x| x.max(0.0).powf(power)))
}

/// True if the vector carries no energy
pub fn is_empty_chroma(chroma: &Chroma) -> bool {
    chroma.iter().all(|&x| x <= EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_l2() {
        let mut chroma = [0.0f32; 12];
        chroma[0] = 3.0;
        chroma[4] = 4.0;
        let n = normalize_l2(&chroma);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[4] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_sum_and_zero() {
        let mut chroma = [0.0f32; 12];
        chroma[1] = 1.0;
        chroma[2] = 3.0;
        let n = normalize_sum(&chroma);
        assert!((n[2] - 0.75).abs() < 1e-6);
        assert_eq!(normalize_sum(&[0.0; 12]), [0.0; 12]);
        assert!(is_empty_chroma(&[0.0; 12]));
        assert!(!is_empty_chroma(&chroma));
    }

    #[test]
    fn test_sharpen_emphasizes_peak() {
        let mut chroma = [0.1f32; 12];
        chroma[7] = 0.5;
        let sharp = sharpen_chroma(&chroma, 2.0);
        let plain = normalize_l2(&chroma);
        assert!(sharp[7] > plain[7]);
    }
}

//! Window functions for spectral leakage reduction

use std::f32::consts::PI;

/// Periodic Hann window of length `n`
///
/// # Example
///
/// ```
/// use stratum_transcribe::features::spectrum::window::hann_window;
///
/// let w = hann_window(4);
/// assert_eq!(w.len(), 4);
/// assert!(w[0].abs() < 1e-6);
/// assert!((w[2] - 1.0).abs() < 1e-6);
/// ```
pub fn hann_window(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

//! Silence detection
//!
//! Splits the signal into consecutive blocks, marks blocks whose RMS level
//! falls below a dBFS threshold, and reports runs of silent blocks that last
//! at least a minimum duration. The rhythm analyzer turns these spans into
//! rest markers for notation export.

use crate::io::Signal;
use serde::{Deserialize, Serialize};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Silence detection configuration
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Threshold in dBFS (default: -40.0)
    pub threshold_db: f32,

    /// Minimum span duration in seconds (default: 0.25)
    pub min_duration_seconds: f32,

    /// Block size for RMS analysis in samples (default: 512)
    pub frame_size: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            min_duration_seconds: 0.25,
            frame_size: 512,
        }
    }
}

/// A silent span, used as a rest marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,
}

impl Rest {
    /// Span length in seconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}

/// RMS level of a block in dBFS
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let rms = (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt();
    20.0 * (rms + EPSILON).log10()
}

/// Detect silent spans
///
/// # Arguments
///
/// * `signal` - Input signal
/// * `detector` - Silence detection configuration
///
/// # Returns
///
/// Silent spans in time order; the last span ends at the signal end when the
/// signal finishes in silence.
pub fn detect_silence(signal: &Signal<'_>, detector: &SilenceDetector) -> Vec<Rest> {
    let block = detector.frame_size.max(1);
    let samples = signal.samples();

    log::debug!(
        "Detecting silence in {} samples (threshold {:.1} dB, block {})",
        samples.len(),
        detector.threshold_db,
        block
    );

    let mut spans = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, chunk) in samples.chunks(block).enumerate() {
        let start_sample = i * block;
        let silent = rms_db(chunk) < detector.threshold_db;
        match (silent, run_start) {
            (true, None) => run_start = Some(start_sample),
            (false, Some(start)) => {
                spans.push((start, start_sample));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        spans.push((start, samples.len()));
    }

    let rests: Vec<Rest> = spans
        .into_iter()
        .map(|(start, end)| Rest {
            start: signal.time_of(start),
            end: signal.time_of(end),
        })
        .filter(|rest| rest.duration() >= detector.min_duration_seconds)
        .collect();

    log::debug!("Found {} silent spans", rests.len());
    rests
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SilenceDetector {
        SilenceDetector {
            threshold_db: -40.0,
            min_duration_seconds: 0.25,
            frame_size: 100,
        }
    }

    #[test]
    fn test_rms_db_levels() {
        assert!((rms_db(&[1.0, -1.0]) - 0.0).abs() < 1e-3);
        assert!((rms_db(&[0.1; 10]) + 20.0).abs() < 1e-3);
        assert!(rms_db(&[0.0; 10]) < -150.0);
    }

    #[test]
    fn test_detect_silence_middle_gap() {
        // 1 s tone, 0.5 s silence, 1 s tone at 1 kHz sample rate
        let mut samples = vec![0.5f32; 1000];
        samples.extend(vec![0.0f32; 500]);
        samples.extend(vec![0.5f32; 1000]);
        let signal = Signal::new(&samples, 1000).unwrap();

        let rests = detect_silence(&signal, &detector());
        assert_eq!(rests.len(), 1);
        assert!((rests[0].start - 1.0).abs() < 1e-6);
        assert!((rests[0].end - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_detect_silence_short_gap_ignored() {
        let mut samples = vec![0.5f32; 1000];
        samples.extend(vec![0.0f32; 200]);
        samples.extend(vec![0.5f32; 1000]);
        let signal = Signal::new(&samples, 1000).unwrap();
        assert!(detect_silence(&signal, &detector()).is_empty());
    }

    #[test]
    fn test_detect_silence_trailing() {
        let mut samples = vec![0.5f32; 500];
        samples.extend(vec![0.0f32; 550]);
        let signal = Signal::new(&samples, 1000).unwrap();
        let rests = detect_silence(&signal, &detector());
        assert_eq!(rests.len(), 1);
        assert!((rests[0].end - 1.05).abs() < 1e-6);
    }

    #[test]
    fn test_all_silent() {
        let samples = vec![0.0f32; 2000];
        let signal = Signal::new(&samples, 1000).unwrap();
        let rests = detect_silence(&signal, &detector());
        assert_eq!(rests, vec![Rest { start: 0.0, end: 2.0 }]);
    }
}

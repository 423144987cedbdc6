//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Schmuckler key profiles (24 keys)
//! - Pearson template matching
//! - Windowed key changes and consistency

pub mod detector;
pub mod key_changes;
pub mod templates;

pub use detector::{detect_key, pearson_correlation};
pub use key_changes::{detect_key_changes, key_windows, KeyChange, KeyChangeResult};
pub use templates::KeyTemplates;

use crate::analysis::result::KeyMode;

/// Correlation of a histogram with one key profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyScore {
    /// Tonic pitch class (0 = C)
    pub tonic: u8,

    /// Mode
    pub mode: KeyMode,

    /// Pearson correlation (-1.0 to 1.0)
    pub correlation: f32,
}

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Detected key (best match) with confidence
    pub key: crate::analysis::result::KeyEstimate,

    /// All 24 key scores (ranked, highest first)
    pub all_scores: Vec<KeyScore>,

    /// Top 3 keys, useful for ambiguous material
    pub top_keys: Vec<KeyScore>,
}

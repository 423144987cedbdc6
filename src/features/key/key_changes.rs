//! Key change detection
//!
//! Detects key changes (modulations) by running key detection over
//! overlapping time windows.
//!
//! # Algorithm
//!
//! 1. Divide the recording into windows stepped by half a window
//! 2. Detect key for each window with a non-empty histogram
//! 3. Identify key changes when consecutive window keys differ
//! 4. Report consistency: the share of windows agreeing with the global key

use super::{detector::detect_key, templates::KeyTemplates};
use crate::analysis::result::KeyEstimate;
use crate::features::chroma::normalization::is_empty_chroma;
use crate::features::chroma::Chroma;
use serde::{Deserialize, Serialize};

/// Key change information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    /// Timestamp of key change (in seconds)
    pub timestamp: f32,

    /// Key before change
    pub from_key: KeyEstimate,

    /// Key after change
    pub to_key: KeyEstimate,

    /// Confidence of key change (0.0-1.0)
    pub confidence: f32,
}

/// Key change detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChangeResult {
    /// Share of analysed windows whose key matches the global key (0.0-1.0)
    pub consistency: f32,

    /// Detected key changes (sorted by timestamp)
    pub key_changes: Vec<KeyChange>,

    /// Window start time and key for every analysed window
    pub segment_keys: Vec<(f32, KeyEstimate)>,
}

/// Window spans `(start, end)` covering `[0, duration_seconds)` at half-window stride
///
/// A recording shorter than one window yields a single span over the whole
/// recording.
pub fn key_windows(duration_seconds: f32, window_seconds: f32) -> Vec<(f32, f32)> {
    if duration_seconds <= 0.0 || window_seconds <= 0.0 {
        return Vec::new();
    }
    if duration_seconds <= window_seconds {
        return vec![(0.0, duration_seconds)];
    }

    let stride = window_seconds / 2.0;
    let mut windows = Vec::new();
    let mut start = 0.0f32;
    while start < duration_seconds {
        let end = (start + window_seconds).min(duration_seconds);
        windows.push((start, end));
        if end >= duration_seconds {
            break;
        }
        start += stride;
    }
    windows
}

/// Detect key changes across windowed histograms
///
/// # Arguments
///
/// * `segments` - Window start time and pitch-class histogram, time ordered
/// * `global_key` - Key detected over the whole recording
/// * `templates` - Key templates
///
/// # Returns
///
/// Consistency, key changes and per-window keys. Windows with an empty
/// histogram are skipped; with no analysable window the consistency is 1.0.
pub fn detect_key_changes(
    segments: &[(f32, Chroma)],
    global_key: &KeyEstimate,
    templates: &KeyTemplates,
) -> KeyChangeResult {
    let segment_keys: Vec<(f32, KeyEstimate)> = segments
        .iter()
        .filter(|(_, chroma)| !is_empty_chroma(chroma))
        .map(|(time, chroma)| (*time, detect_key(chroma, templates).key))
        .collect();

    if segment_keys.is_empty() {
        log::debug!("No analysable key windows");
        return KeyChangeResult {
            consistency: 1.0,
            key_changes: Vec::new(),
            segment_keys,
        };
    }

    let agreeing = segment_keys
        .iter()
        .filter(|(_, key)| same_key(key, global_key))
        .count();
    let consistency = agreeing as f32 / segment_keys.len() as f32;

    let key_changes: Vec<KeyChange> = segment_keys
        .windows(2)
        .filter(|pair| !same_key(&pair[0].1, &pair[1].1))
        .map(|pair| KeyChange {
            timestamp: pair[1].0,
            from_key: pair[0].1,
            to_key: pair[1].1,
            confidence: (pair[0].1.confidence + pair[1].1.confidence) / 2.0,
        })
        .collect();

    log::debug!(
        "Key windows: {} analysed, {} changes, consistency {:.2}",
        segment_keys.len(),
        key_changes.len(),
        consistency
    );

    KeyChangeResult {
        consistency,
        key_changes,
        segment_keys,
    }
}

fn same_key(a: &KeyEstimate, b: &KeyEstimate) -> bool {
    a.tonic == b.tonic && a.mode == b.mode
}

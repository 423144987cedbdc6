//! Chord progression statistics

use super::Chord;
use crate::analysis::result::KeyEstimate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of entries kept in [`ChordStatistics::most_common`]
const MOST_COMMON_LIMIT: usize = 5;

/// Summary of a chord progression
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChordStatistics {
    /// Most frequent chord symbols with span counts, most frequent first
    pub most_common: Vec<(String, usize)>,

    /// Number of distinct chord symbols
    pub unique_chords: usize,

    /// Number of chord spans
    pub total_chords: usize,

    /// Fraction of spans whose root is diatonic to the key (0.0-1.0)
    pub tonal_stability: f32,
}

impl ChordStatistics {
    /// Compute statistics for a progression in `key`
    ///
    /// Equal counts keep first-appearance order.
    pub fn compute(chords: &[Chord], key: &KeyEstimate) -> Self {
        if chords.is_empty() {
            return Self::default();
        }

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for chord in chords {
            let name = chord.name();
            let count = counts.entry(name.clone()).or_insert(0);
            if *count == 0 {
                order.push(name);
            }
            *count += 1;
        }

        let mut most_common: Vec<(String, usize)> = order
            .into_iter()
            .map(|name| {
                let count = counts.get(&name).copied().unwrap_or(0);
                (name, count)
            })
            .collect();
        most_common.sort_by(|a, b| b.1.cmp(&a.1));
        let unique_chords = most_common.len();
        most_common.truncate(MOST_COMMON_LIMIT);

        let in_key = chords.iter().filter(|c| key.is_diatonic(c.root)).count();

        Self {
            most_common,
            unique_chords,
            total_chords: chords.len(),
            tonal_stability: in_key as f32 / chords.len() as f32,
        }
    }
}

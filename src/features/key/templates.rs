//! Krumhansl-Schmuckler key profiles
//!
//! Krumhansl-Kessler tonal-hierarchy ratings for 24 keys (12 major + 12
//! minor), obtained by rotating the C major and C minor profiles.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

use crate::analysis::result::KeyMode;
use crate::features::chroma::Chroma;

/// C major tonal-hierarchy profile
const MAJOR_PROFILE: Chroma = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// C minor tonal-hierarchy profile
const MINOR_PROFILE: Chroma = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [Chroma; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [Chroma; 12],
}

impl KeyTemplates {
    /// Create key templates from the Krumhansl-Schmuckler profiles
    pub fn new() -> Self {
        Self {
            major: std::array::from_fn(|tonic| rotate(&MAJOR_PROFILE, tonic)),
            minor: std::array::from_fn(|tonic| rotate(&MINOR_PROFILE, tonic)),
        }
    }

    /// Template for a tonic and mode
    pub fn get(&self, tonic: u8, mode: KeyMode) -> &Chroma {
        let idx = tonic as usize % 12;
        match mode {
            KeyMode::Major => &self.major[idx],
            KeyMode::Minor => &self.minor[idx],
        }
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate a C-based profile so that index `tonic` holds the tonic weight
fn rotate(profile: &Chroma, tonic: usize) -> Chroma {
    std::array::from_fn(|pc| profile[(pc + 12 - tonic) % 12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_rotation() {
        let templates = KeyTemplates::new();
        assert_eq!(templates.major[0], MAJOR_PROFILE);
        // G major: tonic weight at index 7, dominant (D) at index 2
        assert_eq!(templates.major[7][7], 6.35);
        assert_eq!(templates.major[7][2], 5.19);
        // A minor: tonic at 9, minor third (C) at 0
        assert_eq!(templates.minor[9][9], 6.33);
        assert_eq!(templates.minor[9][0], 5.38);
    }

    #[test]
    fn test_get() {
        let templates = KeyTemplates::default();
        assert_eq!(templates.get(2, KeyMode::Minor), &templates.minor[2]);
        assert_eq!(templates.get(14, KeyMode::Major), &templates.major[2]);
    }
}

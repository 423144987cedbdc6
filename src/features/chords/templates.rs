//! Chord templates
//!
//! Binary pitch-class templates for seven chord qualities, transposed to all
//! twelve roots and normalized to unit length so that a dot product with a
//! unit-length histogram is the cosine similarity.

use crate::features::chroma::normalization::normalize_l2;
use crate::features::chroma::Chroma;
use serde::{Deserialize, Serialize};

/// Chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordQuality {
    /// Major triad
    Major,
    /// Minor triad
    Minor,
    /// Diminished triad
    Diminished,
    /// Augmented triad
    Augmented,
    /// Major seventh
    Major7,
    /// Minor seventh
    Minor7,
    /// Dominant seventh
    Dominant7,
}

impl ChordQuality {
    /// All qualities in matching order
    pub const ALL: [ChordQuality; 7] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Dominant7,
    ];

    /// Semitone intervals above the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
        }
    }

    /// Symbol suffix ("" for major)
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Dominant7 => "7",
        }
    }
}

/// Best template match for one histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordMatch {
    /// Root pitch class
    pub root: u8,
    /// Quality
    pub quality: ChordQuality,
    /// Cosine similarity (0.0-1.0 for non-negative input)
    pub similarity: f32,
}

/// Unit-length templates for every root and quality
#[derive(Debug, Clone)]
pub struct ChordTemplates {
    templates: Vec<(u8, ChordQuality, Chroma)>,
}

impl ChordTemplates {
    /// Build the 84 templates
    pub fn new() -> Self {
        let mut templates = Vec::with_capacity(12 * ChordQuality::ALL.len());
        for root in 0..12u8 {
            for quality in ChordQuality::ALL {
                let mut template = [0.0f32; 12];
                for &interval in quality.intervals() {
                    template[((root + interval) % 12) as usize] = 1.0;
                }
                templates.push((root, quality, normalize_l2(&template)));
            }
        }
        Self { templates }
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if there are no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Best-matching template by cosine similarity
    ///
    /// Ties go to the lower root, then to the earlier quality. Returns `None`
    /// for a histogram with no energy.
    pub fn best_match(&self, chroma: &Chroma) -> Option<ChordMatch> {
        let unit = normalize_l2(chroma);
        if unit.iter().all(|&x| x <= 0.0) {
            return None;
        }

        let mut best: Option<ChordMatch> = None;
        for (root, quality, template) in &self.templates {
            let similarity: f32 = unit.iter().zip(template).map(|(a, b)| a * b).sum();
            if best.is_none_or(|b| similarity > b.similarity) {
                best = Some(ChordMatch {
                    root: *root,
                    quality: *quality,
                    similarity,
                });
            }
        }
        best
    }
}

impl Default for ChordTemplates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroma_of(pcs: &[usize]) -> Chroma {
        let mut chroma = [0.0f32; 12];
        for &pc in pcs {
            chroma[pc] = 1.0;
        }
        chroma
    }

    #[test]
    fn test_template_count() {
        assert_eq!(ChordTemplates::new().len(), 84);
    }

    #[test]
    fn test_best_match_triads() {
        let templates = ChordTemplates::new();

        let c_major = templates.best_match(&chroma_of(&[0, 4, 7])).unwrap();
        assert_eq!((c_major.root, c_major.quality), (0, ChordQuality::Major));
        assert!((c_major.similarity - 1.0).abs() < 1e-5);

        let a_minor = templates.best_match(&chroma_of(&[9, 0, 4])).unwrap();
        assert_eq!((a_minor.root, a_minor.quality), (9, ChordQuality::Minor));

        let b_dim = templates.best_match(&chroma_of(&[11, 2, 5])).unwrap();
        assert_eq!((b_dim.root, b_dim.quality), (11, ChordQuality::Diminished));
    }

    #[test]
    fn test_best_match_sevenths() {
        let templates = ChordTemplates::new();
        let g7 = templates.best_match(&chroma_of(&[7, 11, 2, 5])).unwrap();
        assert_eq!((g7.root, g7.quality), (7, ChordQuality::Dominant7));
        let cmaj7 = templates.best_match(&chroma_of(&[0, 4, 7, 11])).unwrap();
        assert_eq!((cmaj7.root, cmaj7.quality), (0, ChordQuality::Major7));
    }

    #[test]
    fn test_best_match_empty() {
        assert!(ChordTemplates::new().best_match(&[0.0; 12]).is_none());
    }
}

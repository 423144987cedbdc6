//! Chroma extraction modules
//!
//! 12-bin pitch-class distributions, from audio or from a note sequence:
//! - STFT chroma extraction
//! - Duration-weighted note chroma
//! - Normalization strategies

pub mod extractor;
pub mod normalization;

pub use extractor::{chroma_from_notes, extract_chroma, sum_chroma};

/// Pitch-class energy, index 0 = C
pub type Chroma = [f32; 12];

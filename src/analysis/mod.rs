//! Analysis and result aggregation modules
//!
//! Combines stage outputs into the final transcription:
//! - Harmonic analysis (key, chords)
//! - Instrument classification
//! - Result types
//! - Metadata and low-confidence flags

pub mod harmony;
pub mod instrument;
pub mod metadata;
pub mod result;

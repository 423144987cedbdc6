//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Spectrum (windowed FFT)
//! - Pitch estimation (per-frame fundamental)
//! - Onset detection (spectral flux + adaptive threshold)
//! - Period estimation (BPM detection)
//! - Beat tracking (dynamic programming) and meter
//! - Chroma extraction
//! - Key detection and chord recognition
//! - Timbral features

pub mod beat_tracking;
pub mod chords;
pub mod chroma;
pub mod key;
pub mod onset;
pub mod period;
pub mod pitch;
pub mod spectrum;
pub mod timbre;

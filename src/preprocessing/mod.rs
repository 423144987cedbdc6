//! Audio preprocessing modules
//!
//! Utilities that sit between the external decoder and the analysis stages:
//! - Channel mixing (interleaved / stereo to mono)
//! - Silence detection (rest markers)

pub mod channel_mixer;
pub mod silence;

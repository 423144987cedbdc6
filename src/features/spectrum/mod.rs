//! Short-time spectral analysis
//!
//! - Window functions
//! - Per-frame magnitude spectra (rustfft)
//! - Sub-bin peak interpolation

pub mod stft;
pub mod window;

pub use stft::{magnitude_spectrogram, FrameSpectrum, SpectrumAnalyzer};
pub use window::hann_window;

//! Borrowed view of a decoded mono signal

use super::frames::Frames;
use crate::error::TranscriptionError;

/// Immutable mono signal: samples plus sample rate
///
/// The samples are owned by the caller for the lifetime of one request; every
/// analysis stage receives this view by reference.
#[derive(Debug, Clone, Copy)]
pub struct Signal<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> Signal<'a> {
    /// Wrap decoded samples, rejecting structurally invalid input
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::InvalidInput` if the buffer is empty, the
    /// sample rate is zero, or a sample is NaN/infinite.
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self, TranscriptionError> {
        if samples.is_empty() {
            return Err(TranscriptionError::InvalidInput(
                "Empty audio samples".to_string(),
            ));
        }

        if sample_rate == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }

        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(TranscriptionError::InvalidInput(format!(
                "Non-finite sample at index {}",
                pos
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Raw samples
    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal; present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Convert a sample index to seconds
    pub fn time_of(&self, sample_index: usize) -> f32 {
        sample_index as f32 / self.sample_rate as f32
    }

    /// Leading part of the signal, at most `seconds` long
    pub fn head(&self, seconds: f32) -> Signal<'a> {
        let n = ((seconds.max(0.0) * self.sample_rate as f32) as usize)
            .clamp(1, self.samples.len());
        Signal {
            samples: &self.samples[..n],
            sample_rate: self.sample_rate,
        }
    }

    /// Lazy sequence of overlapping frames
    pub fn frames(&self, window_size: usize, hop_size: usize) -> Frames<'a> {
        Frames::new(self.samples, self.sample_rate, window_size, hop_size)
    }
}

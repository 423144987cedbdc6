//! Error types for the transcription engine

use std::fmt;

/// Errors that can occur during transcription
///
/// Only structural precondition violations surface here. Weak or absent
/// detections (silent frames, unreliable tempo, ambiguous key) are reported
/// through [`crate::analysis::result::TranscriptionFlag`] with a fallback value
/// substituted, never as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    /// Invalid input signal (empty, zero duration, bad sample rate, non-finite samples)
    InvalidInput(String),

    /// Out-of-range configuration value
    InvalidConfig(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (overflow, underflow, etc.)
    NumericalError(String),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TranscriptionError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            TranscriptionError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            TranscriptionError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for TranscriptionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranscriptionError::InvalidInput("Empty audio samples".to_string());
        assert_eq!(err.to_string(), "Invalid input: Empty audio samples");

        let err = TranscriptionError::InvalidConfig("hop_size must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: hop_size must be > 0");
    }
}

//! Channel mixing utilities (multichannel to mono conversion)
//!
//! The transcription engine analyses a single channel. Decode adapters hand
//! over interleaved frames; these helpers fold them down before a
//! [`crate::io::Signal`] is built.

use crate::error::TranscriptionError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMixMode {
    /// Average of all channels
    #[default]
    Average,
    /// Per-frame sample with the largest magnitude
    Dominant,
    /// First channel only
    First,
}

/// Downmix interleaved multichannel samples to mono
///
/// # Arguments
///
/// * `interleaved` - Samples ordered `[c0, c1, …, c0, c1, …]`
/// * `channels` - Channel count
/// * `mode` - Mixing mode
///
/// # Returns
///
/// One sample per frame
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` if `channels` is zero or the
/// buffer length is not a whole number of frames.
///
/// # Example
///
/// ```
/// use stratum_transcribe::preprocessing::channel_mixer::{downmix_interleaved, ChannelMixMode};
///
/// let stereo = [1.0, 0.0, 0.5, 0.5];
/// let mono = downmix_interleaved(&stereo, 2, ChannelMixMode::Average)?;
/// assert_eq!(mono, vec![0.5, 0.5]);
/// # Ok::<(), stratum_transcribe::TranscriptionError>(())
/// ```
pub fn downmix_interleaved(
    interleaved: &[f32],
    channels: usize,
    mode: ChannelMixMode,
) -> Result<Vec<f32>, TranscriptionError> {
    if channels == 0 {
        return Err(TranscriptionError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if !interleaved.len().is_multiple_of(channels) {
        return Err(TranscriptionError::InvalidInput(format!(
            "{} samples is not a whole number of {}-channel frames",
            interleaved.len(),
            channels
        )));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::debug!(
        "Downmixing {} frames of {} channels using {:?}",
        interleaved.len() / channels,
        channels,
        mode
    );

    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| mix_frame(frame, mode))
        .collect())
}

/// Convert separate left/right buffers to mono
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` if the channels differ in length.
pub fn stereo_to_mono(
    left: &[f32],
    right: &[f32],
    mode: ChannelMixMode,
) -> Result<Vec<f32>, TranscriptionError> {
    if left.len() != right.len() {
        return Err(TranscriptionError::InvalidInput(format!(
            "Channel length mismatch: left={}, right={}",
            left.len(),
            right.len()
        )));
    }

    Ok(left
        .iter()
        .zip(right)
        .map(|(&l, &r)| mix_frame(&[l, r], mode))
        .collect())
}

fn mix_frame(frame: &[f32], mode: ChannelMixMode) -> f32 {
    match mode {
        ChannelMixMode::Average => frame.iter().sum::<f32>() / frame.len() as f32,
        ChannelMixMode::Dominant => frame
            .iter()
            .copied()
            .fold(0.0f32, |acc, x| if x.abs() > acc.abs() { x } else { acc }),
        ChannelMixMode::First => frame[0],
    }
}

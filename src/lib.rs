//! # Stratum Transcribe
//!
//! An audio-to-symbolic music transcription engine: turns a mono recording
//! into a note sequence with tempo, meter, key, chords and export plans for
//! MIDI and notation.
//!
//! ## Features
//!
//! - **Note Detection**: Per-frame spectral pitch estimation with three
//!   segmentation strategies (run consolidation, onset segmentation,
//!   harmonic-salience polyphony)
//! - **Rhythm**: Autocorrelation tempo with a perceptual prior, dynamic
//!   programming beat tracking, 3/4 vs 4/4 meter, rest detection
//! - **Post-Processing**: Overlap resolution, strength-blended quantization,
//!   smoothed dynamics
//! - **Harmony**: Krumhansl-Schmuckler key detection, template chord recognition
//! - **Instrument**: Timbral features scored against heuristic profiles
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_transcribe::{transcribe_audio, TranscriptionConfig};
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let result = transcribe_audio(&samples, sample_rate, TranscriptionConfig::default())?;
//!
//! println!("Tempo: {:.1} BPM, meter {}", result.beat_grid.tempo_bpm, result.beat_grid.time_signature);
//! println!("Key: {} (confidence: {:.2})", result.key.name(), result.key.confidence);
//! for note in &result.notes {
//!     println!("{} at {:.3}s for {:.3}s", note.name(), note.onset, note.duration);
//! }
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal ─┬─ Pitch Estimator → Segmenter (consolidation | onset | polyphonic) ─┐
//!         └─ Rhythm Analyzer (tempo, beats, meter, rests) ─────────────────────┴→ Post-Processor
//!                                                                                   │
//!                                    Harmonic Analyzer (key, chords) ←──────────────┤
//!                                    Instrument Classifier (independent)            ↓
//!                                                                        MIDI / notation plans
//! ```
//!
//! The rhythm and note-detection branches read the same immutable signal and
//! run in parallel; they join before post-processing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod transcription;

// Re-export main types
pub use analysis::metadata::{TranscriptionFlag, TranscriptionMetadata};
pub use analysis::result::{BeatGrid, KeyEstimate, KeyMode, TranscriptionResult};
pub use config::{TranscriptionConfig, TranscriptionMode};
pub use error::TranscriptionError;
pub use export::{MidiExport, MidiExportOptions, NotationExport};
pub use features::beat_tracking::TimeSignature;
pub use transcription::Note;

use analysis::harmony::analyze_harmony;
use analysis::instrument::classify_instrument;
use analysis::result::MusicalStructure;
use features::beat_tracking::analyze_rhythm;
use io::Signal;
use preprocessing::channel_mixer::{downmix_interleaved, ChannelMixMode};
use transcription::{detect_notes, PostProcessor, Voicing};

/// Main transcription function
///
/// Transcribes mono audio samples into notes, beat grid, key, chords and
/// metadata.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Transcription configuration
///
/// # Returns
///
/// `TranscriptionResult` with the final note sequence and analyses. Weak
/// detections never fail: fallbacks are substituted and reported through
/// `metadata.flags`.
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidConfig` for out-of-range configuration
/// and `TranscriptionError::InvalidInput` for an empty signal, a zero sample
/// rate or non-finite samples.
///
/// # Example
///
/// ```no_run
/// use stratum_transcribe::{transcribe_audio, TranscriptionConfig};
///
/// let samples = vec![0.0f32; 44100 * 5]; // 5 seconds of silence
/// let result = transcribe_audio(&samples, 44100, TranscriptionConfig::default())?;
/// assert!(result.notes.is_empty());
/// # Ok::<(), stratum_transcribe::TranscriptionError>(())
/// ```
pub fn transcribe_audio(
    samples: &[f32],
    sample_rate: u32,
    config: TranscriptionConfig,
) -> Result<TranscriptionResult, TranscriptionError> {
    use std::time::Instant;
    let start_time = Instant::now();

    config.validate()?;
    let signal = Signal::new(samples, sample_rate)?;

    log::debug!(
        "Starting transcription: {} samples at {} Hz ({} mode)",
        signal.len(),
        sample_rate,
        config.mode.name()
    );

    // Rhythm and note detection share only the read-only signal
    let (rhythm, raw_notes) = rayon::join(
        || analyze_rhythm(&signal, &config),
        || detect_notes(&signal, &config),
    );
    let rhythm = rhythm?;
    let raw_notes = raw_notes?;

    let voicing = if config.mode.is_polyphonic() {
        Voicing::Polyphonic
    } else {
        Voicing::Monophonic
    };
    let notes = PostProcessor::new(&config, &rhythm.beat_grid, rhythm.downbeat_offset, voicing)
        .process(raw_notes);

    let harmony = analyze_harmony(&notes, &signal, &config);

    let instrument = config.classify_instrument.then(|| {
        classify_instrument(
            &signal.head(config.instrument_segment_seconds),
            config.window_size,
            config.hop_size,
        )
    });

    let duration_seconds = signal.duration_seconds();
    let structure = MusicalStructure::summarize(&notes, &rhythm.beat_grid, duration_seconds);

    let mut metadata = TranscriptionMetadata::new(duration_seconds, sample_rate, config.mode);
    metadata.tempo_confidence = rhythm.tempo_confidence;
    metadata.time_signature_confidence = rhythm.time_signature_confidence;
    for &flag in rhythm.flags.iter().chain(&harmony.flags) {
        metadata.raise(flag);
    }
    if notes.is_empty() {
        log::warn!("No notes detected");
        metadata.raise(TranscriptionFlag::NoNotesDetected);
    }
    metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "Transcription complete: {} notes, {:.1} BPM {}, key {} in {:.1} ms",
        notes.len(),
        rhythm.beat_grid.tempo_bpm,
        rhythm.beat_grid.time_signature,
        harmony.key.name(),
        metadata.processing_time_ms
    );

    Ok(TranscriptionResult {
        notes,
        beat_grid: rhythm.beat_grid,
        downbeat_offset: rhythm.downbeat_offset,
        rests: rhythm.rests,
        key: harmony.key,
        key_consistency: harmony.key_consistency,
        key_changes: harmony.key_changes,
        chords: harmony.chords,
        chord_statistics: harmony.chord_statistics,
        chord_notes: harmony.chord_notes,
        instrument,
        structure,
        metadata,
    })
}

/// Transcribe interleaved multi-channel audio
///
/// Channels are averaged to mono before [`transcribe_audio`] runs.
///
/// # Errors
///
/// Returns `TranscriptionError::InvalidInput` if `channels` is 0 or the sample
/// count is not a multiple of it, plus every error of [`transcribe_audio`].
pub fn transcribe_interleaved(
    samples: &[f32],
    channels: usize,
    sample_rate: u32,
    config: TranscriptionConfig,
) -> Result<TranscriptionResult, TranscriptionError> {
    let mono = downmix_interleaved(samples, channels, ChannelMixMode::Average)?;
    transcribe_audio(&mono, sample_rate, config)
}

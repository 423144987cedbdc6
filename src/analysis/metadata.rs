//! Transcription metadata and low-confidence flags

use crate::config::TranscriptionMode;
use serde::{Deserialize, Serialize};

/// Conditions where a detection was weak and a fallback or best guess was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranscriptionFlag {
    /// Tempo could not be detected reliably; the fallback grid was used
    TempoFallback,
    /// Too little beat evidence for meter detection; fallback meter used
    TimeSignatureAssumed,
    /// Key correlation margin below the configured threshold
    LowKeyConfidence,
    /// Windowed key estimates disagree with the global key
    UnstableKey,
    /// The signal produced no notes
    NoNotesDetected,
}

impl TranscriptionFlag {
    /// Human-readable warning for `confidence_warnings`
    pub fn warning(&self) -> &'static str {
        match self {
            TranscriptionFlag::TempoFallback => {
                "Tempo detection confidence insufficient; fallback tempo used"
            }
            TranscriptionFlag::TimeSignatureAssumed => {
                "Time signature could not be determined; fallback meter used"
            }
            TranscriptionFlag::LowKeyConfidence => "Key estimate is a best guess (low confidence)",
            TranscriptionFlag::UnstableKey => "Key varies across the recording",
            TranscriptionFlag::NoNotesDetected => "No notes detected",
        }
    }
}

/// Transcription metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Note detection strategy used
    pub mode: TranscriptionMode,

    /// Tempo confidence (0.0-1.0)
    pub tempo_confidence: f32,

    /// Time signature confidence (0.0-1.0)
    pub time_signature_confidence: f32,

    /// Low-confidence conditions, each listed once
    pub flags: Vec<TranscriptionFlag>,

    /// Confidence warnings matching `flags`
    pub confidence_warnings: Vec<String>,
}

impl TranscriptionMetadata {
    /// Empty metadata for a request
    pub fn new(duration_seconds: f32, sample_rate: u32, mode: TranscriptionMode) -> Self {
        Self {
            duration_seconds,
            sample_rate,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            mode,
            tempo_confidence: 0.0,
            time_signature_confidence: 0.0,
            flags: vec![],
            confidence_warnings: vec![],
        }
    }

    /// Record a flag and its warning (no-op if already present)
    pub fn raise(&mut self, flag: TranscriptionFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
            self.confidence_warnings.push(flag.warning().to_string());
        }
    }

    /// True if `flag` was raised
    pub fn has_flag(&self, flag: TranscriptionFlag) -> bool {
        self.flags.contains(&flag)
    }
}

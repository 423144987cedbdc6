//! Timbral feature extraction
//!
//! Summarizes a signal's spectral shape and envelope into a fixed feature
//! vector for instrument classification:
//! - Spectral centroid, bandwidth and rolloff (mean over voiced frames)
//! - Spectral flatness and its complement, harmonicity
//! - 13 MFCCs (mean over voiced frames)
//! - Zero-crossing rate and attack time
//!
//! # Example
//!
//! ```no_run
//! use stratum_transcribe::features::timbre::extract_timbre;
//! use stratum_transcribe::io::Signal;
//!
//! # let samples = vec![0.0f32; 44100];
//! let signal = Signal::new(&samples, 44100)?;
//! let timbre = extract_timbre(&signal, 2048, 512);
//! println!("centroid: {:.0} Hz", timbre.spectral_centroid_hz);
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

pub mod mfcc;
pub mod spectral;
pub mod temporal;

use crate::features::spectrum::SpectrumAnalyzer;
use crate::io::Signal;
use mfcc::{MelFilterbank, NUM_MEL_BANDS, NUM_MFCC};
use serde::{Deserialize, Serialize};

/// Timbral summary of a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimbreFeatures {
    /// Mean spectral centroid in Hz
    pub spectral_centroid_hz: f32,

    /// Mean spectral bandwidth in Hz
    pub spectral_bandwidth_hz: f32,

    /// Mean 85 % rolloff frequency in Hz
    pub spectral_rolloff_hz: f32,

    /// Mean spectral flatness (0.0-1.0)
    pub spectral_flatness: f32,

    /// `1 - spectral_flatness`
    pub harmonic_ratio: f32,

    /// Zero crossings per sample
    pub zero_crossing_rate: f32,

    /// 10 %-90 % envelope rise time in seconds
    pub attack_time: f32,

    /// Mean MFCCs
    pub mfcc: [f32; NUM_MFCC],
}

/// Extract timbral features from a signal
///
/// Silent frames are excluded from the spectral means. A fully silent signal
/// yields all-zero spectral features and a harmonic ratio of 1.
pub fn extract_timbre(signal: &Signal<'_>, window_size: usize, hop_size: usize) -> TimbreFeatures {
    let sample_rate = signal.sample_rate();
    let mut analyzer = SpectrumAnalyzer::new(window_size);
    let bin_hz = analyzer.bin_frequency(1.0, sample_rate);
    let filterbank = MelFilterbank::new(NUM_MEL_BANDS, analyzer.num_bins(), sample_rate);

    let mut envelope = Vec::new();
    let mut voiced = 0usize;
    let mut centroid = 0.0f32;
    let mut bandwidth = 0.0f32;
    let mut rolloff = 0.0f32;
    let mut flatness = 0.0f32;
    let mut mfcc = [0.0f32; NUM_MFCC];

    for frame in signal.frames(window_size, hop_size) {
        let spectrum = analyzer.analyze(frame.samples);
        envelope.push(spectrum.rms);
        if spectrum.is_silent() {
            continue;
        }

        let mags = &spectrum.magnitudes;
        let c = spectral::spectral_centroid(mags, bin_hz);
        centroid += c;
        bandwidth += spectral::spectral_bandwidth(mags, bin_hz, c);
        rolloff += spectral::spectral_rolloff(mags, bin_hz, spectral::ROLLOFF_FRACTION);
        flatness += spectral::spectral_flatness(mags);
        for (acc, x) in mfcc.iter_mut().zip(filterbank.mfcc(mags)) {
            *acc += x;
        }
        voiced += 1;
    }

    if voiced > 0 {
        let n = voiced as f32;
        centroid /= n;
        bandwidth /= n;
        rolloff /= n;
        flatness /= n;
        for x in &mut mfcc {
            *x /= n;
        }
    }

    let frame_period = hop_size as f32 / sample_rate as f32;
    let features = TimbreFeatures {
        spectral_centroid_hz: centroid,
        spectral_bandwidth_hz: bandwidth,
        spectral_rolloff_hz: rolloff,
        spectral_flatness: flatness,
        harmonic_ratio: 1.0 - flatness,
        zero_crossing_rate: temporal::zero_crossing_rate(signal.samples()),
        attack_time: temporal::attack_time(&envelope, frame_period),
        mfcc,
    };

    log::debug!(
        "Timbre: centroid {:.0} Hz, flatness {:.3}, zcr {:.4}, attack {:.3}s over {} voiced frames",
        features.spectral_centroid_hz,
        features.spectral_flatness,
        features.zero_crossing_rate,
        features.attack_time,
        voiced
    );

    features
}

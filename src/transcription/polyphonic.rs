//! Polyphonic note detection
//!
//! Per frame, a harmonic-product-like salience curve reinforces fundamentals
//! whose harmonics are present:
//!
//! ```text
//! s[k] = |X[k]| · Π_{h=2..H} (1 + |X[h·k]| / max|X|)
//! ```
//!
//! Up to `max_polyphony` salience peaks above `salience_threshold × max s`
//! become pitch candidates. Each sounding pitch owns a lane in a pitch-indexed
//! map; a lane stays open while its pitch keeps being observed and closes once
//! it has been missing for more than `gap_tolerance_frames` frames, so one
//! dropped frame does not split a note.
//!
//! # Example
//!
//! ```no_run
//! use stratum_transcribe::transcription::PolyphonicDetector;
//! use stratum_transcribe::io::Signal;
//! use stratum_transcribe::TranscriptionConfig;
//!
//! let samples = vec![0.0f32; 44100];
//! let signal = Signal::new(&samples, 44100)?;
//! let notes = PolyphonicDetector::from_config(&TranscriptionConfig::default()).detect(&signal);
//! # Ok::<(), stratum_transcribe::TranscriptionError>(())
//! ```

use super::Note;
use crate::config::TranscriptionConfig;
use crate::features::period::peak_picking::find_peaks;
use crate::features::pitch::frequency_to_semitone;
use crate::features::spectrum::stft::{interpolate_peak, FrameSpectrum, SpectrumAnalyzer};
use crate::io::Signal;
use std::collections::BTreeMap;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Velocity bounds for lane notes
const MIN_LANE_VELOCITY: f32 = 20.0;
const MAX_LANE_VELOCITY: f32 = 127.0;

/// One pitch candidate in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchPeak {
    /// Interpolated frequency in Hz
    pub frequency_hz: f32,

    /// Nearest MIDI pitch
    pub pitch: u8,

    /// Salience relative to the frame maximum (0.0-1.0)
    pub salience: f32,
}

/// Open note for one pitch
#[derive(Debug, Clone, Copy)]
struct LaneState {
    start_time: f32,
    last_seen_frame: usize,
    last_seen_time: f32,
    salience_sum: f32,
    observations: u32,
}

impl LaneState {
    fn into_note(self, pitch: u8, hop_seconds: f32, min_duration: f32) -> Option<Note> {
        let duration = self.last_seen_time + hop_seconds - self.start_time;
        if duration < min_duration || duration <= 0.0 {
            return None;
        }
        let mean = self.salience_sum / self.observations.max(1) as f32;
        let velocity = (mean * 127.0).round().clamp(MIN_LANE_VELOCITY, MAX_LANE_VELOCITY) as u8;
        Some(Note::new(pitch, self.start_time, duration, velocity))
    }
}

/// Pitch-indexed lanes fed one frame of pitch candidates at a time
///
/// A lane opens when its pitch first appears, continues while the pitch keeps
/// being observed, and closes once `frame - last_seen_frame` exceeds the gap
/// tolerance. A closed lane ends one hop after its last observation.
///
/// # Example
///
/// ```
/// use stratum_transcribe::transcription::polyphonic::LaneTracker;
///
/// let mut tracker = LaneTracker::new(0.01, 1, 0.05);
/// for frame in 0..20 {
///     let pitches: &[(u8, f32)] = if frame == 10 { &[] } else { &[(69, 1.0)] };
///     tracker.push_frame(frame, frame as f32 * 0.01, pitches);
/// }
/// assert_eq!(tracker.finish().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LaneTracker {
    hop_seconds: f32,
    gap_tolerance_frames: usize,
    min_note_duration: f32,
    lanes: BTreeMap<u8, LaneState>,
    notes: Vec<Note>,
}

impl LaneTracker {
    /// Create a tracker
    ///
    /// # Arguments
    ///
    /// * `hop_seconds` - Time between frames
    /// * `gap_tolerance_frames` - Frames a lane may go unobserved before closing
    /// * `min_note_duration` - Closed lanes shorter than this are dropped
    pub fn new(hop_seconds: f32, gap_tolerance_frames: usize, min_note_duration: f32) -> Self {
        Self {
            hop_seconds,
            gap_tolerance_frames,
            min_note_duration,
            lanes: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    /// Feed the `(pitch, salience)` candidates of one frame
    ///
    /// Frames must arrive in increasing index order.
    pub fn push_frame(&mut self, index: usize, time: f32, pitches: &[(u8, f32)]) {
        for &(pitch, salience) in pitches {
            self.lanes
                .entry(pitch)
                .and_modify(|lane| {
                    lane.last_seen_frame = index;
                    lane.last_seen_time = time;
                    lane.salience_sum += salience;
                    lane.observations += 1;
                })
                .or_insert(LaneState {
                    start_time: time,
                    last_seen_frame: index,
                    last_seen_time: time,
                    salience_sum: salience,
                    observations: 1,
                });
        }

        let hop = self.hop_seconds;
        let tolerance = self.gap_tolerance_frames;
        let floor = self.min_note_duration;
        let notes = &mut self.notes;
        self.lanes.retain(|&pitch, lane| {
            let open = index.saturating_sub(lane.last_seen_frame) <= tolerance;
            if !open {
                notes.extend(lane.into_note(pitch, hop, floor));
            }
            open
        });
    }

    /// Close every open lane
    ///
    /// # Returns
    ///
    /// Notes sorted by onset, then pitch
    pub fn finish(mut self) -> Vec<Note> {
        for (pitch, lane) in std::mem::take(&mut self.lanes) {
            self.notes
                .extend(lane.into_note(pitch, self.hop_seconds, self.min_note_duration));
        }
        let mut notes = self.notes;
        notes.sort_by(|a, b| {
            a.onset
                .partial_cmp(&b.onset)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.pitch.cmp(&b.pitch))
        });
        notes
    }
}

/// Polyphonic detector parameters
#[derive(Debug, Clone, Copy)]
pub struct PolyphonicDetector {
    /// Window length in samples
    pub window_size: usize,

    /// Hop between frames in samples
    pub hop_size: usize,

    /// Frame gate: max magnitude must exceed this fraction of the L1 bound
    pub magnitude_threshold: f32,

    /// Lowest candidate fundamental in Hz
    pub min_frequency_hz: f32,

    /// Highest candidate fundamental in Hz
    pub max_frequency_hz: f32,

    /// Maximum pitches per frame (K)
    pub max_polyphony: usize,

    /// Harmonics multiplied into the salience (H)
    pub num_harmonics: usize,

    /// Peak threshold relative to the frame's maximum salience
    pub salience_threshold: f32,

    /// Frames a lane may go unobserved before closing
    pub gap_tolerance_frames: usize,

    /// Minimum note duration in seconds
    pub min_note_duration: f32,
}

impl PolyphonicDetector {
    /// Build from the request configuration
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            window_size: config.window_size,
            hop_size: config.hop_size,
            magnitude_threshold: config.magnitude_threshold,
            min_frequency_hz: config.min_frequency_hz,
            max_frequency_hz: config.max_frequency_hz,
            max_polyphony: config.max_polyphony,
            num_harmonics: config.num_harmonics,
            salience_threshold: config.salience_threshold,
            gap_tolerance_frames: config.gap_tolerance_frames,
            min_note_duration: config.min_note_duration,
        }
    }

    /// Pitch candidates of one analysed frame, strongest first
    pub fn frame_peaks(
        &self,
        spectrum: &FrameSpectrum,
        analyzer: &SpectrumAnalyzer,
        sample_rate: u32,
    ) -> Vec<PitchPeak> {
        if spectrum.is_silent()
            || spectrum.max_magnitude() <= self.magnitude_threshold * spectrum.magnitude_bound
        {
            return vec![];
        }

        let salience = harmonic_salience(&spectrum.magnitudes, self.num_harmonics);
        let max_salience = salience.iter().copied().fold(0.0f32, f32::max);
        if max_salience <= EPSILON {
            return vec![];
        }

        let lo = analyzer
            .frequency_bin(self.min_frequency_hz, sample_rate)
            .ceil()
            .max(1.0) as usize;
        let hi = (analyzer.frequency_bin(self.max_frequency_hz, sample_rate).floor() as usize)
            .min(salience.len().saturating_sub(1));

        // pitch -> strongest peak for that pitch
        let mut by_pitch: BTreeMap<u8, PitchPeak> = BTreeMap::new();
        for (bin, value) in find_peaks(&salience, self.salience_threshold * max_salience, 1) {
            if bin < lo || bin > hi {
                continue;
            }
            let (frac_bin, _) = interpolate_peak(&salience, bin);
            let frequency_hz = analyzer.bin_frequency(frac_bin, sample_rate);
            let Some(pitch) = frequency_to_semitone(frequency_hz) else {
                continue;
            };
            let peak = PitchPeak {
                frequency_hz,
                pitch,
                salience: value / max_salience,
            };
            by_pitch
                .entry(pitch)
                .and_modify(|existing| {
                    if peak.salience > existing.salience {
                        *existing = peak;
                    }
                })
                .or_insert(peak);
        }

        let mut peaks: Vec<PitchPeak> = by_pitch.into_values().collect();
        peaks.sort_by(|a, b| {
            b.salience
                .partial_cmp(&a.salience)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.pitch.cmp(&b.pitch))
        });
        peaks.truncate(self.max_polyphony);
        peaks
    }

    /// Detect notes across the whole signal
    ///
    /// # Returns
    ///
    /// Notes sorted by onset, then pitch. Notes of the same pitch never
    /// overlap; different pitches may sound together.
    pub fn detect(&self, signal: &Signal<'_>) -> Vec<Note> {
        let sample_rate = signal.sample_rate();
        let hop_seconds = self.hop_size as f32 / sample_rate as f32;
        let mut analyzer = SpectrumAnalyzer::new(self.window_size);

        let mut tracker = LaneTracker::new(
            hop_seconds,
            self.gap_tolerance_frames,
            self.min_note_duration,
        );

        log::debug!(
            "Polyphonic detection: K={}, H={}, gap tolerance={} frames",
            self.max_polyphony,
            self.num_harmonics,
            self.gap_tolerance_frames
        );

        for frame in signal.frames(self.window_size, self.hop_size) {
            let spectrum = analyzer.analyze(frame.samples);
            let pitches: Vec<(u8, f32)> = self
                .frame_peaks(&spectrum, &analyzer, sample_rate)
                .iter()
                .map(|peak| (peak.pitch, peak.salience))
                .collect();
            tracker.push_frame(frame.index, frame.time, &pitches);
        }

        let notes = tracker.finish();
        log::debug!("Polyphonic detection produced {} notes", notes.len());
        notes
    }
}

/// Harmonically reinforced salience curve
///
/// Harmonics beyond the last bin contribute a factor of 1.
pub fn harmonic_salience(magnitudes: &[f32], num_harmonics: usize) -> Vec<f32> {
    let max_magnitude = magnitudes.iter().copied().fold(0.0f32, f32::max);
    if max_magnitude <= EPSILON {
        return vec![0.0; magnitudes.len()];
    }

    (0..magnitudes.len())
        .map(|k| {
            (2..=num_harmonics).fold(magnitudes[k], |acc, h| {
                let harmonic = magnitudes.get(h * k).copied().unwrap_or(0.0);
                acc * (1.0 + harmonic / max_magnitude)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::midi_to_hz;
    use std::f32::consts::PI;

    fn tones(pitches: &[u8], seconds: f32, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                pitches
                    .iter()
                    .map(|&p| 0.25 * (2.0 * PI * midi_to_hz(p as f32) * t).sin())
                    .sum()
            })
            .collect()
    }

    fn detector() -> PolyphonicDetector {
        PolyphonicDetector::from_config(&TranscriptionConfig {
            window_size: 4096,
            ..Default::default()
        })
    }

    #[test]
    fn test_salience_rewards_harmonics() {
        let mut mags = vec![0.0f32; 64];
        mags[5] = 1.0;
        mags[10] = 0.8;
        mags[15] = 0.6;
        mags[20] = 1.0;
        let salience = harmonic_salience(&mags, 4);
        assert!(salience[5] > salience[20]);
        assert!((salience[5] - 1.0 * 1.8 * 1.6 * 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_salience_silent() {
        assert!(harmonic_salience(&[0.0; 16], 5).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_detects_triad() {
        let samples = tones(&[60, 64, 67], 1.0, 44100);
        let signal = Signal::new(&samples, 44100).unwrap();
        let notes = detector().detect(&signal);

        let mut pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        pitches.sort_unstable();
        pitches.dedup();
        assert_eq!(pitches, vec![60, 64, 67]);
        for note in &notes {
            assert!(note.duration > 0.5, "{:?}", note);
            assert!(note.velocity >= 20);
        }
    }

    #[test]
    fn test_respects_max_polyphony() {
        let samples = tones(&[48, 55, 60, 64, 67, 72], 0.5, 44100);
        let mut config = TranscriptionConfig {
            window_size: 4096,
            ..Default::default()
        };
        config.max_polyphony = 2;
        let detector = PolyphonicDetector::from_config(&config);
        let mut analyzer = SpectrumAnalyzer::new(4096);
        let spectrum = analyzer.analyze(&samples[..4096]);
        let peaks = detector.frame_peaks(&spectrum, &analyzer, 44100);
        assert!(!peaks.is_empty() && peaks.len() <= 2);
        assert!(peaks.windows(2).all(|w| w[0].salience >= w[1].salience));
    }

    /// Track A4 over 30 frames of 10 ms with the given frames missing
    fn track_with_gaps(missing: &[usize]) -> Vec<Note> {
        let tolerance = TranscriptionConfig::default().gap_tolerance_frames;
        let mut tracker = LaneTracker::new(0.01, tolerance, 0.05);
        for frame in 0..30 {
            let pitches: Vec<(u8, f32)> = if missing.contains(&frame) {
                vec![]
            } else {
                vec![(69, 0.8), (76, 0.5)]
            };
            tracker.push_frame(frame, frame as f32 * 0.01, &pitches);
        }
        tracker.finish()
    }

    #[test]
    fn test_single_dropped_frame_does_not_split() {
        assert_eq!(TranscriptionConfig::default().gap_tolerance_frames, 1);
        let notes = track_with_gaps(&[12]);
        let a4: Vec<&Note> = notes.iter().filter(|n| n.pitch == 69).collect();
        assert_eq!(a4.len(), 1);
        assert!(a4[0].onset.abs() < 1e-6);
        assert!((a4[0].duration - 0.3).abs() < 1e-5);
        assert_eq!(a4[0].velocity, 102);
    }

    #[test]
    fn test_two_dropped_frames_split_note() {
        let notes = track_with_gaps(&[12, 13]);
        let a4: Vec<&Note> = notes.iter().filter(|n| n.pitch == 69).collect();
        assert_eq!(a4.len(), 2);
        // First lane ends one hop after frame 11, the second starts at frame 14
        assert!((a4[0].end() - 0.12).abs() < 1e-5);
        assert!((a4[1].onset - 0.14).abs() < 1e-5);
        assert!(a4[0].end() <= a4[1].onset);
        for pitch in [69, 76] {
            let lane: Vec<&Note> = notes.iter().filter(|n| n.pitch == pitch).collect();
            assert!(lane.windows(2).all(|w| w[0].end() <= w[1].onset));
        }
    }

    #[test]
    fn test_lanes_close_independently() {
        let mut tracker = LaneTracker::new(0.01, 1, 0.05);
        for frame in 0..20 {
            let mut pitches = vec![(60, 1.0)];
            if frame < 8 {
                pitches.push((64, 1.0));
            }
            tracker.push_frame(frame, frame as f32 * 0.01, &pitches);
        }
        let notes = tracker.finish();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 60);
        assert!((notes[0].duration - 0.2).abs() < 1e-5);
        assert_eq!(notes[1].pitch, 64);
        assert!((notes[1].duration - 0.08).abs() < 1e-5);
    }

    #[test]
    fn test_short_lane_dropped() {
        let mut tracker = LaneTracker::new(0.01, 1, 0.05);
        for frame in 0..3 {
            tracker.push_frame(frame, frame as f32 * 0.01, &[(72, 0.9)]);
        }
        assert!(tracker.finish().is_empty());
    }

    #[test]
    fn test_silence_no_notes() {
        let samples = vec![0.0f32; 44100];
        let signal = Signal::new(&samples, 44100).unwrap();
        assert!(detector().detect(&signal).is_empty());
    }
}

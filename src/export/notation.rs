//! Notation export plan
//!
//! Lays the final notes out in measures of `numerator × 4 / denominator`
//! quarter notes. Measure lines follow the first downbeat; material before it
//! forms a pickup measure. Notes crossing a barline are split and tied, gaps
//! become rests, and each measure carries the dynamic of its first note.

use crate::analysis::result::{BeatGrid, KeyEstimate, TranscriptionResult};
use crate::error::TranscriptionError;
use crate::features::beat_tracking::TimeSignature;
use crate::preprocessing::silence::Rest;
use crate::transcription::Note;
use serde::{Deserialize, Serialize};

/// Shortest rest written out, in quarter notes (a 256th note)
pub const MIN_REST_QUARTERS: f32 = 1.0 / 64.0;

/// Dynamic marking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dynamic {
    /// pianissimo
    Pp,
    /// piano
    P,
    /// mezzo-piano
    Mp,
    /// mezzo-forte
    Mf,
    /// forte
    F,
    /// fortissimo
    Ff,
}

impl Dynamic {
    /// Marking for a MIDI velocity
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_transcribe::export::Dynamic;
    ///
    /// assert_eq!(Dynamic::from_velocity(30), Dynamic::Pp);
    /// assert_eq!(Dynamic::from_velocity(80), Dynamic::Mf);
    /// assert_eq!(Dynamic::from_velocity(110), Dynamic::Ff);
    /// ```
    pub fn from_velocity(velocity: u8) -> Self {
        match velocity {
            0..=39 => Dynamic::Pp,
            40..=54 => Dynamic::P,
            55..=69 => Dynamic::Mp,
            70..=84 => Dynamic::Mf,
            85..=99 => Dynamic::F,
            _ => Dynamic::Ff,
        }
    }

    /// Score symbol ("pp", "mf", ...)
    pub fn symbol(&self) -> &'static str {
        match self {
            Dynamic::Pp => "pp",
            Dynamic::P => "p",
            Dynamic::Mp => "mp",
            Dynamic::Mf => "mf",
            Dynamic::F => "f",
            Dynamic::Ff => "ff",
        }
    }
}

/// A note or rest inside a measure (positions in quarter notes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NotationElement {
    /// Sounding note or note fragment
    Note {
        /// MIDI pitch
        pitch: u8,
        /// MIDI velocity
        velocity: u8,
        /// Offset from the measure start
        offset_quarters: f32,
        /// Length
        duration_quarters: f32,
        /// Tied into the next measure
        tie_start: bool,
        /// Tied from the previous measure
        tie_stop: bool,
    },
    /// Rest
    Rest {
        /// Offset from the measure start
        offset_quarters: f32,
        /// Length
        duration_quarters: f32,
        /// Overlaps a detected silent span
        marked: bool,
    },
}

impl NotationElement {
    /// Offset from the measure start in quarter notes
    pub fn offset(&self) -> f32 {
        match *self {
            NotationElement::Note { offset_quarters, .. }
            | NotationElement::Rest { offset_quarters, .. } => offset_quarters,
        }
    }

    /// Length in quarter notes
    pub fn duration(&self) -> f32 {
        match *self {
            NotationElement::Note {
                duration_quarters, ..
            }
            | NotationElement::Rest {
                duration_quarters, ..
            } => duration_quarters,
        }
    }

    /// True for rests
    pub fn is_rest(&self) -> bool {
        matches!(self, NotationElement::Rest { .. })
    }
}

/// One measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based measure number
    pub number: usize,

    /// Start position in quarter notes from the beginning
    pub start_quarters: f32,

    /// Length in quarter notes (shorter than a full bar for a pickup)
    pub length_quarters: f32,

    /// Dynamic of the first note starting in this measure
    pub dynamic: Option<Dynamic>,

    /// Elements ordered by offset
    pub elements: Vec<NotationElement>,
}

/// Measure-based notation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationExport {
    /// Tempo in BPM
    pub tempo_bpm: f32,

    /// Meter
    pub time_signature: TimeSignature,

    /// Key signature
    pub key: KeyEstimate,

    /// Measures in order
    pub measures: Vec<Measure>,
}

/// Serializer for notation plans (e.g. a MusicXML writer)
pub trait NotationWriter {
    /// Serialize a plan
    fn write_notation(&mut self, plan: &NotationExport) -> Result<(), TranscriptionError>;
}

impl NotationExport {
    /// Build a plan from a transcription result
    pub fn from_result(result: &TranscriptionResult) -> Self {
        Self::build(
            &result.notes,
            &result.rests,
            &result.beat_grid,
            result.downbeat_offset,
            result.key,
            result.metadata.duration_seconds,
        )
    }

    /// Build a plan from its parts
    ///
    /// # Arguments
    ///
    /// * `notes` - Final notes
    /// * `rests` - Detected silent spans
    /// * `grid` - Beat grid (tempo and meter)
    /// * `downbeat_offset` - Index of the first downbeat in `grid.beat_times`
    /// * `key` - Key signature
    /// * `duration_seconds` - Recording length
    pub fn build(
        notes: &[Note],
        rests: &[Rest],
        grid: &BeatGrid,
        downbeat_offset: usize,
        key: KeyEstimate,
        duration_seconds: f32,
    ) -> Self {
        let q = |seconds: f32| grid.seconds_to_quarters(seconds);
        let bar = grid.time_signature.quarter_notes_per_measure();

        // Notes as quarter spans, cut short where a silent span begins
        let mut spans: Vec<(f32, f32, u8, u8)> = notes
            .iter()
            .map(|note| {
                let end = rests
                    .iter()
                    .filter(|r| r.start > note.onset && r.start < note.end())
                    .map(|r| r.start)
                    .fold(note.end(), f32::min);
                (q(note.onset), q(end), note.pitch, note.velocity)
            })
            .filter(|(start, end, _, _)| end > start)
            .collect();
        spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let rest_spans: Vec<(f32, f32)> = rests.iter().map(|r| (q(r.start), q(r.end))).collect();

        let end_q = spans
            .iter()
            .map(|s| s.1)
            .fold(q(duration_seconds), f32::max);
        let first_downbeat = grid
            .beat_times
            .get(downbeat_offset)
            .map(|&t| q(t))
            .unwrap_or(0.0);
        let bounds = measure_bounds(first_downbeat.rem_euclid(bar), bar, end_q);

        let measures = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| build_measure(i + 1, w[0], w[1], &spans, &rest_spans))
            .collect::<Vec<_>>();

        log::debug!(
            "Notation plan: {} measures of {} ({} notes)",
            measures.len(),
            grid.time_signature,
            notes.len()
        );

        Self {
            tempo_bpm: grid.tempo_bpm,
            time_signature: grid.time_signature,
            key,
            measures,
        }
    }

    /// Hand the plan to a writer
    pub fn write_to<W: NotationWriter>(&self, writer: &mut W) -> Result<(), TranscriptionError> {
        writer.write_notation(self)
    }
}

/// Barline positions: 0, an optional pickup, then whole bars until `end_q`
fn measure_bounds(pickup: f32, bar: f32, end_q: f32) -> Vec<f32> {
    let mut bounds = vec![0.0];
    let mut next = if pickup > MIN_REST_QUARTERS && bar - pickup > MIN_REST_QUARTERS {
        pickup
    } else {
        bar
    };
    loop {
        bounds.push(next);
        if next >= end_q - MIN_REST_QUARTERS {
            break;
        }
        next += bar;
    }
    bounds
}

fn build_measure(
    number: usize,
    start: f32,
    end: f32,
    spans: &[(f32, f32, u8, u8)],
    rest_spans: &[(f32, f32)],
) -> Measure {
    let mut elements = Vec::new();
    let mut covered: Vec<(f32, f32)> = Vec::new();
    let mut dynamic = None;

    for &(onset, release, pitch, velocity) in spans {
        let seg_start = onset.max(start);
        let seg_end = release.min(end);
        if seg_end <= seg_start {
            continue;
        }
        let tie_stop = onset < start;
        if dynamic.is_none() && !tie_stop {
            dynamic = Some(Dynamic::from_velocity(velocity));
        }
        elements.push(NotationElement::Note {
            pitch,
            velocity,
            offset_quarters: seg_start - start,
            duration_quarters: seg_end - seg_start,
            tie_start: release > end,
            tie_stop,
        });
        covered.push((seg_start, seg_end));
    }

    // Gaps in note coverage become rests
    covered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut cursor = start;
    let mut gaps = Vec::new();
    for (s, e) in covered {
        if s > cursor {
            gaps.push((cursor, s));
        }
        cursor = cursor.max(e);
    }
    if end > cursor {
        gaps.push((cursor, end));
    }
    for (s, e) in gaps {
        if e - s < MIN_REST_QUARTERS {
            continue;
        }
        let marked = rest_spans
            .iter()
            .any(|&(rs, re)| re.min(e) - rs.max(s) > MIN_REST_QUARTERS);
        elements.push(NotationElement::Rest {
            offset_quarters: s - start,
            duration_quarters: e - s,
            marked,
        });
    }

    elements.sort_by(|a, b| {
        a.offset()
            .partial_cmp(&b.offset())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Measure {
        number,
        start_quarters: start,
        length_quarters: end - start,
        dynamic,
        elements,
    }
}

//! Export plans
//!
//! Transcription results are turned into format-neutral plans (tick-based
//! MIDI tracks, measure-based notation). Serializing a plan to a file is left
//! to an implementation of [`MidiWriter`] or [`NotationWriter`].

pub mod midi;
pub mod notation;

pub use midi::{MidiExport, MidiExportOptions, MidiNoteEvent, MidiTrack, MidiWriter};
pub use notation::{Dynamic, Measure, NotationElement, NotationExport, NotationWriter};

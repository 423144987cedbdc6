//! Signal input modules
//!
//! The engine never decodes audio itself; an external adapter hands over a
//! decoded mono sample buffer which is wrapped in a [`signal::Signal`] view and
//! walked frame by frame.

pub mod frames;
pub mod signal;

pub use frames::{Frame, Frames};
pub use signal::Signal;

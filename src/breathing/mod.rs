//! Paced-breathing timer.
//!
//! [`BreathingPattern`] describes the phase lengths; [`PhaseTimer`] runs the
//! inhale → hold → exhale cycle against a monotonic clock and plays a cue on
//! every phase change.

pub mod pattern;
pub mod timer;

pub use pattern::{BreathingPattern, PatternError, Phase, MAX_PHASE_SEC};
pub use timer::{PhaseTimer, RingSegment};

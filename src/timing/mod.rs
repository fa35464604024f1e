//! Clock and frame-scheduling abstractions shared by both engines.
//!
//! Neither engine touches [`std::time::Instant`] or a host timer directly.
//! They read time through [`Clock`] and re-arm themselves through
//! [`FrameScheduler`], which is what lets tests swap in [`ManualClock`] and
//! replay minutes of session time in microseconds.

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{FrameQueue, FrameScheduler, FrameToken};

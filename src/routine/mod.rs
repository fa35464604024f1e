//! Guided exercise routines and their progress log.

pub mod catalog;
pub mod session;

pub use catalog::{format_clock, routine, Exercise, ExerciseKind, Routine, ROUTINES};
pub use session::{RoutineProgress, RoutineSession, RoutineState};

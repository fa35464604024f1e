//! Interface translations (English and Estonian).

pub mod language;
pub mod translator;

pub use language::Language;
pub use translator::{interpolate, Catalog, ExerciseContent, Translator, INSTRUCTIONS_PLACEHOLDER};

//! Voice Coach: loudness meter, breathing timer and guided voice routines.

pub mod app;
pub mod audio;
pub mod breathing;
pub mod config;
pub mod i18n;
pub mod meter;
pub mod routine;
pub mod store;
pub mod timing;

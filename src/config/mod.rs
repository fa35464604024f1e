//! Configuration module for Voice Coach.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the meter,
//! breathing timer and window, `AppPaths` for cross-platform directories, and
//! TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, BreathingConfig, MeterConfig, UiConfig};

//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`, so a hand-edited file only needs the keys it changes.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::CueVoice;
use crate::breathing::BreathingPattern;
use crate::meter::{DeviceClassSetting, LevelScale};

// ---------------------------------------------------------------------------
// MeterConfig
// ---------------------------------------------------------------------------

/// Settings for the loudness meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Which base calibration offset to use: `auto`, `desktop` or `mobile`.
    pub device_class: DeviceClassSetting,
    /// Raw levels below this (dBFS) read as the quiet-room constant.
    pub silence_floor_dbfs: f64,
    /// Length of the smoothing window in milliseconds.
    pub window_ms: u64,
    /// Lowest displayed value; also the quiet-room constant.
    pub min_db: f64,
    /// Highest displayed value.
    pub max_db: f64,
    /// Smoothed readings above this count as voice for the statistics.
    pub voice_threshold_db: f64,
    /// How many saved measurements the history panel shows.
    pub history_rows: usize,
}

impl MeterConfig {
    pub fn level_scale(&self) -> LevelScale {
        LevelScale {
            silence_floor_dbfs: self.silence_floor_dbfs,
            min_db: self.min_db,
            max_db: self.max_db.max(self.min_db),
        }
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            device_class: DeviceClassSetting::Auto,
            silence_floor_dbfs: -80.0,
            window_ms: 500,
            min_db: 30.0,
            max_db: 100.0,
            voice_threshold_db: 40.0,
            history_rows: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// BreathingConfig
// ---------------------------------------------------------------------------

/// Settings for the breathing timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Initial pattern as `"inhale-hold-exhale"` seconds.
    pub pattern: BreathingPattern,
    /// Session length in seconds; `None` runs until stopped.
    pub session_secs: Option<u32>,
    /// Sound played on each phase change.
    pub cue_voice: CueVoice,
    pub cues_enabled: bool,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            pattern: BreathingPattern::CALM,
            session_secs: Some(300),
            cue_voice: CueVoice::Chimes,
            cues_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Forced UI language code (`"en"`, `"et"`).  `None` uses the saved
    /// choice, then the system locale.
    pub language: Option<String>,
    /// Initial window size `(width, height)` in logical pixels.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: None,
            window_size: (520.0, 760.0),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_coach::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Loudness meter settings.
    pub meter: MeterConfig,
    /// Breathing timer settings.
    pub breathing: BreathingConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first run) so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.meter.device_class, loaded.meter.device_class);
        assert_eq!(original.meter.window_ms, loaded.meter.window_ms);
        assert_eq!(original.meter.voice_threshold_db, loaded.meter.voice_threshold_db);
        assert_eq!(original.breathing.pattern, loaded.breathing.pattern);
        assert_eq!(original.breathing.session_secs, loaded.breathing.session_secs);
        assert_eq!(original.breathing.cue_voice, loaded.breathing.cue_voice);
        assert_eq!(original.ui.window_size, loaded.ui.window_size);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.meter.history_rows, 5);
        assert_eq!(config.breathing.pattern, BreathingPattern::CALM);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.meter.device_class, DeviceClassSetting::Auto);
        assert_eq!(cfg.meter.silence_floor_dbfs, -80.0);
        assert_eq!(cfg.meter.window_ms, 500);
        assert_eq!(cfg.meter.min_db, 30.0);
        assert_eq!(cfg.meter.max_db, 100.0);
        assert_eq!(cfg.meter.voice_threshold_db, 40.0);
        assert_eq!(cfg.breathing.pattern.to_string(), "4-4-6");
        assert_eq!(cfg.breathing.session_secs, Some(300));
        assert_eq!(cfg.breathing.cue_voice, CueVoice::Chimes);
        assert!(cfg.breathing.cues_enabled);
        assert!(cfg.ui.language.is_none());
        assert_eq!(cfg.meter.level_scale(), LevelScale::default());
    }

    /// A file with only a few keys fills the rest from defaults.
    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[meter]\ndevice_class = \"mobile\"\n\n[breathing]\npattern = \"4-7-8\"\ncue_voice = \"bowls\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.meter.device_class, DeviceClassSetting::Mobile);
        assert_eq!(cfg.meter.window_ms, 500);
        assert_eq!(cfg.breathing.pattern.to_string(), "4-7-8");
        assert_eq!(cfg.breathing.cue_voice, CueVoice::Bowls);
        assert_eq!(cfg.breathing.session_secs, Some(300));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[breathing]\npattern = \"0-0-0\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.meter.device_class = DeviceClassSetting::Desktop;
        cfg.meter.history_rows = 10;
        cfg.breathing.pattern = BreathingPattern::new(6, 2, 8).unwrap();
        cfg.breathing.session_secs = None;
        cfg.breathing.cues_enabled = false;
        cfg.ui.language = Some("et".into());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.meter.device_class, DeviceClassSetting::Desktop);
        assert_eq!(loaded.meter.history_rows, 10);
        assert_eq!(loaded.breathing.pattern.to_string(), "6-2-8");
        assert_eq!(loaded.breathing.session_secs, None);
        assert!(!loaded.breathing.cues_enabled);
        assert_eq!(loaded.ui.language.as_deref(), Some("et"));
    }
}

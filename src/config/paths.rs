//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (config dir):
//!   Windows: %APPDATA%\voice-coach\
//!   macOS:   ~/Library/Application Support/voice-coach/
//!   Linux:   ~/.config/voice-coach/
//!
//! ```text
//! voice-coach/
//! ├── settings.toml   AppConfig
//! └── store.json      calibration, saved measurements, progress, language
//! ```

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `store.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to the key-value store file.
    pub store_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-coach";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        Self::in_dir(&config_dir)
    }

    /// Same layout rooted at `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config_dir: dir.to_path_buf(),
            settings_file: dir.join("settings.toml"),
            store_file: dir.join("store.json"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .store_file
            .file_name()
            .is_some_and(|n| n == "store.json"));
    }

    #[test]
    fn in_dir_places_files_side_by_side() {
        let paths = AppPaths::in_dir(Path::new("/tmp/vc"));
        assert_eq!(paths.settings_file, Path::new("/tmp/vc/settings.toml"));
        assert_eq!(paths.store_file.parent(), Some(Path::new("/tmp/vc")));
    }
}

//! Key-value persistence for calibration, measurement history, routine
//! progress and the language choice.
//!
//! Values are plain strings under fixed keys, so the layout stays compatible
//! with a browser-style local storage: numbers are string-encoded and lists
//! are JSON arrays.  Typed access to the lists lives in [`records`].
//!
//! | Key | Value |
//! |-----|-------|
//! | [`CALIBRATION_KEY`] | signed dB offset, e.g. `"-4"` |
//! | [`MEASUREMENTS_KEY`] | JSON array of [`SavedMeasurement`] |
//! | [`PROGRESS_KEY`] | JSON array of [`RoutineCompletion`] |
//! | [`LANGUAGE_KEY`] | language code, e.g. `"et"` |

pub mod file;
pub mod records;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

pub use file::JsonFileStore;
pub use records::{
    append_completion, append_measurement, clear_measurements, load_completions,
    load_measurements, recent_measurements, RoutineCompletion, SavedMeasurement,
};

pub const CALIBRATION_KEY: &str = "voice-coach-calibration";
pub const MEASUREMENTS_KEY: &str = "voiceCoachMeasurements";
pub const PROGRESS_KEY: &str = "voiceCoachProgress";
pub const LANGUAGE_KEY: &str = "voice-coach-language";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors raised while writing (or, for file stores, flushing) the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// KeyValueStore trait
// ---------------------------------------------------------------------------

/// String key-value store shared by the engines and the UI.
///
/// Methods take `&self`; implementations use interior mutability so a single
/// `Arc<dyn KeyValueStore>` can be handed to every consumer.
pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`, or `None` when absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or replace the value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`.  Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Cheaply clonable handle to the application's store.
pub type SharedStore = Arc<dyn KeyValueStore>;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Volatile store used in tests and as the fallback when the store file
/// cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning a [`SharedStore`].
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nope").is_ok());
    }

    #[test]
    fn shared_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn KeyValueStore>();
    }
}

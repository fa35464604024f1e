//! Typed access to the JSON lists kept in the store.
//!
//! Reads never fail: a missing key is an empty list and a corrupt value is
//! logged and treated as an empty list.  Appends load, push and rewrite the
//! whole array.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StoreError, MEASUREMENTS_KEY, PROGRESS_KEY};

// ---------------------------------------------------------------------------
// SavedMeasurement
// ---------------------------------------------------------------------------

/// One saved loudness summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMeasurement {
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
    pub peak: i32,
    pub average: i32,
    pub minimum: i32,
    /// Human-readable local date (`M/D/YYYY`).
    pub date: String,
}

impl SavedMeasurement {
    /// Stamp a summary with the given local time.
    pub fn new(peak: i32, average: i32, minimum: i32, at: DateTime<Local>) -> Self {
        Self {
            timestamp: at
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            peak,
            average,
            minimum,
            date: at.format("%-m/%-d/%Y").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoutineCompletion
// ---------------------------------------------------------------------------

/// Record appended when the last step of a routine is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineCompletion {
    pub routine_id: String,
    /// Active seconds spent in the routine.
    pub duration: u64,
    /// ISO-8601 UTC completion time.
    pub completed_at: String,
    pub steps: usize,
}

// ---------------------------------------------------------------------------
// Generic list helpers
// ---------------------------------------------------------------------------

fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let Some(raw) = store.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("stored value under {key:?} is malformed ({e}); using an empty list");
            Vec::new()
        }
    }
}

fn append_to_list<T>(store: &dyn KeyValueStore, key: &str, item: T) -> Result<(), StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut items: Vec<T> = load_list(store, key);
    items.push(item);
    store.set(key, &serde_json::to_string(&items)?)
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// Every saved measurement, oldest first.
pub fn load_measurements(store: &dyn KeyValueStore) -> Vec<SavedMeasurement> {
    load_list(store, MEASUREMENTS_KEY)
}

/// The last `n` saved measurements, oldest first.
pub fn recent_measurements(store: &dyn KeyValueStore, n: usize) -> Vec<SavedMeasurement> {
    let mut all = load_measurements(store);
    let skip = all.len().saturating_sub(n);
    all.split_off(skip)
}

pub fn append_measurement(
    store: &dyn KeyValueStore,
    measurement: SavedMeasurement,
) -> Result<(), StoreError> {
    append_to_list(store, MEASUREMENTS_KEY, measurement)
}

/// Drop the whole measurement log.
pub fn clear_measurements(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.remove(MEASUREMENTS_KEY)
}

// ---------------------------------------------------------------------------
// Routine progress
// ---------------------------------------------------------------------------

pub fn load_completions(store: &dyn KeyValueStore) -> Vec<RoutineCompletion> {
    load_list(store, PROGRESS_KEY)
}

pub fn append_completion(
    store: &dyn KeyValueStore,
    completion: RoutineCompletion,
) -> Result<(), StoreError> {
    append_to_list(store, PROGRESS_KEY, completion)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Level → loudness conversion and the persisted calibration offset.
//!
//! Raw input is dBFS (0 at full scale, very negative when quiet).  The meter
//! shows an approximate SPL-like number instead:
//!
//! ```text
//! level < floor (or missing)  →  quiet-room constant (30)
//! otherwise                   →  clamp(level + base + user, 30, 100)
//! ```
//!
//! `base` depends on the coarse device class: phones and tablets apply
//! stronger automatic gain control, so they need a smaller offset than
//! desktops.  `user` is a manual correction kept in the store and re-read on
//! every frame, so moving the slider changes the very next reading.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::store::{SharedStore, StoreError, CALIBRATION_KEY};

/// Allowed range of the user adjustment, in dB.
pub const USER_OFFSET_RANGE: RangeInclusive<i32> = -30..=30;

const DESKTOP_BASE_OFFSET_DB: f64 = 110.0;
const MOBILE_BASE_OFFSET_DB: f64 = 88.0;

// ---------------------------------------------------------------------------
// DeviceClass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    /// Phones and tablets (touch-first devices).
    Mobile,
}

impl DeviceClass {
    /// Best guess for the current build target.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    /// Offset added to every dBFS reading before the user adjustment.
    pub fn base_offset_db(self) -> f64 {
        match self {
            DeviceClass::Desktop => DESKTOP_BASE_OFFSET_DB,
            DeviceClass::Mobile => MOBILE_BASE_OFFSET_DB,
        }
    }
}

/// Device class as written in `settings.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClassSetting {
    Auto,
    Desktop,
    Mobile,
}

impl DeviceClassSetting {
    pub fn resolve(self) -> DeviceClass {
        match self {
            DeviceClassSetting::Auto => DeviceClass::detect(),
            DeviceClassSetting::Desktop => DeviceClass::Desktop,
            DeviceClassSetting::Mobile => DeviceClass::Mobile,
        }
    }
}

impl Default for DeviceClassSetting {
    fn default() -> Self {
        DeviceClassSetting::Auto
    }
}

// ---------------------------------------------------------------------------
// LevelScale
// ---------------------------------------------------------------------------

/// Bounds of the displayed loudness scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelScale {
    /// Inputs below this dBFS level read as the quiet-room constant.
    pub silence_floor_dbfs: f64,
    pub min_db: f64,
    pub max_db: f64,
}

impl LevelScale {
    /// Map a raw level to the loudness scale.
    ///
    /// Missing, NaN, `-inf` and sub-floor levels all become `min_db`; every
    /// other value is offset and clamped.  Never fails.
    pub fn to_db(&self, level_dbfs: Option<f32>, offset_db: f64) -> f64 {
        let level = match level_dbfs {
            Some(l) if l.is_finite() && f64::from(l) >= self.silence_floor_dbfs => f64::from(l),
            _ => return self.min_db,
        };
        let db = level + offset_db;
        if db.is_nan() {
            return self.min_db;
        }
        db.clamp(self.min_db, self.max_db)
    }
}

impl Default for LevelScale {
    fn default() -> Self {
        Self {
            silence_floor_dbfs: -80.0,
            min_db: 30.0,
            max_db: 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// CalibrationStore
// ---------------------------------------------------------------------------

/// Reads and writes the user's calibration offset.
#[derive(Clone)]
pub struct CalibrationStore {
    store: SharedStore,
}

impl CalibrationStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Current user adjustment in dB.
    ///
    /// A missing value is 0.  A value that is not a number is logged and
    /// treated as 0.  Out-of-range values are clamped.
    pub fn user_offset_db(&self) -> f64 {
        let Some(raw) = self.store.get(CALIBRATION_KEY) else {
            return 0.0;
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v.clamp(
                f64::from(*USER_OFFSET_RANGE.start()),
                f64::from(*USER_OFFSET_RANGE.end()),
            ),
            _ => {
                log::warn!("ignoring malformed calibration value {raw:?}");
                0.0
            }
        }
    }

    /// Store a new adjustment, clamped to [`USER_OFFSET_RANGE`].  Returns the
    /// value actually stored.
    pub fn set_user_offset_db(&self, offset: i32) -> Result<i32, StoreError> {
        let clamped = offset.clamp(*USER_OFFSET_RANGE.start(), *USER_OFFSET_RANGE.end());
        self.store.set(CALIBRATION_KEY, &clamped.to_string())?;
        log::info!("calibration offset set to {clamped:+} dB");
        Ok(clamped)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.set_user_offset_db(0).map(|_| ())
    }

    /// Base offset for `device` plus the user adjustment.
    pub fn total_offset_db(&self, device: DeviceClass) -> f64 {
        device.base_offset_db() + self.user_offset_db()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

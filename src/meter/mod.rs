//! Microphone loudness meter.
//!
//! | Module | Role |
//! |--------|------|
//! | [`calibration`] | dBFS → displayed dB, device and user offsets |
//! | [`smoothing`] | 500 ms recency-weighted window |
//! | [`session`] | peak / average / minimum of voiced readings |
//! | [`engine`] | [`LoudnessMeter`], the frame-driven engine |
//!
//! The displayed number approximates sound pressure level; it is not a
//! calibrated measurement.

pub mod calibration;
pub mod engine;
pub mod session;
pub mod smoothing;

pub use calibration::{
    CalibrationStore, DeviceClass, DeviceClassSetting, LevelScale, USER_OFFSET_RANGE,
};
pub use engine::{LoudnessMeter, MeterError};
pub use session::MeterSession;
pub use smoothing::{LevelHistory, MeterReading};

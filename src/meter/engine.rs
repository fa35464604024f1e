//! Frame-driven loudness meter.
//!
//! ```text
//! start() ─▶ initialize() ─▶ mic.open()
//!    │
//!    ▼
//! frame: level_dbfs ─▶ LevelScale::to_db(+offset) ─▶ LevelHistory::push
//!          ─▶ MeterSession::record ─▶ request next frame
//! ```
//!
//! The engine is armed (microphone open) from the first successful
//! [`initialize`](LoudnessMeter::initialize) until
//! [`shutdown`](LoudnessMeter::shutdown).  Recording only controls whether
//! frames are processed; [`stop`](LoudnessMeter::stop) keeps the microphone
//! and the statistics.

use chrono::Local;
use thiserror::Error;

use super::calibration::{CalibrationStore, DeviceClass, LevelScale};
use super::session::MeterSession;
use super::smoothing::{LevelHistory, DEFAULT_FLOOR_WEIGHT};
use crate::audio::{MicrophoneError, MicrophoneInput};
use crate::config::MeterConfig;
use crate::store::{append_measurement, SavedMeasurement, SharedStore, StoreError};
use crate::timing::{Clock, FrameScheduler, FrameToken};

// ---------------------------------------------------------------------------
// MeterError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MeterError {
    /// Microphone refused or missing.  Shown to the user until the next
    /// successful initialization.
    #[error("Microphone access denied. Please allow microphone permissions. ({0})")]
    PermissionDenied(#[from] MicrophoneError),

    #[error("could not save measurement: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// LoudnessMeter
// ---------------------------------------------------------------------------

pub struct LoudnessMeter<M: MicrophoneInput, C: Clock, S: FrameScheduler> {
    mic: M,
    clock: C,
    scheduler: S,
    store: SharedStore,
    calibration: CalibrationStore,
    device: DeviceClass,
    scale: LevelScale,
    voice_threshold_db: f64,

    history: LevelHistory,
    session: MeterSession,

    armed: bool,
    recording: bool,
    pending: Option<FrameToken>,
    last_error: Option<String>,
}

impl<M: MicrophoneInput, C: Clock, S: FrameScheduler> LoudnessMeter<M, C, S> {
    pub fn new(mic: M, clock: C, scheduler: S, store: SharedStore, config: &MeterConfig) -> Self {
        let device = config.device_class.resolve();
        log::debug!(
            "meter using {:?} calibration (base {} dB)",
            device,
            device.base_offset_db()
        );
        Self {
            mic,
            clock,
            scheduler,
            calibration: CalibrationStore::new(store.clone()),
            store,
            device,
            scale: config.level_scale(),
            voice_threshold_db: config.voice_threshold_db,
            history: LevelHistory::new(config.window_ms, DEFAULT_FLOOR_WEIGHT),
            session: MeterSession::new(),
            armed: false,
            recording: false,
            pending: None,
            last_error: None,
        }
    }

    /// Open the microphone.  Does nothing while already armed.
    ///
    /// On failure the error message is kept for [`last_error`](Self::last_error)
    /// and the meter stays unarmed; nothing is retried automatically.
    pub fn initialize(&mut self) -> Result<(), MeterError> {
        if self.armed {
            return Ok(());
        }
        match self.mic.open() {
            Ok(()) => {
                self.armed = true;
                self.last_error = None;
                log::info!("meter armed");
                Ok(())
            }
            Err(e) => {
                let err = MeterError::PermissionDenied(e);
                log::error!("{err}");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Begin recording, initializing first when needed.  The first frame is
    /// processed immediately.
    pub fn start(&mut self) -> Result<(), MeterError> {
        self.initialize()?;
        if self.recording {
            return Ok(());
        }
        self.recording = true;
        log::info!("meter recording");
        self.step();
        Ok(())
    }

    /// Stop processing frames.  Statistics and the microphone are kept.
    pub fn stop(&mut self) {
        if self.recording {
            log::info!("meter stopped");
        }
        self.recording = false;
        self.disarm_frame();
    }

    /// Clear the history and statistics without stopping.
    pub fn reset(&mut self) {
        self.history.clear();
        self.session = MeterSession::new();
        log::debug!("meter statistics cleared");
    }

    /// Release the microphone and cancel the frame loop.  Safe to call more
    /// than once.
    pub fn shutdown(&mut self) {
        self.recording = false;
        self.disarm_frame();
        if self.armed {
            self.mic.close();
            self.armed = false;
            log::info!("meter shut down");
        }
    }

    /// Append the current statistics to the saved-measurement log.
    ///
    /// Returns `Ok(None)` without touching the store while peak or average
    /// is still zero.
    pub fn save_snapshot(&mut self) -> Result<Option<SavedMeasurement>, MeterError> {
        if !self.session.has_data() {
            log::debug!("nothing to save yet");
            return Ok(None);
        }
        let record = SavedMeasurement::new(
            self.session.peak_db(),
            self.session.avg_db(),
            self.session.min_db_or_zero(),
            Local::now(),
        );
        append_measurement(self.store.as_ref(), record.clone())?;
        log::info!(
            "saved measurement peak {} / avg {} / min {}",
            record.peak,
            record.average,
            record.minimum
        );
        Ok(Some(record))
    }

    // -- frame loop --------------------------------------------------------

    /// Deliver every due frame.  Call once per display refresh.
    pub fn pump(&mut self) {
        for token in self.scheduler.take_due() {
            self.on_frame(token);
        }
    }

    pub fn on_frame(&mut self, token: FrameToken) {
        if self.pending != Some(token) {
            log::trace!("ignoring stale meter frame {}", token.id());
            return;
        }
        self.pending = None;
        if !self.recording || !self.armed {
            return;
        }
        self.step();
    }

    fn step(&mut self) {
        let now = self.clock.now_ms();
        let offset = self.calibration.total_offset_db(self.device);
        let instant = self.scale.to_db(self.mic.level_dbfs(), offset);
        let smoothed = self.history.push(instant, now);
        self.session.record(instant, smoothed, self.voice_threshold_db);
        self.pending = Some(self.scheduler.request_frame());
    }

    fn disarm_frame(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
    }

    // -- accessors ---------------------------------------------------------

    /// Latest smoothed reading in dB; `None` means "no signal".
    pub fn current_reading(&self) -> Option<i32> {
        self.session.smoothed_db()
    }

    pub fn session(&self) -> &MeterSession {
        &self.session
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<M: MicrophoneInput, C: Clock, S: FrameScheduler> Drop for LoudnessMeter<M, C, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Microphone input via `cpal`.
//!
//! [`MicrophoneInput`] is what the loudness meter talks to: open, close and a
//! polled level.  [`CpalMicrophone`] is the production implementation; its
//! stream callback reduces every hardware buffer to an RMS level and
//! publishes it through a [`LevelTap`].  The [`StreamHandle`] is a RAII
//! guard, so closing the microphone is just dropping it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::level::{rms_dbfs, LevelTap};

// ---------------------------------------------------------------------------
// MicrophoneError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening the microphone.
///
/// On most platforms a refused permission surfaces as a failure to build or
/// start the input stream.
#[derive(Debug, Error)]
pub enum MicrophoneError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("microphone unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// MicrophoneInput trait
// ---------------------------------------------------------------------------

/// Polled microphone level source.
///
/// "Not yet opened" and "closed" are the same state: [`level_dbfs`]
/// returns `None` in both.
///
/// [`level_dbfs`]: MicrophoneInput::level_dbfs
pub trait MicrophoneInput {
    /// Acquire the device.  Opening an already-open microphone is a no-op.
    fn open(&mut self) -> Result<(), MicrophoneError>;

    /// Release the device.  Safe to call when already closed.
    fn close(&mut self);

    /// Returns `true` between a successful [`open`](Self::open) and
    /// [`close`](Self::close).
    fn is_open(&self) -> bool;

    /// Latest instantaneous level in dBFS (`-inf` for digital silence), or
    /// `None` when the microphone is not open.
    fn level_dbfs(&self) -> Option<f32>;
}

impl<M: MicrophoneInput + ?Sized> MicrophoneInput for Box<M> {
    fn open(&mut self) -> Result<(), MicrophoneError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn level_dbfs(&self) -> Option<f32> {
        (**self).level_dbfs()
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value calls `cpal::Stream::drop` which stops the
/// underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CpalMicrophone
// ---------------------------------------------------------------------------

/// Default system input device, opened on demand.
pub struct CpalMicrophone {
    tap: LevelTap,
    stream: Option<StreamHandle>,
}

impl CpalMicrophone {
    pub fn new() -> Self {
        Self {
            tap: LevelTap::new(),
            stream: None,
        }
    }

    fn build_stream(&self) -> Result<StreamHandle, MicrophoneError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(MicrophoneError::NoDevice)?;

        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let config: cpal::StreamConfig = supported.into();

        let tap = self.tap.clone();
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                tap.publish(rms_dbfs(data));
            },
            |err: cpal::StreamError| {
                log::error!("cpal input stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!("microphone opened ({sample_rate} Hz, {channels} ch)");
        Ok(StreamHandle { _stream: stream })
    }
}

impl Default for CpalMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrophoneInput for CpalMicrophone {
    fn open(&mut self) -> Result<(), MicrophoneError> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.tap.clear();
        self.stream = Some(self.build_stream()?);
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("microphone closed");
        }
        self.tap.clear();
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn level_dbfs(&self) -> Option<f32> {
        self.stream.as_ref().map(|_| self.tap.latest())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Scripted microphone for engine tests.
///
/// Shares its level cell with clones, so a test keeps one handle to change
/// the level while the engine owns another.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeMicrophone {
    tap: LevelTap,
    open: std::sync::Arc<std::sync::atomic::AtomicBool>,
    deny: std::sync::Arc<std::sync::atomic::AtomicBool>,
    pub open_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl FakeMicrophone {
    pub fn new() -> Self {
        Self {
            tap: LevelTap::new(),
            open: Default::default(),
            deny: Default::default(),
            open_calls: Default::default(),
        }
    }

    /// A microphone whose `open` fails until [`set_denied`](Self::set_denied)
    /// allows it.
    pub fn denied() -> Self {
        let mic = Self::new();
        mic.set_denied(true);
        mic
    }

    /// Make later `open` calls fail or succeed; shared with clones.
    pub fn set_denied(&self, denied: bool) {
        self.deny.store(denied, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_level(&self, dbfs: f32) {
        self.tap.publish(dbfs);
    }
}

#[cfg(test)]
impl MicrophoneInput for FakeMicrophone {
    fn open(&mut self) -> Result<(), MicrophoneError> {
        use std::sync::atomic::Ordering;
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(MicrophoneError::Unavailable("permission denied".into()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.open.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn level_dbfs(&self) -> Option<f32> {
        self.is_open().then(|| self.tap.latest())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Audio collaborators — microphone in, cue tones out.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → rms_dbfs → LevelTap ──poll──▶ LoudnessMeter
//!
//! PhaseTimer ──play(voice, phase)──▶ CuePlayer → cue_tones → rodio mixer
//! ```
//!
//! Both directions sit behind traits ([`MicrophoneInput`], [`CuePlayer`]) so
//! the engines can be exercised without audio hardware.

pub mod capture;
pub mod cue;
pub mod level;
pub mod playback;

pub use capture::{CpalMicrophone, MicrophoneError, MicrophoneInput, StreamHandle};
pub use cue::{cue_tones, CueError, CuePlayer, CueVoice, SilentCuePlayer, ToneSpec};
pub use level::{rms_dbfs, LevelTap, SILENCE_DBFS};
pub use playback::{RodioCuePlayer, ToneSource};

#[cfg(test)]
pub use capture::FakeMicrophone;
#[cfg(test)]
pub use cue::RecordingCuePlayer;

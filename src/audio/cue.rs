//! Phase-transition cues.
//!
//! A cue is a handful of sine tones with an exponential gain decay.  The
//! [`CueVoice`] picks the character of the sound and the [`Phase`] picks the
//! pitch, so the user can tell the phases apart with eyes closed.
//!
//! | Voice | Shape |
//! |-------|-------|
//! | `Beeps` | two identical 0.5 s tones, 0.1 s apart |
//! | `Chimes` | three ascending notes, 0.15 s apart, 1 s each |
//! | `Bowls` | fundamental + 1.5× + 2× harmonics together, 2 s |
//!
//! Playback is fire-and-forget: [`CuePlayer::play`] may fail, and callers
//! are expected to log and move on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::breathing::Phase;

// ---------------------------------------------------------------------------
// CueVoice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueVoice {
    /// Short dual beep.
    Beeps,
    /// Three-note ascending chime.
    Chimes,
    /// Layered harmonic "singing bowl" tone.
    Bowls,
}

impl CueVoice {
    pub const ALL: [CueVoice; 3] = [CueVoice::Beeps, CueVoice::Chimes, CueVoice::Bowls];

    /// Translation key of the voice's display name.
    pub fn label_key(self) -> &'static str {
        match self {
            CueVoice::Beeps => "breathing.sound_beeps",
            CueVoice::Chimes => "breathing.sound_chimes",
            CueVoice::Bowls => "breathing.sound_bowls",
        }
    }
}

impl Default for CueVoice {
    fn default() -> Self {
        CueVoice::Chimes
    }
}

// ---------------------------------------------------------------------------
// ToneSpec
// ---------------------------------------------------------------------------

/// One sine tone within a cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    /// Offset from the moment the cue is triggered.
    pub delay_secs: f32,
    pub duration_secs: f32,
    /// Gain at the start of the tone.
    pub start_gain: f32,
    /// Gain reached at the end, approached exponentially.
    pub end_gain: f32,
}

impl ToneSpec {
    /// Gain at `t` seconds into the tone.
    pub fn gain_at(&self, t: f32) -> f32 {
        if self.duration_secs <= 0.0 || self.start_gain <= 0.0 {
            return 0.0;
        }
        let progress = (t / self.duration_secs).clamp(0.0, 1.0);
        self.start_gain * (self.end_gain / self.start_gain).powf(progress)
    }
}

/// The tones that make up `voice`'s cue for `phase`.
pub fn cue_tones(voice: CueVoice, phase: Phase) -> Vec<ToneSpec> {
    match voice {
        CueVoice::Beeps => {
            let freq = match phase {
                Phase::Inhale => 660.0,
                Phase::Hold => 523.0,
                Phase::Exhale => 440.0,
            };
            [0.0, 0.1]
                .into_iter()
                .map(|delay_secs| ToneSpec {
                    frequency_hz: freq,
                    delay_secs,
                    duration_secs: 0.5,
                    start_gain: 0.35,
                    end_gain: 0.01,
                })
                .collect()
        }
        CueVoice::Chimes => {
            let notes: [f32; 3] = match phase {
                Phase::Inhale => [523.0, 659.0, 784.0],
                Phase::Hold => [440.0, 554.0, 659.0],
                Phase::Exhale => [349.0, 440.0, 523.0],
            };
            notes
                .into_iter()
                .enumerate()
                .map(|(i, frequency_hz)| ToneSpec {
                    frequency_hz,
                    delay_secs: i as f32 * 0.15,
                    duration_secs: 1.0,
                    start_gain: 0.25,
                    end_gain: 0.01,
                })
                .collect()
        }
        CueVoice::Bowls => {
            let base = match phase {
                Phase::Inhale => 523.0,
                Phase::Hold => 440.0,
                Phase::Exhale => 349.0,
            };
            [1.0_f32, 1.5, 2.0]
                .into_iter()
                .map(|harmonic| ToneSpec {
                    frequency_hz: base * harmonic,
                    delay_secs: 0.0,
                    duration_secs: 2.0,
                    start_gain: 0.3 / (harmonic * 1.2),
                    end_gain: 0.001,
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// CuePlayer
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CueError {
    #[error("cue output thread has stopped")]
    Disconnected,

    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// Speaker-side collaborator of the breathing timer.
pub trait CuePlayer {
    /// Start playing the cue for `phase`.  Returns immediately.
    fn play(&mut self, voice: CueVoice, phase: Phase) -> Result<(), CueError>;
}

impl<P: CuePlayer + ?Sized> CuePlayer for Box<P> {
    fn play(&mut self, voice: CueVoice, phase: Phase) -> Result<(), CueError> {
        (**self).play(voice, phase)
    }
}

/// Player for machines without audio output (or with cues switched off).
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCuePlayer;

impl CuePlayer for SilentCuePlayer {
    fn play(&mut self, _voice: CueVoice, _phase: Phase) -> Result<(), CueError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Records every cue; optionally fails every call.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingCuePlayer {
    pub played: std::sync::Arc<std::sync::Mutex<Vec<(CueVoice, Phase)>>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingCuePlayer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.played.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

#[cfg(test)]
impl CuePlayer for RecordingCuePlayer {
    fn play(&mut self, voice: CueVoice, phase: Phase) -> Result<(), CueError> {
        self.played.lock().unwrap().push((voice, phase));
        if self.fail {
            Err(CueError::Output("no speakers".into()))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Cue playback through `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so the stream lives on a dedicated
//! `cue-output` thread that receives commands over an mpsc channel.  The
//! stream is opened lazily on the first cue; if the machine has no output
//! device the thread logs once and drops every later cue, leaving the timer
//! silent but accurate.

use std::f32::consts::PI;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamHandle, Source};

use super::cue::{cue_tones, CueError, CuePlayer, CueVoice, ToneSpec};
use crate::breathing::Phase;

const SAMPLE_RATE: u32 = 44_100;

// ---------------------------------------------------------------------------
// ToneSource
// ---------------------------------------------------------------------------

/// Finite mono sine tone with an exponential gain envelope.
pub struct ToneSource {
    spec: ToneSpec,
    sample: usize,
    total_samples: usize,
}

impl ToneSource {
    pub fn new(spec: ToneSpec) -> Self {
        Self {
            spec,
            sample: 0,
            total_samples: (spec.duration_secs.max(0.0) * SAMPLE_RATE as f32) as usize,
        }
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sample >= self.total_samples {
            return None;
        }
        let t = self.sample as f32 / SAMPLE_RATE as f32;
        self.sample += 1;
        Some((2.0 * PI * self.spec.frequency_hz * t).sin() * self.spec.gain_at(t))
    }
}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(self.spec.duration_secs.max(0.0)))
    }
}

// ---------------------------------------------------------------------------
// RodioCuePlayer
// ---------------------------------------------------------------------------

enum CueCommand {
    Play(Vec<ToneSpec>),
    Shutdown,
}

/// [`CuePlayer`] that mixes each cue's tones on the default output device.
pub struct RodioCuePlayer {
    tx: Sender<CueCommand>,
}

impl RodioCuePlayer {
    /// Spawn the output thread.  The device itself is opened on first use.
    pub fn new() -> Result<Self, CueError> {
        let (tx, rx) = mpsc::channel::<CueCommand>();

        thread::Builder::new()
            .name("cue-output".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut unavailable = false;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        CueCommand::Play(tones) => {
                            if unavailable {
                                continue;
                            }
                            if output.is_none() {
                                match OutputStream::try_default() {
                                    Ok(pair) => output = Some(pair),
                                    Err(e) => {
                                        log::warn!("no audio output ({e}); cues disabled");
                                        unavailable = true;
                                        continue;
                                    }
                                }
                            }
                            if let Some((_, handle)) = output.as_ref() {
                                for spec in tones {
                                    let source = ToneSource::new(spec)
                                        .delay(Duration::from_secs_f32(spec.delay_secs));
                                    if let Err(e) = handle.play_raw(source) {
                                        log::debug!("cue tone dropped: {e}");
                                    }
                                }
                            }
                        }
                        CueCommand::Shutdown => break,
                    }
                }
                log::debug!("cue output thread exiting");
            })
            .map_err(|e| CueError::Output(e.to_string()))?;

        Ok(Self { tx })
    }
}

impl CuePlayer for RodioCuePlayer {
    fn play(&mut self, voice: CueVoice, phase: Phase) -> Result<(), CueError> {
        self.tx
            .send(CueCommand::Play(cue_tones(voice, phase)))
            .map_err(|_| CueError::Disconnected)
    }
}

impl Drop for RodioCuePlayer {
    fn drop(&mut self) {
        let _ = self.tx.send(CueCommand::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(duration_secs: f32) -> ToneSpec {
        ToneSpec {
            frequency_hz: 440.0,
            delay_secs: 0.0,
            duration_secs,
            start_gain: 0.25,
            end_gain: 0.01,
        }
    }

    #[test]
    fn tone_has_expected_length() {
        let samples: Vec<f32> = ToneSource::new(spec(0.5)).collect();
        assert_eq!(samples.len(), (SAMPLE_RATE / 2) as usize);
    }

    #[test]
    fn tone_never_exceeds_start_gain() {
        assert!(ToneSource::new(spec(0.2)).all(|s| s.abs() <= 0.25 + 1e-6));
    }

    #[test]
    fn zero_length_tone_is_empty() {
        assert_eq!(ToneSource::new(spec(0.0)).count(), 0);
    }

    #[test]
    fn source_metadata() {
        let src = ToneSource::new(spec(1.0));
        assert_eq!(src.channels(), 1);
        assert_eq!(src.sample_rate(), SAMPLE_RATE);
        assert_eq!(src.total_duration(), Some(Duration::from_secs(1)));
    }
}

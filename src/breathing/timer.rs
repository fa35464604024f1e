//! Drift-free breathing phase timer.
//!
//! Phase boundaries are kept as absolute deadlines on a monotonic clock.
//! Each frame compares "now" against the current deadline and walks forward
//! as many phases as were missed, deriving every new deadline from the
//! previous one rather than from "now":
//!
//! ```text
//!   start                 frame @ 25 s
//!     │ inhale │ hold │  exhale  │ inhale │ hold │  exhale  │
//!     0        4      8          14       18     22    ▲     28
//!                                                      └ lands here, cycle = 1
//! ```
//!
//! Because deadlines never depend on frame timing, late or dropped frames
//! cannot accumulate error.  Pausing records the exact remaining time of the
//! current phase and the length of the pause; resuming restores both.

use crate::audio::{CuePlayer, CueVoice};
use crate::timing::{Clock, FrameScheduler, FrameToken};

use super::pattern::{BreathingPattern, Phase};

/// Share of the progress ring covered by one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSegment {
    pub phase: Phase,
    /// Fraction of the cycle before this phase starts.
    pub start: f64,
    /// Fraction of the cycle taken by this phase.
    pub length: f64,
}

// ---------------------------------------------------------------------------
// PhaseTimer
// ---------------------------------------------------------------------------

/// Inhale → hold → exhale state machine.
///
/// The timer owns its clock, frame scheduler and cue player.  The host calls
/// [`pump`](Self::pump) once per display frame and reads the accessors to
/// render.
pub struct PhaseTimer<C: Clock, S: FrameScheduler, P: CuePlayer> {
    clock: C,
    scheduler: S,
    cues: P,

    pattern: BreathingPattern,
    cue_voice: CueVoice,
    cues_enabled: bool,
    session_secs: Option<u32>,

    phase: Phase,
    phase_start_ms: u64,
    phase_end_ms: u64,
    session_start_ms: Option<u64>,
    paused_accum_ms: u64,
    pause_started_ms: Option<u64>,
    remaining_at_pause_ms: Option<u64>,

    cycle_count: u32,
    elapsed_sec: u64,
    time_left_sec: u64,
    phase_fraction: f64,

    active: bool,
    complete: bool,
    pending: Option<FrameToken>,
    on_complete: Option<Box<dyn FnMut()>>,
}

impl<C: Clock, S: FrameScheduler, P: CuePlayer> PhaseTimer<C, S, P> {
    pub fn new(clock: C, scheduler: S, cues: P, pattern: BreathingPattern) -> Self {
        let now = clock.now_ms();
        let inhale_ms = pattern.duration_ms(Phase::Inhale);
        Self {
            clock,
            scheduler,
            cues,
            pattern,
            cue_voice: CueVoice::default(),
            cues_enabled: true,
            session_secs: None,
            phase: Phase::Inhale,
            phase_start_ms: now,
            phase_end_ms: now + inhale_ms,
            session_start_ms: None,
            paused_accum_ms: 0,
            pause_started_ms: None,
            remaining_at_pause_ms: None,
            cycle_count: 0,
            elapsed_sec: 0,
            time_left_sec: u64::from(pattern.inhale_sec()),
            phase_fraction: 0.0,
            active: false,
            complete: false,
            pending: None,
            on_complete: None,
        }
    }

    // -- commands ----------------------------------------------------------

    /// Start, pause or resume depending on the current state.
    ///
    /// Ignored after the session has completed until [`reset`](Self::reset).
    pub fn start_or_toggle(&mut self) {
        if self.complete {
            log::debug!("breathing session already complete; reset to start again");
            return;
        }
        if self.active {
            self.pause();
            return;
        }

        let now = self.clock.now_ms();
        if self.session_start_ms.is_none() {
            self.session_start_ms = Some(now);
            self.paused_accum_ms = 0;
            self.phase_start_ms = now;
            self.phase_end_ms = now + self.pattern.duration_ms(self.phase);
            log::info!("breathing session started ({})", self.pattern);
        } else if let Some(paused_at) = self.pause_started_ms.take() {
            self.paused_accum_ms += now.saturating_sub(paused_at);
            if let Some(remaining) = self.remaining_at_pause_ms.take() {
                let duration = self.pattern.duration_ms(self.phase);
                self.phase_start_ms = now.saturating_sub(duration.saturating_sub(remaining));
                self.phase_end_ms = now + remaining;
            }
            log::info!(
                "breathing session resumed ({} ms paused in total)",
                self.paused_accum_ms
            );
        }

        self.active = true;
        self.update_display(now);
        self.play_cue(self.phase);
        self.arm();
    }

    fn pause(&mut self) {
        let now = self.clock.now_ms();
        self.active = false;
        self.disarm();
        self.update_display(now);
        self.pause_started_ms = Some(now);
        self.remaining_at_pause_ms = Some(self.phase_end_ms.saturating_sub(now));
        log::info!(
            "breathing session paused in {:?} with {} ms left",
            self.phase,
            self.phase_end_ms.saturating_sub(now)
        );
    }

    /// Stop and return to a fresh inhale with zeroed counters.
    pub fn reset(&mut self) {
        self.disarm();
        let now = self.clock.now_ms();
        self.active = false;
        self.complete = false;
        self.phase = Phase::Inhale;
        self.cycle_count = 0;
        self.elapsed_sec = 0;
        self.session_start_ms = None;
        self.paused_accum_ms = 0;
        self.pause_started_ms = None;
        self.remaining_at_pause_ms = None;
        self.phase_start_ms = now;
        self.phase_end_ms = now + self.pattern.duration_ms(Phase::Inhale);
        self.time_left_sec = u64::from(self.pattern.inhale_sec());
        self.phase_fraction = 0.0;
        log::debug!("breathing timer reset");
    }

    /// Switch to a new pattern.
    ///
    /// While running, the current phase keeps its deadline and the new
    /// durations apply from the next phase on.  While stopped or paused, the
    /// visible phase goes back to inhale with the new inhale length.
    pub fn apply_pattern(&mut self, pattern: BreathingPattern) {
        let now = self.clock.now_ms();
        self.pattern = pattern;

        if !self.active {
            let inhale_ms = pattern.duration_ms(Phase::Inhale);
            self.phase = Phase::Inhale;
            self.phase_start_ms = now;
            self.phase_end_ms = now + inhale_ms;
            if self.pause_started_ms.is_some() {
                self.remaining_at_pause_ms = Some(inhale_ms);
            }
        }
        self.update_display(now);
        log::info!("breathing pattern set to {pattern}");
    }

    /// Session length in seconds; `None` or `Some(0)` runs until stopped.
    pub fn set_session_duration(&mut self, secs: Option<u32>) {
        self.session_secs = secs.filter(|s| *s > 0);
    }

    /// Register the callback fired once when the session length is reached.
    pub fn on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn set_cue_voice(&mut self, voice: CueVoice) {
        self.cue_voice = voice;
    }

    pub fn set_cues_enabled(&mut self, enabled: bool) {
        self.cues_enabled = enabled;
    }

    // -- frame loop --------------------------------------------------------

    /// Deliver every due frame.  Call once per display refresh.
    pub fn pump(&mut self) {
        for token in self.scheduler.take_due() {
            self.on_frame(token);
        }
    }

    /// Advance the state machine for one frame.
    ///
    /// Tokens that do not match the pending request are stale and ignored,
    /// as are frames that arrive while paused.
    pub fn on_frame(&mut self, token: FrameToken) {
        if self.pending != Some(token) {
            log::trace!("ignoring stale breathing frame {}", token.id());
            return;
        }
        self.pending = None;
        if !self.active {
            return;
        }

        let now = self.clock.now_ms();

        let mut landed = None;
        while now >= self.phase_end_ms {
            let next = self.phase.next();
            self.phase_start_ms = self.phase_end_ms;
            self.phase_end_ms = self.phase_start_ms + self.pattern.duration_ms(next);
            self.phase = next;
            if next == Phase::Inhale {
                self.cycle_count += 1;
            }
            landed = Some(next);
        }
        if let Some(phase) = landed {
            log::debug!("breathing phase -> {phase:?} (cycle {})", self.cycle_count);
            self.play_cue(phase);
        }

        let session_start = self.session_start_ms.unwrap_or(now);
        let active_ms = now
            .saturating_sub(session_start)
            .saturating_sub(self.paused_accum_ms);
        self.elapsed_sec = active_ms / 1_000;

        if let Some(limit) = self.session_secs {
            if self.elapsed_sec >= u64::from(limit) {
                self.finish();
                return;
            }
        }

        self.update_display(now);
        self.arm();
    }

    fn finish(&mut self) {
        self.active = false;
        self.complete = true;
        self.disarm();
        log::info!(
            "breathing session complete after {} s, {} cycles",
            self.elapsed_sec,
            self.cycle_count
        );
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    fn update_display(&mut self, now: u64) {
        let duration = self.pattern.duration_ms(self.phase);
        let in_phase = now.saturating_sub(self.phase_start_ms).min(duration);
        self.phase_fraction = if duration == 0 {
            0.0
        } else {
            in_phase as f64 / duration as f64
        };
        self.time_left_sec = self.phase_end_ms.saturating_sub(now).div_ceil(1_000);
    }

    fn play_cue(&mut self, phase: Phase) {
        if !self.cues_enabled {
            return;
        }
        if let Err(e) = self.cues.play(self.cue_voice, phase) {
            log::debug!("cue for {phase:?} not played: {e}");
        }
    }

    fn arm(&mut self) {
        self.pending = Some(self.scheduler.request_frame());
    }

    fn disarm(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
    }

    // -- accessors ---------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pattern(&self) -> BreathingPattern {
        self.pattern
    }

    /// Whole seconds left in the current phase, rounded up.
    pub fn time_left_sec(&self) -> u64 {
        self.time_left_sec
    }

    /// Completed cycles (returns to inhale) since start.
    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Active seconds since start, pauses excluded.
    pub fn elapsed_sec(&self) -> u64 {
        self.elapsed_sec
    }

    pub fn session_secs(&self) -> Option<u32> {
        self.session_secs
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started_ms.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn cue_voice(&self) -> CueVoice {
        self.cue_voice
    }

    pub fn cues_enabled(&self) -> bool {
        self.cues_enabled
    }

    /// Position within the whole cycle, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = f64::from(self.pattern.cycle_sec());
        let start = f64::from(self.pattern.offset_sec(self.phase));
        let length = f64::from(self.pattern.duration_sec(self.phase));
        ((start + self.phase_fraction * length) / total).clamp(0.0, 1.0)
    }

    /// Size factor for the breathing circle: grows on inhale, holds, shrinks
    /// on exhale.
    pub fn breath_scale(&self) -> f64 {
        match self.phase {
            Phase::Inhale => 1.0 + 0.4 * self.phase_fraction,
            Phase::Hold => 1.4,
            Phase::Exhale => 1.4 - 0.4 * self.phase_fraction,
        }
    }

    /// Start and length of each phase as fractions of the cycle.
    pub fn ring_segments(&self) -> [RingSegment; 3] {
        let total = f64::from(self.pattern.cycle_sec());
        Phase::ALL.map(|phase| RingSegment {
            phase,
            start: f64::from(self.pattern.offset_sec(phase)) / total,
            length: f64::from(self.pattern.duration_sec(phase)) / total,
        })
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<C: Clock, S: FrameScheduler, P: CuePlayer> Drop for PhaseTimer<C, S, P> {
    fn drop(&mut self) {
        self.disarm();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::RecordingCuePlayer;
    use crate::timing::{FrameQueue, ManualClock};

    type TestTimer = PhaseTimer<ManualClock, FrameQueue, RecordingCuePlayer>;

    fn timer(pattern: BreathingPattern) -> (TestTimer, ManualClock, RecordingCuePlayer) {
        let clock = ManualClock::new(0);
        let cues = RecordingCuePlayer::default();
        let t = PhaseTimer::new(clock.clone(), FrameQueue::new(), cues.clone(), pattern);
        (t, clock, cues)
    }

    fn frame_at(t: &mut TestTimer, clock: &ManualClock, ms: u64) {
        clock.set(ms);
        t.pump();
    }

    #[test]
    fn fresh_timer_is_idle_at_inhale() {
        let (t, _, cues) = timer(BreathingPattern::CALM);
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.time_left_sec(), 4);
        assert!(!t.is_active());
        assert!(t.scheduler().is_idle());
        assert!(cues.phases().is_empty());
    }

    #[test]
    fn start_plays_cue_and_arms_loop() {
        let (mut t, _, cues) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        assert!(t.is_active());
        assert_eq!(t.scheduler().pending_len(), 1);
        assert_eq!(cues.phases(), vec![Phase::Inhale]);
    }

    #[test]
    fn fourteen_seconds_is_one_cycle() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 14_000);
        assert_eq!(t.cycle_count(), 1);
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.time_left_sec(), 4);
        assert_eq!(t.elapsed_sec(), 14);
    }

    #[test]
    fn regular_frames_walk_through_phases() {
        let (mut t, clock, cues) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        let mut seen = Vec::new();
        for ms in (16..=14_000).step_by(16) {
            frame_at(&mut t, &clock, ms);
            if seen.last() != Some(&t.phase()) {
                seen.push(t.phase());
            }
        }
        assert_eq!(seen, vec![Phase::Inhale, Phase::Hold, Phase::Exhale, Phase::Inhale]);
        assert_eq!(
            cues.phases(),
            vec![Phase::Inhale, Phase::Hold, Phase::Exhale, Phase::Inhale]
        );
    }

    #[test]
    fn dropped_frames_catch_up_with_one_cue() {
        let (mut t, clock, cues) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 25_000);
        assert_eq!(t.phase(), Phase::Exhale);
        assert_eq!(t.cycle_count(), 1);
        assert_eq!(t.time_left_sec(), 3);
        // one cue for start, one for the landed phase
        assert_eq!(cues.phases(), vec![Phase::Inhale, Phase::Exhale]);
    }

    #[test]
    fn pause_and_resume_do_not_drift() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 2_000);
        t.start_or_toggle(); // pause
        assert!(!t.is_active());
        assert!(t.is_paused());
        assert!(t.scheduler().is_idle());

        clock.set(102_000);
        t.start_or_toggle(); // resume
        assert!(!t.is_paused());
        assert_eq!(t.time_left_sec(), 2);
        assert!((t.progress() - 2.0 / 14.0).abs() < 1e-9);

        frame_at(&mut t, &clock, 104_000);
        assert_eq!(t.phase(), Phase::Hold);
        assert_eq!(t.elapsed_sec(), 4);
        assert_eq!(t.cycle_count(), 0);
    }

    #[test]
    fn frames_during_pause_are_ignored() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        clock.set(1_000);
        // the host took the token but the user paused before delivery
        let due = t.scheduler.take_due();
        t.start_or_toggle();
        clock.set(50_000);
        for token in due {
            t.on_frame(token);
        }
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.elapsed_sec(), 0);
        assert!(t.scheduler().is_idle());
    }

    #[test]
    fn stale_token_is_ignored() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        let stale = t.pending.unwrap();
        frame_at(&mut t, &clock, 100);
        clock.set(9_000);
        t.on_frame(stale);
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.scheduler().pending_len(), 1);
    }

    #[test]
    fn completion_fires_once_and_blocks_restart() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        t.set_session_duration(Some(30));
        t.on_complete(move || counter.set(counter.get() + 1));

        t.start_or_toggle();
        frame_at(&mut t, &clock, 29_999);
        assert_eq!(fired.get(), 0);
        frame_at(&mut t, &clock, 30_000);
        assert_eq!(fired.get(), 1);
        assert!(t.is_complete());
        assert!(!t.is_active());
        assert!(t.scheduler().is_idle());

        t.start_or_toggle();
        frame_at(&mut t, &clock, 40_000);
        assert_eq!(fired.get(), 1);
        assert!(!t.is_active());

        t.reset();
        t.start_or_toggle();
        assert!(t.is_active());
    }

    #[test]
    fn zero_session_length_means_unbounded() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.set_session_duration(Some(0));
        assert_eq!(t.session_secs(), None);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 1_000_000);
        assert!(t.is_active());
    }

    #[test]
    fn reset_returns_to_fresh_inhale() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 20_000);
        t.reset();
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.cycle_count(), 0);
        assert_eq!(t.elapsed_sec(), 0);
        assert_eq!(t.time_left_sec(), 4);
        assert!(!t.is_active());
        assert!(t.scheduler().is_idle());
        assert_eq!(t.scheduler().cancelled_count(), 1);
        assert_eq!(t.progress(), 0.0);

        // restarting anchors a new session at the current time
        t.start_or_toggle();
        frame_at(&mut t, &clock, 24_000);
        assert_eq!(t.phase(), Phase::Hold);
        assert_eq!(t.elapsed_sec(), 4);
    }

    #[test]
    fn apply_pattern_while_running_keeps_current_deadline() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 1_000);
        t.apply_pattern(BreathingPattern::new(6, 2, 8).unwrap());
        frame_at(&mut t, &clock, 3_999);
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.time_left_sec(), 1);

        frame_at(&mut t, &clock, 4_000);
        assert_eq!(t.phase(), Phase::Hold);
        // hold now lasts 2 s under the new pattern
        frame_at(&mut t, &clock, 6_000);
        assert_eq!(t.phase(), Phase::Exhale);
        assert_eq!(t.time_left_sec(), 8);
        assert_eq!(t.cycle_count(), 0);
    }

    #[test]
    fn apply_pattern_while_idle_resets_visible_phase() {
        let (mut t, _, _) = timer(BreathingPattern::CALM);
        t.apply_pattern(BreathingPattern::new(6, 2, 8).unwrap());
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.time_left_sec(), 6);
        assert!(!t.is_active());
    }

    #[test]
    fn apply_pattern_while_paused_resumes_from_new_inhale() {
        let (mut t, clock, cues) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 9_000);
        assert_eq!(t.phase(), Phase::Exhale);
        t.start_or_toggle(); // pause

        clock.set(20_000);
        t.apply_pattern(BreathingPattern::new(6, 2, 8).unwrap());
        assert_eq!(t.phase(), Phase::Inhale);
        assert_eq!(t.time_left_sec(), 6);

        clock.set(30_000);
        t.start_or_toggle();
        assert_eq!(t.time_left_sec(), 6);
        assert_eq!(cues.phases().last(), Some(&Phase::Inhale));
        frame_at(&mut t, &clock, 36_000);
        assert_eq!(t.phase(), Phase::Hold);
        // 9 s before the pause + 6 s after it
        assert_eq!(t.elapsed_sec(), 15);
    }

    #[test]
    fn progress_and_scale_track_phase() {
        let (mut t, clock, _) = timer(BreathingPattern::CALM);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 2_000);
        assert!((t.progress() - 2.0 / 14.0).abs() < 1e-9);
        assert!((t.breath_scale() - 1.2).abs() < 1e-9);

        frame_at(&mut t, &clock, 6_000);
        assert_eq!(t.phase(), Phase::Hold);
        assert!((t.progress() - 6.0 / 14.0).abs() < 1e-9);
        assert!((t.breath_scale() - 1.4).abs() < 1e-9);

        frame_at(&mut t, &clock, 11_000);
        assert_eq!(t.phase(), Phase::Exhale);
        assert!((t.breath_scale() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn ring_segments_cover_the_cycle() {
        let (t, _, _) = timer(BreathingPattern::new(4, 7, 8).unwrap());
        let segs = t.ring_segments();
        assert_eq!(segs[0].phase, Phase::Inhale);
        assert_eq!(segs[0].start, 0.0);
        assert!((segs[1].start - 4.0 / 19.0).abs() < 1e-12);
        assert!((segs[2].start + segs[2].length - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_hold_is_skipped() {
        let (mut t, clock, cues) = timer(BreathingPattern::new(4, 0, 6).unwrap());
        t.start_or_toggle();
        frame_at(&mut t, &clock, 4_000);
        assert_eq!(t.phase(), Phase::Exhale);
        assert_eq!(cues.phases(), vec![Phase::Inhale, Phase::Exhale]);
    }

    #[test]
    fn cue_failures_do_not_stop_the_timer() {
        let clock = ManualClock::new(0);
        let mut t = PhaseTimer::new(
            clock.clone(),
            FrameQueue::new(),
            RecordingCuePlayer::failing(),
            BreathingPattern::CALM,
        );
        t.start_or_toggle();
        frame_at_generic(&mut t, &clock, 5_000);
        assert_eq!(t.phase(), Phase::Hold);
        assert!(t.is_active());
    }

    #[test]
    fn disabled_cues_are_silent() {
        let (mut t, clock, cues) = timer(BreathingPattern::CALM);
        t.set_cues_enabled(false);
        t.start_or_toggle();
        frame_at(&mut t, &clock, 5_000);
        assert!(cues.phases().is_empty());
    }

    fn frame_at_generic<P: CuePlayer>(
        t: &mut PhaseTimer<ManualClock, FrameQueue, P>,
        clock: &ManualClock,
        ms: u64,
    ) {
        clock.set(ms);
        t.pump();
    }
}

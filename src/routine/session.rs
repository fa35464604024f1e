//! Step-by-step progress through one routine.
//!
//! Each exercise runs for its duration and then advances automatically.  The
//! step deadline chains from the previous one, so a slow host does not
//! stretch the routine.  Pauses are excluded from both the step clock and
//! the routine's elapsed time.  Finishing the last step appends a
//! [`RoutineCompletion`] to the progress log.

use chrono::{SecondsFormat, Utc};

use super::catalog::{routine, Exercise, Routine};
use crate::store::{append_completion, RoutineCompletion, SharedStore, StoreError};
use crate::timing::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineState {
    Idle,
    Running,
    Paused,
    Complete,
}

/// Position within the routine, as shown in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutineProgress {
    /// 1-based step number.
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

pub struct RoutineSession<C: Clock> {
    clock: C,
    store: SharedStore,
    routine: &'static Routine,
    step: usize,
    state: RoutineState,
    started_ms: u64,
    paused_accum_ms: u64,
    pause_started_ms: Option<u64>,
    step_started_ms: u64,
    step_time_left_secs: u64,
    elapsed_secs: u64,
    completion: Option<RoutineCompletion>,
}

impl<C: Clock> RoutineSession<C> {
    /// Session for `routine_id`; unknown ids get the morning routine.
    pub fn new(clock: C, store: SharedStore, routine_id: &str) -> Self {
        let routine = routine(routine_id);
        if routine.id != routine_id {
            log::warn!("unknown routine {routine_id:?}; using {:?}", routine.id);
        }
        Self {
            clock,
            store,
            routine,
            step: 0,
            state: RoutineState::Idle,
            started_ms: 0,
            paused_accum_ms: 0,
            pause_started_ms: None,
            step_started_ms: 0,
            step_time_left_secs: first_duration(routine),
            elapsed_secs: 0,
            completion: None,
        }
    }

    /// Start a fresh run, or resume after [`pause`](Self::pause).  A completed
    /// routine starts over from the first step.
    pub fn start(&mut self) {
        let now = self.clock.now_ms();
        match self.state {
            RoutineState::Running => {}
            RoutineState::Paused => {
                let paused_at = self.pause_started_ms.take().unwrap_or(now);
                let pause_len = now.saturating_sub(paused_at);
                self.paused_accum_ms += pause_len;
                self.step_started_ms += pause_len;
                self.state = RoutineState::Running;
                log::info!("routine {} resumed at step {}", self.routine.id, self.step + 1);
            }
            RoutineState::Idle | RoutineState::Complete => {
                if self.state == RoutineState::Complete {
                    self.reset();
                }
                self.started_ms = now;
                self.step_started_ms = now;
                self.paused_accum_ms = 0;
                self.step_time_left_secs = self.step_duration_secs();
                self.state = RoutineState::Running;
                log::info!("routine {} started", self.routine.id);
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state != RoutineState::Running {
            return;
        }
        let now = self.clock.now_ms();
        self.refresh(now);
        self.pause_started_ms = Some(now);
        self.state = RoutineState::Paused;
        log::info!("routine {} paused", self.routine.id);
    }

    /// Move to the next exercise, or finish after the last one.
    ///
    /// Returns the completion record when this call finished the routine.
    pub fn next_step(&mut self) -> Result<Option<RoutineCompletion>, StoreError> {
        if self.state == RoutineState::Complete {
            return Ok(None);
        }
        let anchor = self.step_anchor();
        self.advance(anchor)
    }

    /// Go back one exercise and restart its clock.  No-op on the first step.
    pub fn previous_step(&mut self) {
        if self.step == 0 || self.state == RoutineState::Complete {
            return;
        }
        self.step -= 1;
        self.step_started_ms = self.step_anchor();
        self.step_time_left_secs = self.step_duration_secs();
    }

    /// Back to the first step, stopped.
    pub fn reset(&mut self) {
        self.state = RoutineState::Idle;
        self.step = 0;
        self.elapsed_secs = 0;
        self.paused_accum_ms = 0;
        self.pause_started_ms = None;
        self.completion = None;
        self.step_time_left_secs = first_duration(self.routine);
    }

    /// Update the clocks; auto-advance when the current step has run out.
    pub fn tick(&mut self) -> Result<Option<RoutineCompletion>, StoreError> {
        if self.state != RoutineState::Running {
            return Ok(None);
        }
        let now = self.clock.now_ms();
        while self.state == RoutineState::Running {
            let duration_ms = self.step_duration_secs() * 1_000;
            if now.saturating_sub(self.step_started_ms) < duration_ms {
                break;
            }
            let deadline = self.step_started_ms + duration_ms;
            if let Some(done) = self.advance(deadline)? {
                return Ok(Some(done));
            }
        }
        self.refresh(now);
        Ok(None)
    }

    fn advance(&mut self, step_start: u64) -> Result<Option<RoutineCompletion>, StoreError> {
        if self.step + 1 >= self.routine.len() {
            return self.finish().map(Some);
        }
        self.step += 1;
        self.step_started_ms = step_start;
        self.step_time_left_secs = self.step_duration_secs();
        log::debug!(
            "routine {} step {} / {}",
            self.routine.id,
            self.step + 1,
            self.routine.len()
        );
        Ok(None)
    }

    fn finish(&mut self) -> Result<RoutineCompletion, StoreError> {
        let now = self.pause_started_ms.unwrap_or_else(|| self.clock.now_ms());
        // Skipping through a routine that was never started takes no time.
        self.elapsed_secs = match self.state {
            RoutineState::Idle => 0,
            _ => self.active_ms(now) / 1_000,
        };
        self.state = RoutineState::Complete;
        self.pause_started_ms = None;

        let record = RoutineCompletion {
            routine_id: self.routine.id.to_string(),
            duration: self.elapsed_secs,
            completed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            steps: self.routine.len(),
        };
        self.completion = Some(record.clone());
        log::info!(
            "routine {} complete in {} s",
            self.routine.id,
            self.elapsed_secs
        );
        append_completion(self.store.as_ref(), record.clone())?;
        Ok(record)
    }

    fn refresh(&mut self, now: u64) {
        self.elapsed_secs = self.active_ms(now) / 1_000;
        let duration_ms = self.step_duration_secs() * 1_000;
        let remaining = duration_ms.saturating_sub(now.saturating_sub(self.step_started_ms));
        self.step_time_left_secs = remaining.div_ceil(1_000);
    }

    fn active_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_ms)
            .saturating_sub(self.paused_accum_ms)
    }

    /// Start time for a step entered manually: now, or the pause instant so
    /// that resuming shifts it correctly.
    fn step_anchor(&self) -> u64 {
        self.pause_started_ms
            .unwrap_or_else(|| self.clock.now_ms())
    }

    fn step_duration_secs(&self) -> u64 {
        u64::from(self.current_exercise().duration_secs)
    }

    // -- accessors ---------------------------------------------------------

    pub fn routine(&self) -> &'static Routine {
        self.routine
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn current_exercise(&self) -> &'static Exercise {
        &self.routine.exercises[self.step.min(self.routine.len().saturating_sub(1))]
    }

    pub fn state(&self) -> RoutineState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RoutineState::Running | RoutineState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == RoutineState::Paused
    }

    /// Active seconds since start, pauses excluded.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn step_time_left_secs(&self) -> u64 {
        self.step_time_left_secs
    }

    pub fn completion(&self) -> Option<&RoutineCompletion> {
        self.completion.as_ref()
    }

    pub fn progress(&self) -> RoutineProgress {
        let total = self.routine.len();
        let current = (self.step + 1).min(total);
        RoutineProgress {
            current,
            total,
            percentage: if total == 0 {
                0.0
            } else {
                current as f64 / total as f64 * 100.0
            },
        }
    }

    pub fn total_duration_secs(&self) -> u32 {
        self.routine.total_duration_secs()
    }
}

fn first_duration(routine: &Routine) -> u64 {
    routine
        .exercises
        .first()
        .map_or(0, |e| u64::from(e.duration_secs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_completions, MemoryStore};
    use crate::timing::ManualClock;

    fn session(id: &str) -> (RoutineSession<ManualClock>, ManualClock, SharedStore) {
        let clock = ManualClock::new(0);
        let store = MemoryStore::shared();
        let s = RoutineSession::new(clock.clone(), store.clone(), id);
        (s, clock, store)
    }

    #[test]
    fn new_session_is_idle_on_first_step() {
        let (s, _, _) = session("weekend");
        assert_eq!(s.state(), RoutineState::Idle);
        assert_eq!(s.current_exercise().id, "reading_aloud");
        assert_eq!(s.step_time_left_secs(), 180);
        assert_eq!(s.total_duration_secs(), 660);
    }

    #[test]
    fn unknown_id_uses_morning() {
        let (s, _, _) = session("bogus");
        assert_eq!(s.routine().id, "morning");
    }

    #[test]
    fn tick_counts_down_and_auto_advances() {
        let (mut s, clock, _) = session("weekend");
        s.start();
        clock.advance(10_500);
        s.tick().unwrap();
        assert_eq!(s.elapsed_secs(), 10);
        assert_eq!(s.step_time_left_secs(), 170);

        clock.set(180_000);
        s.tick().unwrap();
        assert_eq!(s.current_step(), 1);
        assert_eq!(s.step_time_left_secs(), 120);
    }

    #[test]
    fn late_tick_catches_up_across_steps() {
        let (mut s, clock, _) = session("weekend");
        s.start();
        clock.set(310_000);
        s.tick().unwrap();
        assert_eq!(s.current_step(), 2);
        // step 3 began at 300 s
        assert_eq!(s.step_time_left_secs(), 350);
    }

    #[test]
    fn pause_excludes_time() {
        let (mut s, clock, _) = session("weekend");
        s.start();
        clock.set(60_000);
        s.pause();
        assert!(s.is_paused());
        clock.set(600_000);
        assert!(s.tick().unwrap().is_none());
        assert_eq!(s.current_step(), 0);

        s.start();
        clock.set(620_000);
        s.tick().unwrap();
        assert_eq!(s.elapsed_secs(), 80);
        assert_eq!(s.step_time_left_secs(), 100);
    }

    #[test]
    fn manual_navigation() {
        let (mut s, clock, _) = session("morning");
        s.start();
        clock.set(5_000);
        s.next_step().unwrap();
        assert_eq!(s.current_exercise().id, "breathing_hiss");
        clock.set(7_000);
        s.tick().unwrap();
        assert_eq!(s.step_time_left_secs(), 178);

        s.previous_step();
        assert_eq!(s.current_step(), 0);
        assert_eq!(s.step_time_left_secs(), 60);
        s.previous_step();
        assert_eq!(s.current_step(), 0);
    }

    #[test]
    fn progress_reports_position() {
        let (mut s, _, _) = session("evening");
        let p = s.progress();
        assert_eq!((p.current, p.total), (1, 3));
        s.start();
        s.next_step().unwrap();
        assert!((s.progress().percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn finishing_records_completion_once() {
        let (mut s, clock, store) = session("weekend");
        s.start();
        clock.set(659_000);
        assert!(s.tick().unwrap().is_none());
        clock.set(660_000);
        let done = s.tick().unwrap().expect("routine complete");
        assert_eq!(done.routine_id, "weekend");
        assert_eq!(done.duration, 660);
        assert_eq!(done.steps, 3);
        assert_eq!(s.state(), RoutineState::Complete);
        assert!(!s.is_active());

        assert!(s.tick().unwrap().is_none());
        assert!(s.next_step().unwrap().is_none());
        assert_eq!(load_completions(store.as_ref()), vec![done]);
    }

    #[test]
    fn skipping_through_last_step_completes() {
        let (mut s, _, store) = session("evening");
        s.start();
        assert!(s.next_step().unwrap().is_none());
        assert!(s.next_step().unwrap().is_none());
        let done = s.next_step().unwrap().expect("complete");
        assert_eq!(done.duration, 0);
        assert_eq!(load_completions(store.as_ref()).len(), 1);
    }

    #[test]
    fn skipping_without_starting_records_zero_duration() {
        let (mut s, clock, _) = session("evening");
        clock.set(90_000);
        s.next_step().unwrap();
        s.next_step().unwrap();
        let done = s.next_step().unwrap().expect("complete");
        assert_eq!(done.duration, 0);
    }

    #[test]
    fn start_after_completion_begins_again() {
        let (mut s, _, _) = session("evening");
        s.start();
        for _ in 0..3 {
            s.next_step().unwrap();
        }
        assert!(s.completion().is_some());
        s.start();
        assert_eq!(s.state(), RoutineState::Running);
        assert_eq!(s.current_step(), 0);
        assert!(s.completion().is_none());
    }

    #[test]
    fn reset_returns_to_first_step() {
        let (mut s, clock, _) = session("morning");
        s.start();
        clock.set(200_000);
        s.tick().unwrap();
        s.reset();
        assert_eq!(s.state(), RoutineState::Idle);
        assert_eq!(s.current_step(), 0);
        assert_eq!(s.elapsed_secs(), 0);
        assert_eq!(s.step_time_left_secs(), 60);
    }
}

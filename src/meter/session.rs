//! Per-session loudness statistics.
//!
//! Peak follows the *instantaneous* level so short spikes register; average
//! and minimum follow the *smoothed* level so the summary stays stable.  Only
//! readings louder than the voice threshold count toward the statistics,
//! which keeps room tone out of the average.

/// Statistics for one metering session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSession {
    smoothed_db: Option<i32>,
    peak_db: i32,
    avg_db: i32,
    min_db: Option<i32>,
    voice_samples: Vec<f64>,
    voice_sum: f64,
}

impl MeterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the statistics.
    ///
    /// `instant` is the calibrated single-frame level, `smoothed` the
    /// windowed value published to the UI.
    pub fn record(&mut self, instant: f64, smoothed: f64, voice_threshold: f64) {
        self.smoothed_db = Some(smoothed.round() as i32);

        if smoothed <= voice_threshold {
            return;
        }

        self.voice_samples.push(smoothed);
        self.voice_sum += smoothed;

        if instant > f64::from(self.peak_db) {
            self.peak_db = instant.round() as i32;
        }

        let smoothed_rounded = smoothed.round() as i32;
        if self.min_db.map_or(true, |min| smoothed_rounded < min) {
            self.min_db = Some(smoothed_rounded);
        }

        let mean = self.voice_sum / self.voice_samples.len() as f64;
        self.avg_db = mean.round() as i32;
    }

    /// Latest rounded smoothed reading; `None` until the first frame.
    pub fn smoothed_db(&self) -> Option<i32> {
        self.smoothed_db
    }

    /// Loudest instantaneous voice reading, 0 before any voice.
    pub fn peak_db(&self) -> i32 {
        self.peak_db
    }

    /// Mean of the voice samples, 0 before any voice.
    pub fn avg_db(&self) -> i32 {
        self.avg_db
    }

    /// Quietest smoothed voice reading; `None` before any voice.
    pub fn min_db(&self) -> Option<i32> {
        self.min_db
    }

    /// [`min_db`](Self::min_db) with the "no voice yet" state shown as 0.
    pub fn min_db_or_zero(&self) -> i32 {
        self.min_db.unwrap_or(0)
    }

    pub fn voice_samples(&self) -> &[f64] {
        &self.voice_samples
    }

    /// Returns `true` once both peak and average are non-zero, i.e. there is
    /// something worth saving.
    pub fn has_data(&self) -> bool {
        self.peak_db != 0 && self.avg_db != 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 40.0;

    #[test]
    fn new_session_is_empty() {
        let s = MeterSession::new();
        assert_eq!(s.smoothed_db(), None);
        assert_eq!(s.peak_db(), 0);
        assert_eq!(s.avg_db(), 0);
        assert_eq!(s.min_db(), None);
        assert_eq!(s.min_db_or_zero(), 0);
        assert!(!s.has_data());
    }

    #[test]
    fn quiet_readings_only_update_current_value() {
        let mut s = MeterSession::new();
        s.record(38.0, 39.6, THRESHOLD);
        s.record(40.0, 40.0, THRESHOLD);
        assert_eq!(s.smoothed_db(), Some(40));
        assert!(s.voice_samples().is_empty());
        assert_eq!(s.peak_db(), 0);
        assert_eq!(s.min_db(), None);
    }

    #[test]
    fn peak_uses_instant_min_uses_smoothed() {
        let mut s = MeterSession::new();
        s.record(80.0, 60.0, THRESHOLD);
        s.record(55.0, 58.0, THRESHOLD);
        assert_eq!(s.peak_db(), 80);
        assert_eq!(s.min_db(), Some(58));
    }

    #[test]
    fn peak_never_decreases() {
        let mut s = MeterSession::new();
        let mut last = 0;
        for (instant, smoothed) in [(70.0, 50.0), (65.0, 52.0), (90.0, 60.0), (45.0, 55.0)] {
            s.record(instant, smoothed, THRESHOLD);
            assert!(s.peak_db() >= last);
            last = s.peak_db();
        }
        assert_eq!(last, 90);
    }

    #[test]
    fn average_is_running_mean_of_voice() {
        let mut s = MeterSession::new();
        s.record(50.0, 50.0, THRESHOLD);
        s.record(35.0, 35.0, THRESHOLD); // ignored
        s.record(61.0, 61.0, THRESHOLD);
        assert_eq!(s.voice_samples(), &[50.0, 61.0]);
        assert_eq!(s.avg_db(), 56); // 55.5 rounds up
        assert!(s.has_data());
    }

    #[test]
    fn average_tracks_long_sessions() {
        let mut s = MeterSession::new();
        for i in 0..10_000 {
            let level = if i % 2 == 0 { 50.0 } else { 70.0 };
            s.record(level, level, THRESHOLD);
        }
        assert_eq!(s.voice_samples().len(), 10_000);
        assert_eq!(s.avg_db(), 60);

        s.record(30.0, 30.0, THRESHOLD); // below threshold, no effect
        assert_eq!(s.avg_db(), 60);
        s.record(90.0, 90.0, THRESHOLD);
        assert_eq!(s.avg_db(), 60); // 600_030 / 10_001 = 60.003
    }
}

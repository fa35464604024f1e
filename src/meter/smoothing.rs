//! Recency-weighted sliding window over recent readings.
//!
//! Every reading carries its timestamp.  On each push, readings older than
//! the window are dropped and the remaining ones are averaged with a weight
//! that falls linearly from 1.0 (brand new) to a floor at the window's edge:
//!
//! ```text
//! weight(age) = max(floor, 1 - age / window)
//! ```

use std::collections::VecDeque;

/// Window length used by the meter.
pub const DEFAULT_WINDOW_MS: u64 = 500;
/// Weight of a reading at the far edge of the window.
pub const DEFAULT_FLOOR_WEIGHT: f64 = 0.3;

/// One instantaneous reading in the history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    pub level: f64,
    pub timestamp_ms: u64,
}

/// Bounded history of [`MeterReading`]s.
#[derive(Debug, Clone)]
pub struct LevelHistory {
    window_ms: u64,
    floor_weight: f64,
    readings: VecDeque<MeterReading>,
}

impl LevelHistory {
    /// `window_ms` is raised to at least 1 ms and `floor_weight` clamped to
    /// `0.0..=1.0`.
    pub fn new(window_ms: u64, floor_weight: f64) -> Self {
        Self {
            window_ms: window_ms.max(1),
            floor_weight: floor_weight.clamp(0.0, 1.0),
            readings: VecDeque::new(),
        }
    }

    /// Record `level` at `now_ms`, prune, and return the smoothed value.
    pub fn push(&mut self, level: f64, now_ms: u64) -> f64 {
        self.readings.push_back(MeterReading {
            level,
            timestamp_ms: now_ms,
        });
        self.prune(now_ms);
        self.weighted_mean(now_ms).unwrap_or(level)
    }

    /// Drop readings older than the window relative to `now_ms`.
    pub fn prune(&mut self, now_ms: u64) {
        let window = self.window_ms;
        self.readings
            .retain(|r| now_ms.saturating_sub(r.timestamp_ms) <= window);
    }

    /// Weighted mean of the retained readings, or `None` when empty.
    pub fn weighted_mean(&self, now_ms: u64) -> Option<f64> {
        let (sum, total) = self
            .readings
            .iter()
            .fold((0.0, 0.0), |(sum, total), r| {
                let age = now_ms.saturating_sub(r.timestamp_ms) as f64;
                let weight = (1.0 - age / self.window_ms as f64).max(self.floor_weight);
                (sum + r.level * weight, total + weight)
            });
        (total > 0.0).then(|| sum / total)
    }

    /// Age of the oldest retained reading.
    pub fn oldest_age_ms(&self, now_ms: u64) -> Option<u64> {
        self.readings
            .front()
            .map(|r| now_ms.saturating_sub(r.timestamp_ms))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

impl Default for LevelHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, DEFAULT_FLOOR_WEIGHT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_reading_is_its_own_mean() {
        let mut h = LevelHistory::default();
        assert_eq!(h.push(62.0, 1_000), 62.0);
    }

    #[test]
    fn old_readings_are_pruned() {
        let mut h = LevelHistory::default();
        for t in (0..2_000).step_by(16) {
            h.push(50.0, t);
            assert!(h.oldest_age_ms(t).unwrap() <= 500);
        }
        // 0..=1984 step 16: only the last ~32 readings survive
        assert!(h.len() <= 32);
    }

    #[test]
    fn reading_exactly_at_window_edge_is_kept() {
        let mut h = LevelHistory::default();
        h.push(40.0, 0);
        h.push(60.0, 500);
        assert_eq!(h.len(), 2);
        h.push(60.0, 501);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn recent_readings_weigh_more() {
        let mut h = LevelHistory::default();
        h.push(40.0, 0);
        let smoothed = h.push(80.0, 400);
        // weights: old = max(0.3, 0.2) = 0.3, new = 1.0
        let expected = (40.0 * 0.3 + 80.0 * 1.0) / 1.3;
        assert!((smoothed - expected).abs() < 1e-9);
        assert!(smoothed > 60.0);
    }

    #[test]
    fn linear_weight_inside_window() {
        let mut h = LevelHistory::default();
        h.push(30.0, 0);
        let smoothed = h.push(90.0, 250);
        // old weight = 1 - 250/500 = 0.5
        let expected = (30.0 * 0.5 + 90.0) / 1.5;
        assert!((smoothed - expected).abs() < 1e-9);
    }

    #[test]
    fn clear_empties_history() {
        let mut h = LevelHistory::default();
        h.push(55.0, 10);
        h.clear();
        assert!(h.is_empty());
        assert!(h.weighted_mean(10).is_none());
    }

    #[test]
    fn zero_window_is_raised_to_one_ms() {
        let mut h = LevelHistory::new(0, 0.3);
        assert_eq!(h.push(50.0, 100), 50.0);
        h.push(70.0, 101);
        assert_eq!(h.len(), 2);
        let smoothed = h.push(90.0, 102);
        assert_eq!(h.len(), 2);
        // 101 is at the 1 ms edge: weight = max(0.3, 0.0)
        let expected = (70.0 * 0.3 + 90.0) / 1.3;
        assert!((smoothed - expected).abs() < 1e-9);
        assert!(smoothed.is_finite());
    }
}

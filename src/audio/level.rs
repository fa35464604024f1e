//! Instantaneous signal level in dBFS.
//!
//! The capture callback reduces each hardware buffer to one RMS level and
//! publishes it through a [`LevelTap`].  The meter engine polls the tap once
//! per display frame, so only the most recent buffer matters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Level reported for digital silence.
pub const SILENCE_DBFS: f32 = f32::NEG_INFINITY;

/// RMS level of `samples` in decibels relative to full scale.
///
/// Returns [`SILENCE_DBFS`] for an empty or all-zero buffer.  Full-scale
/// square input (`±1.0`) yields `0.0`.
pub fn rms_dbfs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DBFS;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_sq.sqrt();
    if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        SILENCE_DBFS
    }
}

// ---------------------------------------------------------------------------
// LevelTap
// ---------------------------------------------------------------------------

/// Lock-free "latest level" cell shared between the audio thread and the
/// engine.
///
/// Stores the `f32` bit pattern in an [`AtomicU32`] so the real-time
/// callback never blocks.
#[derive(Debug, Clone)]
pub struct LevelTap {
    bits: Arc<AtomicU32>,
}

impl LevelTap {
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(SILENCE_DBFS.to_bits())),
        }
    }

    /// Publish a new level (called from the audio thread).
    pub fn publish(&self, dbfs: f32) {
        self.bits.store(dbfs.to_bits(), Ordering::Relaxed);
    }

    /// Most recently published level.
    pub fn latest(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Forget the last level.
    pub fn clear(&self) {
        self.publish(SILENCE_DBFS);
    }
}

impl Default for LevelTap {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

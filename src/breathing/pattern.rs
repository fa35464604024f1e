//! Breathing phases and the per-phase durations that drive them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One leg of the breathing cycle.
///
/// ```text
/// Inhale ──▶ Hold ──▶ Exhale ──▶ Inhale ──▶ …
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 3] = [Phase::Inhale, Phase::Hold, Phase::Exhale];

    /// The phase that follows this one.
    pub fn next(self) -> Phase {
        match self {
            Phase::Inhale => Phase::Hold,
            Phase::Hold => Phase::Exhale,
            Phase::Exhale => Phase::Inhale,
        }
    }

    /// Translation key of the phase label.
    pub fn label_key(self) -> &'static str {
        match self {
            Phase::Inhale => "breathing.inhale",
            Phase::Hold => "breathing.hold",
            Phase::Exhale => "breathing.exhale",
        }
    }

    /// Translation key of the on-screen instruction.
    pub fn instruction_key(self) -> &'static str {
        match self {
            Phase::Inhale => "breathing.inhale_instruction",
            Phase::Hold => "breathing.hold_instruction",
            Phase::Exhale => "breathing.exhale_instruction",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Inhale
    }
}

// ---------------------------------------------------------------------------
// PatternError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must look like \"inhale-hold-exhale\", got {0:?}")]
    Format(String),

    #[error("pattern {0:?} has a zero-length cycle")]
    EmptyCycle(String),

    #[error("pattern {0:?} has a phase longer than {MAX_PHASE_SEC} s")]
    TooLong(String),
}

/// Longest allowed phase; keeps cycle arithmetic in range.
pub const MAX_PHASE_SEC: u32 = 3_600;

// ---------------------------------------------------------------------------
// BreathingPattern
// ---------------------------------------------------------------------------

/// Phase durations in whole seconds.
///
/// A pattern may contain a zero-length phase (e.g. `4-0-6` skips the hold)
/// but never a zero-length cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BreathingPattern {
    inhale_sec: u32,
    hold_sec: u32,
    exhale_sec: u32,
}

impl BreathingPattern {
    /// Default `4-4-6` pattern.
    pub const CALM: BreathingPattern = BreathingPattern {
        inhale_sec: 4,
        hold_sec: 4,
        exhale_sec: 6,
    };

    /// Named presets offered in the settings panel.
    pub const PRESETS: [(&'static str, BreathingPattern); 3] = [
        ("4-4-6", Self::CALM),
        (
            "4-7-8",
            BreathingPattern {
                inhale_sec: 4,
                hold_sec: 7,
                exhale_sec: 8,
            },
        ),
        (
            "6-2-8",
            BreathingPattern {
                inhale_sec: 6,
                hold_sec: 2,
                exhale_sec: 8,
            },
        ),
    ];

    pub fn new(inhale_sec: u32, hold_sec: u32, exhale_sec: u32) -> Result<Self, PatternError> {
        let pattern = Self {
            inhale_sec,
            hold_sec,
            exhale_sec,
        };
        if [inhale_sec, hold_sec, exhale_sec]
            .iter()
            .any(|&sec| sec > MAX_PHASE_SEC)
        {
            return Err(PatternError::TooLong(pattern.to_string()));
        }
        if pattern.cycle_sec() == 0 {
            return Err(PatternError::EmptyCycle(pattern.to_string()));
        }
        Ok(pattern)
    }

    pub fn inhale_sec(&self) -> u32 {
        self.inhale_sec
    }

    pub fn hold_sec(&self) -> u32 {
        self.hold_sec
    }

    pub fn exhale_sec(&self) -> u32 {
        self.exhale_sec
    }

    /// Duration of `phase` in seconds.
    pub fn duration_sec(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => self.inhale_sec,
            Phase::Hold => self.hold_sec,
            Phase::Exhale => self.exhale_sec,
        }
    }

    /// Duration of `phase` in milliseconds.
    pub fn duration_ms(&self, phase: Phase) -> u64 {
        u64::from(self.duration_sec(phase)) * 1_000
    }

    /// Length of one full cycle in seconds.
    pub fn cycle_sec(&self) -> u32 {
        self.inhale_sec + self.hold_sec + self.exhale_sec
    }

    /// Seconds from the start of the cycle to the start of `phase`.
    pub fn offset_sec(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => 0,
            Phase::Hold => self.inhale_sec,
            Phase::Exhale => self.inhale_sec + self.hold_sec,
        }
    }

    /// Look up a preset by its `"I-H-E"` name.
    pub fn preset(name: &str) -> Option<BreathingPattern> {
        Self::PRESETS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, p)| *p)
    }
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self::CALM
    }
}

impl fmt::Display for BreathingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.inhale_sec, self.hold_sec, self.exhale_sec)
    }
}

impl FromStr for BreathingPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let [inhale, hold, exhale] = parts.as_slice() else {
            return Err(PatternError::Format(s.to_string()));
        };
        let parse = |p: &str| {
            p.trim()
                .parse::<u32>()
                .map_err(|_| PatternError::Format(s.to_string()))
        };
        Self::new(parse(inhale)?, parse(hold)?, parse(exhale)?)
    }
}

impl TryFrom<String> for BreathingPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BreathingPattern> for String {
    fn from(p: BreathingPattern) -> Self {
        p.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

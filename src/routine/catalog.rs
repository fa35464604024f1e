//! Built-in exercise routines.
//!
//! Only structure lives here (ids, durations, kinds).  Names, instructions
//! and do/don't lists come from the `exercises` section of the locale
//! catalogs, keyed by exercise id.

use chrono::Weekday;

use crate::breathing::BreathingPattern;

/// What an exercise trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    Physical,
    Breathing,
    /// Semi-occluded vocal tract.
    Sovt,
    Transition,
    Resonance,
    Release,
    Loudness,
    Endurance,
    Maintenance,
    Activation,
    Enjoyment,
    Strengthening,
    SensoryTraining,
    AdvancedTechnique,
    StrengthTraining,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exercise {
    pub id: &'static str,
    pub duration_secs: u32,
    pub kind: ExerciseKind,
    /// Pattern for the breathing timer shown with this exercise.
    pub breathing_pattern: Option<BreathingPattern>,
    /// May be skipped.
    pub optional: bool,
    /// Days the exercise is meant for; `None` means every day.
    pub schedule: Option<&'static [Weekday]>,
    /// Needs care; the UI shows a caution marker.
    pub warning: bool,
}

impl Exercise {
    const fn new(id: &'static str, duration_secs: u32, kind: ExerciseKind) -> Self {
        Self {
            id,
            duration_secs,
            kind,
            breathing_pattern: None,
            optional: false,
            schedule: None,
            warning: false,
        }
    }

    /// Returns `true` when the exercise is scheduled for `day`.
    pub fn is_scheduled_on(&self, day: Weekday) -> bool {
        self.schedule.map_or(true, |days| days.contains(&day))
    }

    /// Translation key prefix for this exercise's content.
    pub fn content_key(&self) -> String {
        format!("exercises.{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Routine {
    pub id: &'static str,
    pub name: &'static str,
    /// Advertised length in minutes.
    pub nominal_minutes: u32,
    pub description: &'static str,
    pub exercises: &'static [Exercise],
}

impl Routine {
    /// Sum of all exercise durations.
    pub fn total_duration_secs(&self) -> u32 {
        self.exercises.iter().map(|e| e.duration_secs).sum()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

use ExerciseKind::*;

const MORNING: &[Exercise] = &[
    Exercise::new("laryngeal_reset", 60, Physical),
    Exercise {
        breathing_pattern: Some(BreathingPattern::CALM),
        ..Exercise::new("breathing_hiss", 180, Breathing)
    },
    Exercise::new("straw_water", 120, Sovt),
    Exercise::new("lip_trills", 120, Sovt),
    Exercise::new("carryover", 60, Transition),
    Exercise::new("hum_sirens", 60, Resonance),
    Exercise::new("formant_tuning", 180, Resonance),
    Exercise::new("yawn_sigh", 60, Release),
];

const EVENING: &[Exercise] = &[
    Exercise::new("sovt_cooldown", 60, Sovt),
    Exercise::new("vocal_ladder", 240, Loudness),
    Exercise {
        optional: true,
        schedule: Some(&[Weekday::Wed, Weekday::Fri]),
        ..Exercise::new("controlled_loud_read", 180, Endurance)
    },
];

const WEEKEND: &[Exercise] = &[
    Exercise::new("reading_aloud", 180, Maintenance),
    Exercise::new("cold_start_protocol", 120, Activation),
    Exercise::new("singing_humming", 360, Enjoyment),
];

const OPTIONAL: &[Exercise] = &[
    Exercise::new("soft_palate_work", 120, Strengthening),
    Exercise::new("nasal_oral_contrast", 120, SensoryTraining),
    Exercise {
        warning: true,
        ..Exercise::new("bite_block_reading", 120, AdvancedTechnique)
    },
    Exercise::new("rmst_training", 180, StrengthTraining),
];

/// Every built-in routine, in menu order.
pub const ROUTINES: &[Routine] = &[
    Routine {
        id: "morning",
        name: "Morning Routine",
        nominal_minutes: 14,
        description: "Complete vocal warm-up and strengthening routine",
        exercises: MORNING,
    },
    Routine {
        id: "evening",
        name: "Evening Routine",
        nominal_minutes: 14,
        description: "Cool-down, reinforcement, and dynamic practice",
        exercises: EVENING,
    },
    Routine {
        id: "weekend",
        name: "Weekend Silence-Proof Routine",
        nominal_minutes: 11,
        description: "Keep the voice active to prevent Monday morning stiffness",
        exercises: WEEKEND,
    },
    Routine {
        id: "optional",
        name: "Optional Modules",
        nominal_minutes: 10,
        description: "Advanced training for targeted voice issues",
        exercises: OPTIONAL,
    },
];

/// Look up a routine; unknown ids get the morning routine.
pub fn routine(id: &str) -> &'static Routine {
    ROUTINES
        .iter()
        .find(|r| r.id == id)
        .unwrap_or(&ROUTINES[0])
}

/// Format seconds as `m:ss`.
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_routines_resolve() {
        assert_eq!(routine("evening").id, "evening");
        assert_eq!(routine("weekend").len(), 3);
        assert_eq!(routine("optional").exercises[2].id, "bite_block_reading");
    }

    #[test]
    fn unknown_routine_falls_back_to_morning() {
        assert_eq!(routine("midnight").id, "morning");
        assert_eq!(routine("").id, "morning");
    }

    #[test]
    fn morning_routine_layout() {
        let r = routine("morning");
        assert_eq!(r.len(), 8);
        assert_eq!(r.total_duration_secs(), 840);
        let hiss = &r.exercises[1];
        assert_eq!(hiss.kind, ExerciseKind::Breathing);
        assert_eq!(hiss.breathing_pattern, Some(BreathingPattern::CALM));
    }

    #[test]
    fn evening_loud_read_is_optional_midweek() {
        let read = routine("evening").exercises[2];
        assert!(read.optional);
        assert!(read.is_scheduled_on(Weekday::Wed));
        assert!(!read.is_scheduled_on(Weekday::Mon));
        assert!(routine("evening").exercises[0].is_scheduled_on(Weekday::Mon));
    }

    #[test]
    fn warning_flag_only_on_bite_block() {
        let flagged: Vec<_> = ROUTINES
            .iter()
            .flat_map(|r| r.exercises.iter())
            .filter(|e| e.warning)
            .map(|e| e.id)
            .collect();
        assert_eq!(flagged, vec!["bite_block_reading"]);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(840), "14:00");
    }

    #[test]
    fn content_key_prefix() {
        assert_eq!(routine("morning").exercises[0].content_key(), "exercises.laryngeal_reset");
    }
}

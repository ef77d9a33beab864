use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::activity::Discipline;

/// The declarative training-goal configuration (spec.md §6).
///
/// Unknown keys in the source TOML document are ignored (serde's default
/// behavior without `deny_unknown_fields`); missing required keys fail the
/// load with `ConfigError::MissingField` before this struct is ever built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goals {
    pub weekly_structure: WeeklyStructure,
    pub preferences: Preferences,
    #[serde(default)]
    pub protected_keywords: Vec<String>,
    #[serde(default)]
    pub safety: SafetyLimits,
    /// Config-declared discipline priority order; defaults to
    /// strength > run > bike > swim per spec.md §4.5 step 3.
    #[serde(default = "default_priority")]
    pub discipline_priority: Vec<Discipline>,
}

fn default_priority() -> Vec<Discipline> {
    Discipline::all().to_vec()
}

impl Goals {
    /// Parsed `preferences.user_timezone`. Config loading already rejects
    /// an unparseable value (`config::document::validate_goals`), so this
    /// falls back to UTC only for `Goals` built outside that path (tests).
    #[must_use]
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.preferences.user_timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyStructure {
    #[serde(default)]
    pub swim_sessions: u32,
    #[serde(default)]
    pub bike_sessions: u32,
    #[serde(default)]
    pub run_sessions: u32,
    #[serde(default)]
    pub strength_sessions: u32,
}

impl WeeklyStructure {
    #[must_use]
    pub fn target(&self, discipline: Discipline) -> u32 {
        match discipline {
            Discipline::Swim => self.swim_sessions,
            Discipline::Bike => self.bike_sessions,
            Discipline::Run => self.run_sessions,
            Discipline::Strength => self.strength_sessions,
            Discipline::Other => 0,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> HashMap<Discipline, u32> {
        Discipline::all()
            .into_iter()
            .map(|d| (d, self.target(d)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreferredTime {
    Morning,
    Evening,
    Flexible,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Hour of day, `0 <= start < end <= 24`.
    pub start_hour: u32,
    pub end_hour: u32,
}

impl TimeWindow {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_hour < self.end_hour && self.end_hour <= 24
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub preferred_workout_time: PreferredTime,
    pub morning_hours: TimeWindow,
    pub evening_hours: TimeWindow,
    pub user_timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyLimits {
    #[serde(default = "default_max_mutations")]
    pub max_mutations_per_cycle: u32,
    #[serde(default = "default_min_notice_hours")]
    pub min_notice_hours: u32,
}

fn default_max_mutations() -> u32 {
    8
}

fn default_min_notice_hours() -> u32 {
    2
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_mutations_per_cycle: default_max_mutations(),
            min_notice_hours: default_min_notice_hours(),
        }
    }
}

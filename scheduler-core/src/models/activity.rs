use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed workout as reported by the wearable. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub discipline: Discipline,
    pub duration_minutes: f64,
    pub distance_km: Option<f64>,
    pub avg_hr: Option<f64>,
    pub training_load: f64,
    pub perceived_exertion: Option<i32>,
    pub calories: Option<f64>,
    pub raw_payload: serde_json::Value,
}

/// Training discipline. `Other` absorbs anything the wearable reports that
/// doesn't fit the core four, per SPEC_FULL.md §3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Run,
    Bike,
    Swim,
    Strength,
    Other,
}

impl Discipline {
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Bike => "bike",
            Self::Swim => "swim",
            Self::Strength => "strength",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn all() -> [Discipline; 4] {
        [Self::Strength, Self::Run, Self::Bike, Self::Swim]
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

//! Shared test doubles for the scenario tests in `tests/scenarios.rs`.
//!
//! These stand in for the collaborator traits in `scheduler_core::clients`
//! (SPEC_FULL.md §9 "each collaborator is expressed as a small, explicit
//! capability set"). The store-side traits (`HealthStore`/`AuditStore`) are
//! exercised against the real `SqliteStore` on an in-memory database rather
//! than faked, since that collaborator has no network boundary worth
//! doubling out.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scheduler_core::clients::{CalendarClient, Clock, LmClient};
use scheduler_core::errors::{CalendarError, LmError};
use scheduler_core::models::{
    CalendarEvent, Discipline, Goals, IntensityVariant, PreferredTime, Preferences, SafetyLimits, TimeWindow,
    WeeklyStructure, WorkoutTemplate,
};

/// In-memory calendar, keyed by `external_id`. Assigns one on first
/// `upsert` of an event that doesn't already carry one, mirroring a real
/// calendar API.
#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<HashMap<String, CalendarEvent>>,
    next_id: Mutex<u64>,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing event (must already carry an `external_id`).
    pub fn seed(&self, event: CalendarEvent) {
        let id = event.external_id.clone().expect("seeded events need an external_id");
        self.events.lock().unwrap().insert(id, event);
    }

    pub fn snapshot(&self) -> Vec<CalendarEvent> {
        let mut events: Vec<_> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| e.start);
        events
    }
}

#[async_trait]
impl CalendarClient for FakeCalendar {
    async fn list_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.start < end && e.end > start)
            .cloned()
            .collect())
    }

    async fn upsert(&self, mut event: CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        let id = match &event.external_id {
            Some(id) => id.clone(),
            None => {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                let id = format!("fake-{}", *next);
                event.external_id = Some(id.clone());
                id
            }
        };
        self.events.lock().unwrap().insert(id, event.clone());
        Ok(event)
    }

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        self.events.lock().unwrap().remove(external_id);
        Ok(())
    }
}

/// Scripted LM backend: each model name has its own queue of canned
/// results, consumed front-to-back. A model with an empty queue times out,
/// so the fallback chain advances exactly the way a real dead endpoint
/// would.
#[derive(Default)]
pub struct FakeLm {
    responses: Mutex<HashMap<String, VecDeque<Result<String, LmError>>>>,
}

impl FakeLm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, model: &str, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(Ok(body.into()));
    }

    pub fn push_timeout(&self, model: &str) {
        self.responses.lock().unwrap().entry(model.to_string()).or_default().push_back(Err(LmError::Timeout {
            model: model.to_string(),
            timeout_secs: 5,
        }));
    }
}

#[async_trait]
impl LmClient for FakeLm {
    async fn generate(&self, _prompt: &str, model: &str, _deadline: StdDuration) -> Result<String, LmError> {
        let mut guard = self.responses.lock().unwrap();
        guard.get_mut(model).and_then(VecDeque::pop_front).unwrap_or(Err(LmError::Timeout {
            model: model.to_string(),
            timeout_secs: 5,
        }))
    }
}

/// A well-formed two-option-plus-backup body, satisfying the parse
/// contract (spec.md §4.6 / Invariant 8).
pub fn well_formed_lm_body() -> String {
    "Option A: Easy effort\nKeep it conversational throughout.\n\n\
     Option B: Steady effort\n3x10min at tempo with 2min recovery.\n\n\
     Backup (low energy):\n15 minutes easy, stop if anything feels off."
        .to_string()
}

/// Deterministic, externally advanceable clock.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn goals_fixture(
    weekly: WeeklyStructure,
    preferred_workout_time: PreferredTime,
    protected_keywords: Vec<String>,
) -> Goals {
    Goals {
        weekly_structure: weekly,
        preferences: Preferences {
            preferred_workout_time,
            morning_hours: TimeWindow { start_hour: 6, end_hour: 9 },
            evening_hours: TimeWindow { start_hour: 17, end_hour: 20 },
            user_timezone: "UTC".into(),
        },
        protected_keywords,
        safety: SafetyLimits::default(),
        discipline_priority: Discipline::all().to_vec(),
    }
}

pub fn template_fixture(discipline: Discipline, target_duration_minutes: u32) -> WorkoutTemplate {
    use scheduler_core::models::IntensityTier;

    let mut variants = HashMap::new();
    variants.insert(
        IntensityTier::Normal,
        IntensityVariant {
            main_set: format!("{discipline} main set"),
            target_duration_minutes,
            hr_zone_low: 120,
            hr_zone_high: 150,
        },
    );
    variants.insert(
        IntensityTier::Reduced,
        IntensityVariant {
            main_set: format!("{discipline} reduced main set"),
            target_duration_minutes: target_duration_minutes.saturating_sub(10).max(15),
            hr_zone_low: 110,
            hr_zone_high: 135,
        },
    );
    variants.insert(
        IntensityTier::Backup,
        IntensityVariant {
            main_set: "easy recovery effort".to_string(),
            target_duration_minutes: 20,
            hr_zone_low: 100,
            hr_zone_high: 120,
        },
    );

    WorkoutTemplate {
        discipline,
        warmup: "5 minutes easy".to_string(),
        cooldown: "5 minutes easy".to_string(),
        variants,
    }
}

pub fn all_templates() -> HashMap<Discipline, WorkoutTemplate> {
    let mut map = HashMap::new();
    map.insert(Discipline::Strength, template_fixture(Discipline::Strength, 45));
    map.insert(Discipline::Run, template_fixture(Discipline::Run, 40));
    map.insert(Discipline::Bike, template_fixture(Discipline::Bike, 60));
    map.insert(Discipline::Swim, template_fixture(Discipline::Swim, 40));
    map
}

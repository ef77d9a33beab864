//! Weekly Budgeter (C5) — spec.md §4.4.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use super::conflict;
use crate::models::{Activity, CalendarEvent, Discipline, Goals};

/// A Monday-start, timezone-local week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Week {
    pub monday: NaiveDate,
}

impl Week {
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        let days_from_monday = date.weekday().num_days_from_monday();
        Self {
            monday: date - chrono::Duration::days(i64::from(days_from_monday)),
        }
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        let offset = (date - self.monday).num_days();
        (0..7).contains(&offset)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self {
            monday: self.monday + chrono::Duration::days(7),
        }
    }
}

/// For target week `week`, compute `remaining_d = max(0, goal_d - S_d - A_d)`
/// for every discipline (spec.md §4.4 steps 1–3).
///
/// `future_planner_events` must already be filtered to planner-owned
/// events whose `start` falls in `week`; `activities` to activities in
/// `week` that occurred before `now`. `tz` resolves which calendar day an
/// activity's UTC `timestamp` belongs to, keeping week membership
/// timezone-local (spec.md §4.4).
#[must_use]
pub fn remaining_by_discipline(
    goals: &Goals,
    week: Week,
    future_planner_events: &[CalendarEvent],
    activities: &[Activity],
    now: DateTime<Utc>,
    tz: Tz,
) -> HashMap<Discipline, u32> {
    let targets = goals.weekly_structure.as_map();
    let mut remaining = HashMap::new();

    for discipline in Discipline::all() {
        let goal = targets.get(&discipline).copied().unwrap_or(0);

        let scheduled = future_planner_events
            .iter()
            .filter(|e| e.is_planner_owned() && e.discipline_tag() == Some(discipline) && e.start > now)
            .count() as u32;

        let completed = activities
            .iter()
            .filter(|a| a.discipline == discipline && a.timestamp < now && week.contains(conflict::local_date(a.timestamp, tz)))
            .count() as u32;

        remaining.insert(discipline, goal.saturating_sub(scheduled).saturating_sub(completed));
    }

    remaining
}

/// Config-change reconciliation: planner-owned future events for a
/// discipline whose weekly target is now zero are purge candidates
/// (spec.md §4.4 step 5, Invariant 3).
#[must_use]
pub fn target_removed_candidates<'a>(goals: &Goals, future_planner_events: &'a [CalendarEvent]) -> Vec<&'a CalendarEvent> {
    let targets = goals.weekly_structure.as_map();
    future_planner_events
        .iter()
        .filter(|e| {
            e.is_planner_owned()
                && e.discipline_tag()
                    .is_some_and(|d| targets.get(&d).copied().unwrap_or(0) == 0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn goals_with(run: u32) -> Goals {
        use crate::models::{PreferredTime, Preferences, SafetyLimits, TimeWindow, WeeklyStructure};
        Goals {
            weekly_structure: WeeklyStructure {
                swim_sessions: 0,
                bike_sessions: 0,
                run_sessions: run,
                strength_sessions: 0,
            },
            preferences: Preferences {
                preferred_workout_time: PreferredTime::Morning,
                morning_hours: TimeWindow { start_hour: 6, end_hour: 9 },
                evening_hours: TimeWindow { start_hour: 17, end_hour: 20 },
                user_timezone: "UTC".into(),
            },
            protected_keywords: vec![],
            safety: SafetyLimits::default(),
            discipline_priority: Discipline::all().to_vec(),
        }
    }

    #[test]
    fn week_containing_monday_itself() {
        let monday = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        assert_eq!(Week::containing(monday).monday, monday);
    }

    #[test]
    fn remaining_subtracts_completed_and_scheduled() {
        let goals = goals_with(2);
        let week = Week::containing(NaiveDate::from_ymd_opt(2026, 7, 28).unwrap());
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();

        let activity = Activity {
            id: uuid::Uuid::new_v4(),
            timestamp: now - chrono::Duration::hours(2),
            discipline: Discipline::Run,
            duration_minutes: 30.0,
            distance_km: Some(5.0),
            avg_hr: None,
            training_load: 40.0,
            perceived_exertion: None,
            calories: None,
            raw_payload: serde_json::json!({}),
        };

        let remaining = remaining_by_discipline(&goals, week, &[], &[activity], now, chrono_tz::UTC);
        assert_eq!(remaining[&Discipline::Run], 1);
    }

    #[test]
    fn target_removed_when_goal_zero() {
        let goals = goals_with(0);
        let event = CalendarEvent::try_new(
            Some("e1".into()),
            "[AI Workout] run: easy".into(),
            "workout:run".into(),
            Utc::now(),
            Utc::now() + chrono::Duration::minutes(30),
            Default::default(),
            crate::models::EventOrigin::Planned,
        )
        .unwrap();

        let candidates = target_removed_candidates(&goals, std::slice::from_ref(&event));
        assert_eq!(candidates.len(), 1);
    }
}

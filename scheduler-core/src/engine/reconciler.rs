//! Reconciler (C8) — spec.md §4.7. Closes the loop between planned and
//! observed activity, and keeps future planner-owned events honest
//! against new conflicts and config changes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clients::{AuditStore, Clock};
use crate::errors::SchedulerError;
use crate::models::{ActionType, Activity, AuditAction, CalendarEvent, Goals, DONE_PREFIX, MISSED_PREFIX};

use super::calendar_view::CalendarView;
use super::conflict::{self, Interval};

/// Slack either side of `[E.start, E.end]` within which a completed
/// activity is considered a match for `E` (spec.md §4.7 step 1).
pub const PAST_MATCH_BEFORE: Duration = Duration::minutes(30);
pub const PAST_MATCH_AFTER: Duration = Duration::minutes(90);

pub enum PastOutcome {
    Completed { event: CalendarEvent, audit: AuditAction },
    Missed { event: CalendarEvent, audit: AuditAction },
}

pub enum FutureOutcome {
    Unchanged,
    Rescheduled { event: CalendarEvent, audit: AuditAction },
    Cancelled { audit: AuditAction },
}

pub struct Reconciler {
    calendar: Arc<CalendarView>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    #[must_use]
    pub fn new(calendar: Arc<CalendarView>, audit_store: Arc<dyn AuditStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            calendar,
            audit_store,
            clock,
        }
    }

    /// Reconcile one past planner-owned event (`event.end < now`) against
    /// the activities reported in its match window.
    pub async fn reconcile_past(
        &self,
        event: &CalendarEvent,
        activities: &[Activity],
    ) -> Result<PastOutcome, SchedulerError> {
        let now = self.clock.now();
        let discipline = event.discipline_tag();

        let window_start = event.start - PAST_MATCH_BEFORE;
        let window_end = event.end + PAST_MATCH_AFTER;

        let matches: Vec<&Activity> = activities
            .iter()
            .filter(|a| discipline == Some(a.discipline) && a.timestamp >= window_start && a.timestamp <= window_end)
            .collect();

        if matches.is_empty() {
            let mut updated = event.clone();
            updated.summary = format!("{MISSED_PREFIX} {}", strip_known_prefix(&updated.summary));
            let updated = self.calendar.upsert(updated).await?;

            let audit = AuditAction::new(
                now,
                "reconciler",
                ActionType::Missed,
                1.0,
                serde_json::to_value(event).ok(),
                serde_json::to_value(&updated).ok(),
                format!("no completed activity found in [{window_start}, {window_end}]"),
                vec!["health_store".into(), "calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            return Ok(PastOutcome::Missed { event: updated, audit });
        }

        let (best, multi_candidate) = if matches.len() == 1 {
            (matches[0], false)
        } else {
            let picked = matches
                .iter()
                .copied()
                .max_by(|a, b| overlap_amount(event, a).cmp(&overlap_amount(event, b)))
                .expect("non-empty");
            (picked, true)
        };

        let mut updated = event.clone();
        updated.summary = format!("{DONE_PREFIX} {}", strip_known_prefix(&updated.summary));
        updated.description = format!(
            "{}\n\nObserved: {:.1} min, {} km, avg HR {}",
            updated.description,
            best.duration_minutes,
            best.distance_km.map_or("n/a".to_string(), |d| format!("{d:.1}")),
            best.avg_hr.map_or("n/a".to_string(), |hr| format!("{hr:.0}")),
        );
        let updated = self.calendar.upsert(updated).await?;

        let reasoning = if multi_candidate {
            "multiple matching activities, picked greatest overlap (multi_candidate=true)".to_string()
        } else {
            "exactly one matching activity".to_string()
        };

        let audit = AuditAction::new(
            now,
            "reconciler",
            ActionType::MarkCompleted,
            if multi_candidate { 0.7 } else { 0.95 },
            serde_json::to_value(event).ok(),
            serde_json::to_value(&updated).ok(),
            reasoning,
            vec!["health_store".into(), "calendar".into()],
            true,
        );
        self.audit_store.append(audit.clone()).await?;
        Ok(PastOutcome::Completed { event: updated, audit })
    }

    /// Reconcile one future planner-owned event. `new_conflict` signals
    /// that a non-workout event now overlaps it (step 1); `target_removed`
    /// that its discipline's weekly goal is now zero (step 2, spec.md
    /// §4.4/§4.7). Protected events are returned as `Unchanged` regardless
    /// (spec.md §4.8 safety limit).
    #[allow(clippy::too_many_arguments)]
    pub async fn reconcile_future(
        &self,
        event: &CalendarEvent,
        goals: &Goals,
        new_conflict: bool,
        target_removed: bool,
        window: Interval,
        alternate_window: Option<Interval>,
        duration: Duration,
        busy: &[Interval],
    ) -> Result<FutureOutcome, SchedulerError> {
        let now = self.clock.now();

        if event.matches_protected_keyword(&goals.protected_keywords) {
            return Ok(FutureOutcome::Unchanged);
        }

        if target_removed {
            if let Some(external_id) = &event.external_id {
                self.calendar.delete(external_id).await?;
            }
            let audit = AuditAction::new(
                now,
                "reconciler",
                ActionType::Cancel,
                1.0,
                serde_json::to_value(event).ok(),
                None,
                "target_removed: discipline no longer in weekly structure".to_string(),
                vec!["goals".into(), "calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            return Ok(FutureOutcome::Cancelled { audit });
        }

        let min_notice = Duration::hours(i64::from(goals.safety.min_notice_hours));
        if event.start >= now + min_notice || !new_conflict {
            return Ok(FutureOutcome::Unchanged);
        }

        let other_busy: Vec<Interval> = busy.iter().copied().filter(|iv| *iv != (Interval { start: event.start, end: event.end })).collect();

        if let Some(new_start) = conflict::find_free_slot(window, alternate_window, duration, &other_busy) {
            let mut updated = event.clone();
            updated.start = new_start;
            updated.end = new_start + duration;
            let updated = self.calendar.upsert(updated).await?;

            let audit = AuditAction::new(
                now,
                "reconciler",
                ActionType::Reschedule,
                0.9,
                serde_json::to_value(event).ok(),
                serde_json::to_value(&updated).ok(),
                "new overlapping event inside min_notice window, rescheduled to next free slot".to_string(),
                vec!["calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            Ok(FutureOutcome::Rescheduled { event: updated, audit })
        } else {
            if let Some(external_id) = &event.external_id {
                self.calendar.delete(external_id).await?;
            }
            let audit = AuditAction::new(
                now,
                "reconciler",
                ActionType::Cancel,
                0.8,
                serde_json::to_value(event).ok(),
                None,
                "new overlapping event inside min_notice window, no free slot to reschedule into".to_string(),
                vec!["calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            Ok(FutureOutcome::Cancelled { audit })
        }
    }
}

fn strip_known_prefix(summary: &str) -> String {
    for prefix in [crate::models::PLANNED_PREFIX, DONE_PREFIX, MISSED_PREFIX] {
        if let Some(rest) = summary.strip_prefix(prefix) {
            return format!("{}{}", crate::models::PLANNED_PREFIX, rest);
        }
    }
    format!("{} {summary}", crate::models::PLANNED_PREFIX)
}

fn overlap_amount(event: &CalendarEvent, activity: &Activity) -> i64 {
    let activity_end = activity.timestamp + Duration::minutes(activity.duration_minutes as i64);
    let start = event.start.max(activity.timestamp);
    let end = event.end.min(activity_end);
    (end - start).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn activity_at(ts: DateTime<Utc>, discipline: crate::models::Discipline) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            timestamp: ts,
            discipline,
            duration_minutes: 30.0,
            distance_km: Some(5.0),
            avg_hr: Some(140.0),
            training_load: 40.0,
            perceived_exertion: None,
            calories: None,
            raw_payload: serde_json::json!({}),
        }
    }

    #[test]
    fn overlap_amount_is_zero_for_disjoint_intervals() {
        let event = CalendarEvent::try_new(
            None,
            "[AI Workout] run".into(),
            "workout:run".into(),
            Utc::now(),
            Utc::now() + Duration::minutes(30),
            Default::default(),
            crate::models::EventOrigin::Planned,
        )
        .unwrap();
        let activity = activity_at(event.end + Duration::hours(5), crate::models::Discipline::Run);
        assert_eq!(overlap_amount(&event, &activity), 0);
    }

    #[test]
    fn strip_known_prefix_normalizes_missed_back_to_planned() {
        assert_eq!(strip_known_prefix("[✗ Missed] run: easy"), "[AI Workout] run: easy");
    }
}

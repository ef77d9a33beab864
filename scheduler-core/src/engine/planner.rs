//! Planner (C6) — spec.md §4.5.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::clients::{AuditStore, Clock};
use crate::errors::SchedulerError;
use crate::models::{
    ActionType, AuditAction, CalendarEvent, Discipline, EventOrigin, Goals, IntensityTier, PlanRequest,
    PreferredTime, TimeWindow, WorkoutTemplate, PLANNED_PREFIX,
};

use super::calendar_view::CalendarView;
use super::conflict::{self, Interval};
use super::health_snapshot::{HealthSnapshot, RecoveryTier};
use super::llm_generator::LmContentGenerator;

/// Training-load ceiling above which intensity downshifts one tier
/// (spec.md §4.5 step 4). Named so it can be tuned without touching the
/// decision logic.
pub const TRAINING_LOAD_CEILING: f64 = 300.0;

/// Pure decision table mapping recovery tier + discipline + 48h load to
/// an intensity tier (spec.md §4.5 step 4 / §9 "model as a tagged variant
/// with a pure decision table").
#[must_use]
pub fn intensity_tier(recovery_tier: RecoveryTier, discipline: Discipline, training_load_48h: f64) -> IntensityTier {
    let base = match recovery_tier.effective() {
        RecoveryTier::Poor => IntensityTier::Reduced,
        RecoveryTier::Fair => match discipline {
            Discipline::Run | Discipline::Bike => IntensityTier::Reduced,
            Discipline::Strength | Discipline::Swim | Discipline::Other => IntensityTier::Normal,
        },
        RecoveryTier::Good | RecoveryTier::Excellent => IntensityTier::Normal,
        RecoveryTier::Unknown => unreachable!("effective() never returns Unknown"),
    };

    if training_load_48h > TRAINING_LOAD_CEILING {
        base.downshift()
    } else {
        base
    }
}

/// Choose the day's discipline: config-declared priority order decides
/// first; largest remaining only breaks a tie between disciplines that
/// share the same priority rank (the flat `Vec<Discipline>` priority list
/// this crate uses has no such ties today, but the tie-break stays in
/// place for a future weighted-priority representation). Disciplines with
/// zero remaining are skipped. Never repeats `last_discipline` unless
/// every other discipline with nonzero remaining is... zero (i.e. the
/// only nonzero remaining is `last_discipline` itself) — spec.md §4.5
/// step 3 recovery principle.
#[must_use]
pub fn choose_discipline(
    remaining: &HashMap<Discipline, u32>,
    priority: &[Discipline],
    last_discipline: Option<Discipline>,
) -> Option<Discipline> {
    let candidates: Vec<Discipline> = priority
        .iter()
        .copied()
        .filter(|d| remaining.get(d).copied().unwrap_or(0) > 0)
        .collect();

    if candidates.is_empty() {
        return None;
    }

    let best = candidates[0];
    if Some(best) == last_discipline && candidates.len() > 1 {
        return candidates.into_iter().find(|d| Some(*d) != last_discipline);
    }
    Some(best)
}

pub enum PlanOutcome {
    Created {
        event: CalendarEvent,
        audit: AuditAction,
    },
    SkippedTargetMet {
        audit: AuditAction,
    },
    SkippedNoSlot {
        audit: AuditAction,
    },
}

pub struct Planner {
    calendar: Arc<CalendarView>,
    llm: Arc<LmContentGenerator>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl Planner {
    #[must_use]
    pub fn new(
        calendar: Arc<CalendarView>,
        llm: Arc<LmContentGenerator>,
        audit_store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calendar,
            llm,
            audit_store,
            clock,
        }
    }

    /// Plan a single day. `remaining` and `last_discipline` are supplied
    /// by the orchestrator, which threads updated state across the
    /// horizon (spec.md §4.5). `execute` is false under `--dry-run`: the
    /// real decision still runs and is audited, but the calendar is never
    /// written to and the audit's `executed` flag is `false` (spec.md §6).
    #[allow(clippy::too_many_arguments)]
    pub async fn plan_day(
        &self,
        date: NaiveDate,
        goals: &Goals,
        templates: &HashMap<Discipline, WorkoutTemplate>,
        snapshot: &HealthSnapshot,
        remaining: &HashMap<Discipline, u32>,
        last_discipline: Option<Discipline>,
        busy_on_day: &[Interval],
        recent_activities_summary: &str,
        execute: bool,
    ) -> Result<PlanOutcome, SchedulerError> {
        let now = self.clock.now();

        let Some(discipline) = choose_discipline(remaining, &goals.discipline_priority, last_discipline) else {
            let audit = AuditAction::new(
                now,
                "planner",
                ActionType::SkipTargetMet,
                1.0,
                None,
                None,
                format!("all weekly targets met or zero for {date}"),
                vec!["goals".into(), "calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            return Ok(PlanOutcome::SkippedTargetMet { audit });
        };

        let tier = intensity_tier(snapshot.recovery_tier, discipline, snapshot.training_load_48h);

        let Some(template) = templates.get(&discipline).cloned() else {
            let audit = AuditAction::new(
                now,
                "planner",
                ActionType::SkipTargetMet,
                0.5,
                None,
                None,
                format!("no template configured for {discipline}"),
                vec!["templates".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            return Ok(PlanOutcome::SkippedTargetMet { audit });
        };

        let duration_minutes = template
            .variant(tier)
            .map_or(45, |v| v.target_duration_minutes);

        let tz = goals.timezone();
        let (preferred, alternate) = windows_for(goals, discipline);
        let preferred_interval = conflict::window_to_interval(date, preferred, tz);
        let alternate_interval = if matches!(goals.preferences.preferred_workout_time, PreferredTime::Flexible) {
            Some(conflict::window_to_interval(date, alternate, tz))
        } else {
            None
        };

        let slot = conflict::find_free_slot(
            preferred_interval,
            alternate_interval,
            chrono::Duration::minutes(i64::from(duration_minutes)),
            busy_on_day,
        );

        let Some(start) = slot else {
            let audit = AuditAction::new(
                now,
                "planner",
                ActionType::SkipTargetMet,
                1.0,
                None,
                None,
                format!("no_slot: no free window found for {discipline} on {date}"),
                vec!["calendar".into()],
                true,
            );
            self.audit_store.append(audit.clone()).await?;
            return Ok(PlanOutcome::SkippedNoSlot { audit });
        };

        let end = start + chrono::Duration::minutes(i64::from(duration_minutes));

        let window_used = if start >= preferred_interval.start && start < preferred_interval.end {
            preferred
        } else {
            alternate
        };

        let request = PlanRequest {
            date,
            discipline,
            intensity_tier: tier,
            preferred_window: window_used,
            recent_activities_summary: recent_activities_summary.to_string(),
            health_snapshot: crate::models::HealthSnapshotView {
                recovery_tier: format!("{:?}", snapshot.recovery_tier),
                recovery_score: snapshot.recovery_score,
                training_load_48h: snapshot.training_load_48h,
                sleep_quality_score: snapshot.latest_sample.as_ref().map(|s| s.sleep_quality_score),
                stress_level: snapshot.latest_sample.as_ref().map(|s| s.stress_level),
            },
            template,
        };

        let plan = self.llm.generate(&request).await;

        let mut tags = BTreeSet::new();
        tags.insert(format!("workout:{discipline}"));
        let summary = format!("{PLANNED_PREFIX} {discipline}: {}", plan.option_a.summary);
        let description = format!("workout:{discipline}\n\n{}", plan.render_description());

        let event = CalendarEvent::try_new(None, summary, description, start, end, tags, EventOrigin::Planned)
            .map_err(|_| SchedulerError::ConflictUnresolved {
                date,
                discipline: discipline.to_string(),
            })?;

        let created = if execute { self.calendar.upsert(event).await? } else { event };

        let mut sources = vec!["health_store".into(), "calendar".into(), "goals".into()];
        if plan.degraded {
            sources.push("template_fallback".into());
        }

        let model_label = plan.model_used.as_deref().unwrap_or("template_fallback");
        let audit = AuditAction::new(
            now,
            "planner",
            ActionType::Plan,
            if plan.degraded { 0.5 } else { 0.9 },
            None,
            serde_json::to_value(&created).ok(),
            format!(
                "planned {discipline} at {tier:?} intensity for {date}, model={model_label}{}",
                if plan.degraded { " (degraded: template fallback)" } else { "" }
            ),
            sources,
            execute,
        );
        self.audit_store.append(audit.clone()).await?;

        Ok(PlanOutcome::Created { event: created, audit })
    }
}

fn windows_for(goals: &Goals, _discipline: Discipline) -> (TimeWindow, TimeWindow) {
    let morning = goals.preferences.morning_hours;
    let evening = goals.preferences.evening_hours;
    match goals.preferences.preferred_workout_time {
        PreferredTime::Morning => (morning, evening),
        PreferredTime::Evening => (evening, morning),
        PreferredTime::Flexible => (morning, evening),
    }
}

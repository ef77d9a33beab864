//! Orchestrator (C9) — spec.md §4.8. Drives one cycle: reconcile the
//! trailing window, plan the forward horizon, enforce the safety limits,
//! and emit a cycle summary.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use crate::clients::{AuditStore, Clock, HealthStore};
use crate::errors::SchedulerError;
use crate::models::{ActionType, AuditAction, Discipline, Goals, WorkoutTemplate};

use super::budgeter::{self, Week};
use super::calendar_view::CalendarView;
use super::conflict::{self, Interval};
use super::health_snapshot::HealthSnapshot;
use super::planner::{PlanOutcome, Planner};
use super::reconciler::{FutureOutcome, PastOutcome, Reconciler};

/// Wall-clock and safety configuration for one cycle, independent of the
/// declarative `Goals`/template documents (spec.md §5 / §4.8).
#[derive(Debug, Clone, Copy)]
pub struct CycleConfig {
    pub plan_horizon_days: u32,
    pub reconcile_window_days: u32,
    pub cycle_deadline: Duration,
    pub dry_run: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            plan_horizon_days: 7,
            reconcile_window_days: 7,
            cycle_deadline: Duration::minutes(10),
            dry_run: false,
        }
    }
}

/// Per-cycle counters, surfaced as the single summary line spec.md §4.8
/// and §7 call for.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub skipped: u32,
    pub degraded: u32,
    pub buffered: u32,
    pub aborted: bool,
}

pub struct Orchestrator {
    calendar: Arc<CalendarView>,
    health_store: Arc<dyn HealthStore>,
    audit_store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    planner: Arc<Planner>,
    reconciler: Arc<Reconciler>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        calendar: Arc<CalendarView>,
        health_store: Arc<dyn HealthStore>,
        audit_store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        planner: Arc<Planner>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            calendar,
            health_store,
            audit_store,
            clock,
            planner,
            reconciler,
        }
    }

    /// Run one full cycle: reconcile (C8) over the trailing window, then
    /// plan (C6) over the forward horizon. Mutations beyond
    /// `goals.safety.max_mutations_per_cycle` are buffered into `plan`
    /// audit entries with `executed = false` rather than applied
    /// (spec.md §4.8 safety limit). `config.dry_run` suppresses
    /// reconcile mutations the same way the budget overflow does; the
    /// planning phase instead still runs its real decision logic and
    /// audits it with `executed = false` (spec.md §6 `plan --dry-run`).
    #[instrument(skip_all)]
    pub async fn run_cycle(
        &self,
        goals: &Goals,
        templates: &HashMap<Discipline, WorkoutTemplate>,
        config: CycleConfig,
    ) -> Result<CycleSummary, SchedulerError> {
        let started_at = self.clock.now();
        let deadline = started_at + config.cycle_deadline;
        let mut summary = CycleSummary::default();
        let mut budget = MutationBudget::new(goals.safety.max_mutations_per_cycle, config.dry_run);

        info!(horizon_days = config.plan_horizon_days, reconcile_days = config.reconcile_window_days, "cycle starting");

        if let Err(e) = self
            .run_reconcile_phase(goals, config, deadline, &mut budget, &mut summary)
            .await
        {
            if matches!(e, SchedulerError::DeadlineExceeded) {
                self.abort(started_at, &mut summary).await?;
                return Ok(summary);
            }
            return Err(e);
        }

        if self.clock.now() >= deadline {
            self.abort(started_at, &mut summary).await?;
            return Ok(summary);
        }

        if let Err(e) = self
            .run_plan_phase(goals, templates, config, deadline, &mut budget, &mut summary)
            .await
        {
            if matches!(e, SchedulerError::DeadlineExceeded) {
                self.abort(started_at, &mut summary).await?;
                return Ok(summary);
            }
            return Err(e);
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            skipped = summary.skipped,
            degraded = summary.degraded,
            buffered = summary.buffered,
            "cycle complete"
        );
        Ok(summary)
    }

    /// Run only the reconciliation phase (C8), for the `reconcile` CLI
    /// subcommand (spec.md §6).
    #[instrument(skip_all)]
    pub async fn run_reconcile_only(&self, goals: &Goals, config: CycleConfig) -> Result<CycleSummary, SchedulerError> {
        let started_at = self.clock.now();
        let deadline = started_at + config.cycle_deadline;
        let mut summary = CycleSummary::default();
        let mut budget = MutationBudget::new(goals.safety.max_mutations_per_cycle, config.dry_run);

        if let Err(e) = self.run_reconcile_phase(goals, config, deadline, &mut budget, &mut summary).await {
            if matches!(e, SchedulerError::DeadlineExceeded) {
                self.abort(started_at, &mut summary).await?;
                return Ok(summary);
            }
            return Err(e);
        }
        Ok(summary)
    }

    /// Run only the planning phase (C6), for the `plan` CLI subcommand
    /// (spec.md §6).
    #[instrument(skip_all)]
    pub async fn run_plan_only(
        &self,
        goals: &Goals,
        templates: &HashMap<Discipline, WorkoutTemplate>,
        config: CycleConfig,
    ) -> Result<CycleSummary, SchedulerError> {
        let started_at = self.clock.now();
        let deadline = started_at + config.cycle_deadline;
        let mut summary = CycleSummary::default();
        let mut budget = MutationBudget::new(goals.safety.max_mutations_per_cycle, config.dry_run);

        if let Err(e) = self
            .run_plan_phase(goals, templates, config, deadline, &mut budget, &mut summary)
            .await
        {
            if matches!(e, SchedulerError::DeadlineExceeded) {
                self.abort(started_at, &mut summary).await?;
                return Ok(summary);
            }
            return Err(e);
        }
        Ok(summary)
    }

    async fn abort(&self, now: DateTime<Utc>, summary: &mut CycleSummary) -> Result<(), SchedulerError> {
        warn!("cycle deadline exceeded, aborting remaining work");
        summary.aborted = true;
        let audit = AuditAction::new(
            now,
            "orchestrator",
            ActionType::CycleAborted,
            1.0,
            None,
            None,
            "cycle deadline exceeded".to_string(),
            vec!["clock".into()],
            false,
        );
        self.audit_store.append(audit).await?;
        Ok(())
    }

    async fn run_reconcile_phase(
        &self,
        goals: &Goals,
        config: CycleConfig,
        deadline: DateTime<Utc>,
        budget: &mut MutationBudget,
        summary: &mut CycleSummary,
    ) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        let tz = goals.timezone();
        let window_start = now - Duration::days(i64::from(config.reconcile_window_days));

        let events = self.calendar.list_range(window_start, now).await?;
        let activities = self
            .health_store
            .activities_in(window_start - Duration::hours(2), now + Duration::hours(2))
            .await?;

        for event in events.iter().filter(|e| e.is_planner_owned() && e.end < now) {
            if self.clock.now() >= deadline {
                return Err(SchedulerError::DeadlineExceeded);
            }
            if !budget.allow() {
                self.buffer(now, "reconcile skipped: max_mutations_per_cycle reached").await?;
                summary.buffered += 1;
                continue;
            }
            match self.reconciler.reconcile_past(event, &activities).await {
                Ok(PastOutcome::Completed { .. }) => summary.updated += 1,
                Ok(PastOutcome::Missed { .. }) => summary.updated += 1,
                Err(e) => warn!(error = %e, "skipping past event reconciliation"),
            }
        }

        let future_window_end = now + Duration::days(i64::from(config.plan_horizon_days));
        let future_events = self.calendar.list_range(now, future_window_end).await?;
        let non_planner_busy: Vec<Interval> = future_events
            .iter()
            .filter(|e| !e.is_planner_owned())
            .map(|e| Interval { start: e.start, end: e.end })
            .collect();

        let target_removed = budgeter::target_removed_candidates(
            goals,
            &future_events.iter().filter(|e| e.is_planner_owned()).cloned().collect::<Vec<_>>(),
        )
        .into_iter()
        .map(|e| e.slot_key_owned())
        .collect::<std::collections::HashSet<_>>();

        for event in future_events.iter().filter(|e| e.is_planner_owned()) {
            if self.clock.now() >= deadline {
                return Err(SchedulerError::DeadlineExceeded);
            }
            if !budget.allow() {
                self.buffer(now, "reconcile skipped: max_mutations_per_cycle reached").await?;
                summary.buffered += 1;
                continue;
            }

            let removed = target_removed.contains(&event.slot_key_owned());
            let new_conflict = non_planner_busy
                .iter()
                .any(|iv| conflict::overlap(event.start, event.end, iv.start, iv.end));

            let day = conflict::local_date(event.start, tz);
            let window = conflict::window_to_interval(day, goals.preferences.morning_hours, tz);
            let alternate = Some(conflict::window_to_interval(day, goals.preferences.evening_hours, tz));
            let duration = event.end - event.start;
            let busy_same_day: Vec<Interval> = future_events
                .iter()
                .filter(|e| conflict::local_date(e.start, tz) == day)
                .map(|e| Interval { start: e.start, end: e.end })
                .collect();

            match self
                .reconciler
                .reconcile_future(event, goals, new_conflict, removed, window, alternate, duration, &busy_same_day)
                .await
            {
                Ok(FutureOutcome::Unchanged) => {}
                Ok(FutureOutcome::Rescheduled { .. }) => summary.updated += 1,
                Ok(FutureOutcome::Cancelled { .. }) => summary.deleted += 1,
                Err(e) => warn!(error = %e, "skipping future event reconciliation"),
            }
        }

        Ok(())
    }

    async fn run_plan_phase(
        &self,
        goals: &Goals,
        templates: &HashMap<Discipline, WorkoutTemplate>,
        config: CycleConfig,
        deadline: DateTime<Utc>,
        budget: &mut MutationBudget,
        summary: &mut CycleSummary,
    ) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        let tz = goals.timezone();
        let horizon_end = now + Duration::days(i64::from(config.plan_horizon_days));

        let samples_7d = self.health_store.samples_in_range(now - Duration::days(7), now).await?;
        let activities_48h = self.health_store.activities_in(now - Duration::hours(48), now).await?;
        let snapshot = HealthSnapshot::compute(now, &samples_7d, &activities_48h);

        let events_in_horizon = self.calendar.list_range(now, horizon_end).await?;

        let mut last_discipline: Option<Discipline> = None;
        let mut current_week: Option<Week> = None;
        let mut remaining: HashMap<Discipline, u32> = HashMap::new();

        let mut date = conflict::local_date(now, tz);
        for _ in 0..config.plan_horizon_days {
            if self.clock.now() >= deadline {
                return Err(SchedulerError::DeadlineExceeded);
            }

            let week = Week::containing(date);
            if current_week != Some(week) {
                let week_start = conflict::local_hour_to_utc(week.monday, 0, tz);
                let week_activities_full = self.health_store.activities_in(week_start, now).await?;
                let week_planner_events: Vec<_> = events_in_horizon
                    .iter()
                    .filter(|e| e.is_planner_owned() && week.contains(conflict::local_date(e.start, tz)))
                    .cloned()
                    .collect();
                remaining =
                    budgeter::remaining_by_discipline(goals, week, &week_planner_events, &week_activities_full, now, tz);
                current_week = Some(week);
                last_discipline = None;
            }

            // Under dry-run the mutation budget never gates planning: the
            // real decision still runs, just with calendar writes
            // suppressed and the audit's `executed` flag set to false.
            if !config.dry_run && !budget.allow() {
                self.buffer(now, &format!("plan skipped for {date}: max_mutations_per_cycle reached")).await?;
                summary.buffered += 1;
                date = date.succ_opt().expect("date within supported range");
                continue;
            }

            let busy_on_day: Vec<Interval> = events_in_horizon
                .iter()
                .filter(|e| conflict::local_date(e.start, tz) == date)
                .map(|e| Interval { start: e.start, end: e.end })
                .collect();

            let recent_summary = format!("{} activities in the last 48h", activities_48h.len());

            match self
                .planner
                .plan_day(
                    date,
                    goals,
                    templates,
                    &snapshot,
                    &remaining,
                    last_discipline,
                    &busy_on_day,
                    &recent_summary,
                    !config.dry_run,
                )
                .await
            {
                Ok(PlanOutcome::Created { event, .. }) => {
                    summary.created += 1;
                    if let Some(d) = event.discipline_tag() {
                        last_discipline = Some(d);
                        if let Some(r) = remaining.get_mut(&d) {
                            *r = r.saturating_sub(1);
                        }
                    }
                }
                Ok(PlanOutcome::SkippedTargetMet { .. } | PlanOutcome::SkippedNoSlot { .. }) => {
                    summary.skipped += 1;
                }
                Err(e) => warn!(error = %e, %date, "skipping day"),
            }

            date = date.succ_opt().expect("date within supported range");
        }

        Ok(())
    }

    async fn buffer(&self, now: DateTime<Utc>, reason: &str) -> Result<(), SchedulerError> {
        let audit = AuditAction::new(
            now,
            "orchestrator",
            ActionType::Plan,
            1.0,
            None,
            None,
            reason.to_string(),
            vec!["safety_limits".into()],
            false,
        );
        self.audit_store.append(audit).await?;
        Ok(())
    }
}

/// Tracks the safety-limit mutation count. `dry_run` makes `allow()`
/// behave as if the limit were already exhausted, which is correct for
/// reconcile (its mutations have no dry-run-aware path yet); the plan
/// phase instead checks `config.dry_run` itself and skips calling
/// `allow()` so the real decision still runs (spec.md §6 `plan
/// --dry-run`: suppress writes, still emit audit entries with `executed =
/// false`).
struct MutationBudget {
    remaining: u32,
    dry_run: bool,
}

impl MutationBudget {
    fn new(max: u32, dry_run: bool) -> Self {
        Self { remaining: max, dry_run }
    }

    fn allow(&mut self) -> bool {
        if self.dry_run {
            return false;
        }
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

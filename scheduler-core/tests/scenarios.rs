//! End-to-end scenario tests driving the full `Orchestrator` against
//! in-memory collaborators (spec.md §8 scenarios S1-S6 plus a handful of
//! the cross-cutting invariants from the same section).

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use scheduler_core::clients::SqliteStore;
use scheduler_core::engine::{CalendarView, CycleConfig, LmContentGenerator, ModelSpec, Orchestrator, Planner, Reconciler};
use scheduler_core::models::{
    ActionType, Activity, CalendarEvent, Discipline, EventOrigin, HealthSample, PreferredTime, WeeklyStructure,
};

use common::{all_templates, goals_fixture, well_formed_lm_body, FakeCalendar, FakeClock, FakeLm};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 27).expect("valid date")
}

fn at(date: NaiveDate, hour: u32) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid hour"))
}

async fn build_stack(
    now: chrono::DateTime<Utc>,
    chain: Vec<ModelSpec>,
) -> (Orchestrator, Arc<FakeCalendar>, Arc<SqliteStore>, Arc<FakeClock>) {
    let calendar_client = Arc::new(FakeCalendar::new());
    let calendar_view = Arc::new(CalendarView::new(calendar_client.clone()));
    let store = Arc::new(SqliteStore::connect(":memory:").await.expect("in-memory sqlite connects"));
    let clock = Arc::new(FakeClock::new(now));

    let llm = Arc::new(LmContentGenerator::new(chain));
    let planner = Arc::new(Planner::new(calendar_view.clone(), llm, store.clone(), clock.clone()));
    let reconciler = Arc::new(Reconciler::new(calendar_view.clone(), store.clone(), clock.clone()));
    let orchestrator = Orchestrator::new(calendar_view, store.clone(), store.clone(), clock.clone(), planner, reconciler);

    (orchestrator, calendar_client, store, clock)
}

fn single_model_chain(lm: &Arc<FakeLm>, name: &str) -> Vec<ModelSpec> {
    vec![ModelSpec {
        name: name.to_string(),
        client: lm.clone(),
        timeout: StdDuration::from_secs(5),
    }]
}

async fn seed_good_recovery(store: &SqliteStore, reference: chrono::DateTime<Utc>) {
    let sample = HealthSample::try_new(reference - Duration::hours(6), "garmin", 7.8, 84.0, 52.0, 68.0, 18.0, 76.0, 9000, serde_json::json!({}))
        .expect("valid sample");
    store.upsert_sample(sample).await.expect("seed sample");
}

/// S1 — fresh user, empty calendar, recovery = good. Three created events,
/// one per day, starting with the discipline with the largest remaining
/// target, all in the morning window, each description carrying the full
/// parse contract.
#[tokio::test]
async fn s1_fresh_user_fills_the_horizon_in_the_morning_window() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    for _ in 0..3 {
        lm.push_ok("primary", well_formed_lm_body());
    }
    let (orchestrator, calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 2, strength_sessions: 3 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 3, reconcile_window_days: 7, ..CycleConfig::default() };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("cycle succeeds");

    assert_eq!(summary.created, 3);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.aborted);

    let events = calendar.snapshot();
    assert_eq!(events.len(), 3);
    for event in &events {
        assert!(event.is_planner_owned());
        let hour = chrono::Timelike::hour(&event.start);
        assert!((6..9).contains(&hour), "event should land in the morning window, got hour {hour}");
        assert!(event.description.contains("Option A"));
        assert!(event.description.contains("Option B"));
        assert!(event.description.contains("Backup"));
    }
    // strength has the largest weekly remaining and leads; the decision
    // table never repeats the prior day's discipline while an
    // alternative with nonzero remaining exists.
    let disciplines: Vec<_> = events.iter().filter_map(CalendarEvent::discipline_tag).collect();
    assert_eq!(disciplines, vec![Discipline::Strength, Discipline::Run, Discipline::Strength]);
}

/// S2 — morning blocked on day two, flexible policy: that day falls back
/// to the evening window while the other two stay in the morning.
#[tokio::test]
async fn s2_flexible_policy_falls_back_to_evening_when_morning_is_blocked() {
    let now = at(monday(), 4);
    let blocked_day = monday().succ_opt().expect("valid date");

    let lm = Arc::new(FakeLm::new());
    for _ in 0..3 {
        lm.push_ok("primary", well_formed_lm_body());
    }
    let (orchestrator, calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    calendar.seed(
        CalendarEvent::try_new(
            Some("ext-busy-morning".into()),
            "Team standup".into(),
            "".into(),
            at(blocked_day, 6),
            at(blocked_day, 9),
            Default::default(),
            EventOrigin::External,
        )
        .expect("valid event"),
    );

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 2, strength_sessions: 3 },
        PreferredTime::Flexible,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 3, reconcile_window_days: 7, ..CycleConfig::default() };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("cycle succeeds");
    assert_eq!(summary.created, 3);

    let planned: Vec<_> = calendar.snapshot().into_iter().filter(CalendarEvent::is_planner_owned).collect();
    assert_eq!(planned.len(), 3);
    for event in &planned {
        let hour = chrono::Timelike::hour(&event.start);
        if event.start.date_naive() == blocked_day {
            assert!((17..20).contains(&hour), "blocked day should fall back to the evening window");
        } else {
            assert!((6..9).contains(&hour), "unblocked days stay in the morning window");
        }
    }
}

/// S3 — primary model times out, secondary succeeds: the event is still
/// created normally and the audit trail names the model that actually
/// produced it, not marked degraded.
#[tokio::test]
async fn s3_lm_fallback_to_secondary_model_succeeds() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    lm.push_timeout("primary");
    lm.push_ok("secondary", well_formed_lm_body());

    let chain = vec![
        ModelSpec { name: "primary".into(), client: lm.clone(), timeout: StdDuration::from_secs(5) },
        ModelSpec { name: "secondary".into(), client: lm.clone(), timeout: StdDuration::from_secs(5) },
    ];
    let (orchestrator, calendar, store, _clock) = build_stack(now, chain).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 1, reconcile_window_days: 7, ..CycleConfig::default() };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("cycle succeeds");
    assert_eq!(summary.created, 1);
    assert_eq!(calendar.snapshot().len(), 1);

    let audits = store.recent(now - Duration::days(1)).await.expect("audit read");
    let plan_audit = audits
        .iter()
        .find(|a| matches!(a.action_type, ActionType::Plan))
        .expect("a plan audit entry exists");
    assert!(plan_audit.reasoning.contains("model=secondary"));
    assert!(!plan_audit.reasoning.contains("degraded"));
}

/// S4 — every configured model fails: the event is still created from
/// the template fallback, marked degraded, and still satisfies the parse
/// contract.
#[tokio::test]
async fn s4_all_models_failing_falls_back_to_template_and_is_marked_degraded() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    lm.push_timeout("primary");
    lm.push_timeout("secondary");

    let chain = vec![
        ModelSpec { name: "primary".into(), client: lm.clone(), timeout: StdDuration::from_secs(5) },
        ModelSpec { name: "secondary".into(), client: lm.clone(), timeout: StdDuration::from_secs(5) },
    ];
    let (orchestrator, calendar, store, _clock) = build_stack(now, chain).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 1, reconcile_window_days: 7, ..CycleConfig::default() };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("cycle succeeds");
    assert_eq!(summary.created, 1);

    let events = calendar.snapshot();
    assert_eq!(events.len(), 1);
    assert!(events[0].description.contains("Option A"));
    assert!(events[0].description.contains("Option B"));
    assert!(events[0].description.contains("Backup"));

    let audits = store.recent(now - Duration::days(1)).await.expect("audit read");
    let plan_audit = audits.iter().find(|a| matches!(a.action_type, ActionType::Plan)).expect("a plan audit entry exists");
    assert!(plan_audit.reasoning.contains("model=template_fallback"));
    assert!(plan_audit.reasoning.contains("degraded"));
    assert!((plan_audit.confidence - 0.5).abs() < f64::EPSILON);
}

/// S5 — weekly target already met by completed activities: no new event
/// is created, and every day in the horizon gets a `skip_target_met`
/// audit entry.
#[tokio::test]
async fn s5_target_already_met_produces_no_new_events() {
    let now = at(monday(), 12);
    let lm = Arc::new(FakeLm::new());
    let (orchestrator, calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    for offset_hours in [2, 4] {
        let activity = Activity {
            id: uuid::Uuid::new_v4(),
            timestamp: now - Duration::hours(offset_hours),
            discipline: Discipline::Run,
            duration_minutes: 35.0,
            distance_km: Some(6.0),
            avg_hr: Some(145.0),
            training_load: 50.0,
            perceived_exertion: None,
            calories: None,
            raw_payload: serde_json::json!({}),
        };
        store.upsert_activity(activity).await.expect("seed activity");
    }

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 2, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 3, reconcile_window_days: 7, ..CycleConfig::default() };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("cycle succeeds");
    assert_eq!(summary.created, 0);
    assert_eq!(summary.skipped, 3);
    assert!(calendar.snapshot().is_empty());

    let audits = store.recent(now - Duration::days(1)).await.expect("audit read");
    let skip_count = audits.iter().filter(|a| matches!(a.action_type, ActionType::SkipTargetMet)).count();
    assert_eq!(skip_count, 3);
}

/// S6 — a config change sets `swim_sessions = 0` after two future swim
/// events were already scheduled: the next cycle cancels both, and the
/// freed budget lets a newly-introduced `run` target fill in behind them.
#[tokio::test]
async fn s6_config_removing_a_discipline_purges_its_future_events() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    for _ in 0..3 {
        lm.push_ok("primary", well_formed_lm_body());
    }
    let (orchestrator, calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 2, reconcile_window_days: 7, ..CycleConfig::default() };

    let initial_goals = goals_fixture(
        WeeklyStructure { swim_sessions: 2, bike_sessions: 0, run_sessions: 0, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let first = orchestrator.run_cycle(&initial_goals, &templates, config).await.expect("first cycle succeeds");
    assert_eq!(first.created, 2);
    let swim_events_before = calendar.snapshot().into_iter().filter(|e| e.discipline_tag() == Some(Discipline::Swim)).count();
    assert_eq!(swim_events_before, 2);

    let updated_goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let second = orchestrator.run_cycle(&updated_goals, &templates, config).await.expect("second cycle succeeds");

    assert_eq!(second.deleted, 2, "both swim events should be cancelled as target_removed");
    let events_after = calendar.snapshot();
    assert!(events_after.iter().all(|e| e.discipline_tag() != Some(Discipline::Swim)));
    assert!(
        events_after.iter().any(|e| e.discipline_tag() == Some(Discipline::Run)),
        "the freed slot should be filled with the newly introduced run target"
    );

    let audits = store.recent(now - Duration::days(1)).await.expect("audit read");
    let cancel_count = audits
        .iter()
        .filter(|a| matches!(a.action_type, ActionType::Cancel) && a.reasoning.contains("target_removed"))
        .count();
    assert_eq!(cancel_count, 2);
}

/// Invariant 4 — idempotence: running an unchanged cycle twice produces
/// zero net calendar mutations on the second pass.
#[tokio::test]
async fn idempotent_cycle_produces_no_mutations_on_second_run() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    for _ in 0..3 {
        lm.push_ok("primary", well_formed_lm_body());
    }
    let (orchestrator, _calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 0, strength_sessions: 3 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 3, reconcile_window_days: 7, ..CycleConfig::default() };

    let first = orchestrator.run_cycle(&goals, &templates, config).await.expect("first cycle succeeds");
    assert_eq!(first.created, 3);

    let second = orchestrator.run_cycle(&goals, &templates, config).await.expect("second cycle succeeds");
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.skipped, 3);
}

/// Invariant 7 — deadline respect: a cycle whose deadline has already
/// elapsed before the plan phase starts aborts instead of continuing.
#[tokio::test]
async fn cycle_aborts_once_its_deadline_has_already_elapsed() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    let (orchestrator, _calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 1, reconcile_window_days: 7, cycle_deadline: Duration::seconds(-1), dry_run: false };

    let summary = orchestrator.run_cycle(&goals, &templates, config).await.expect("abort path is not an error");
    assert!(summary.aborted);
    assert_eq!(summary.created, 0);
}

/// Invariant 5 — protected events are never mutated, even under
/// conditions (a brand-new overlap inside the min-notice window) that
/// would otherwise force a reschedule or cancellation.
#[tokio::test]
async fn protected_events_are_never_touched_by_reconciliation() {
    let now = at(monday(), 4);
    let calendar_client = Arc::new(FakeCalendar::new());
    let calendar_view = Arc::new(CalendarView::new(calendar_client.clone()));
    let store = Arc::new(SqliteStore::connect(":memory:").await.expect("in-memory sqlite connects"));
    let clock = Arc::new(FakeClock::new(now));
    let reconciler = Reconciler::new(calendar_view.clone(), store.clone(), clock.clone());

    // One hour from "now" — inside the default two-hour min_notice window,
    // so a normal (unprotected) event here would be rescheduled or
    // cancelled once a conflict appears.
    let event_start = now + Duration::hours(1);
    let event_end = event_start + Duration::minutes(30);
    let mut tags = std::collections::BTreeSet::new();
    tags.insert("workout:run".to_string());
    let protected_event = CalendarEvent::try_new(
        Some("ext-protected".into()),
        "[AI Workout] Doctor appointment run".into(),
        "workout:run".into(),
        event_start,
        event_end,
        tags,
        EventOrigin::Planned,
    )
    .expect("valid event");

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec!["doctor".to_string()],
    );

    let window =
        scheduler_core::engine::conflict::window_to_interval(monday(), goals.preferences.morning_hours, chrono_tz::UTC);
    let outcome = reconciler
        .reconcile_future(
            &protected_event,
            &goals,
            true,  // new_conflict: an overlapping event just appeared
            false, // target_removed
            window,
            None,
            event_end - event_start,
            &[],
        )
        .await
        .expect("reconcile_future succeeds");

    assert!(matches!(outcome, scheduler_core::engine::FutureOutcome::Unchanged));
    assert!(calendar_client.snapshot().is_empty(), "a protected event must never reach calendar.upsert/delete");
}

/// `plan --dry-run` still runs the real planning decision and audits it
/// with `executed = false`, instead of skipping the day outright
/// (spec.md §6).
#[tokio::test]
async fn dry_run_plans_the_real_decision_but_suppresses_calendar_writes() {
    let now = at(monday(), 4);
    let lm = Arc::new(FakeLm::new());
    lm.push_ok("primary", well_formed_lm_body());
    let (orchestrator, calendar, store, _clock) = build_stack(now, single_model_chain(&lm, "primary")).await;
    seed_good_recovery(&store, now).await;

    let goals = goals_fixture(
        WeeklyStructure { swim_sessions: 0, bike_sessions: 0, run_sessions: 1, strength_sessions: 0 },
        PreferredTime::Morning,
        vec![],
    );
    let templates = all_templates();
    let config = CycleConfig { plan_horizon_days: 1, reconcile_window_days: 7, dry_run: true, ..CycleConfig::default() };

    let summary = orchestrator.run_plan_only(&goals, &templates, config).await.expect("cycle succeeds");
    assert_eq!(summary.created, 1);
    assert!(calendar.snapshot().is_empty(), "dry-run must never write to the calendar");

    let audits = store.recent(now - Duration::days(1)).await.expect("audit read");
    let plan_audit = audits.iter().find(|a| matches!(a.action_type, ActionType::Plan)).expect("a plan audit entry exists");
    assert!(!plan_audit.executed, "dry-run plan decisions must be audited with executed = false");
    assert!(
        !plan_audit.reasoning.contains("max_mutations_per_cycle"),
        "dry-run must not be reported as a budget-exhaustion skip: {}",
        plan_audit.reasoning
    );
}

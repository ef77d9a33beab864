use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{ActionType, Activity, AuditAction, Discipline, HealthSample};

use super::{AuditStore, HealthStore};

/// SQLite-backed reference implementation of [`HealthStore`] and
/// [`AuditStore`], plus the advisory-lock table backing the single-flight
/// guarantee of spec.md §5. Grounded on the teacher's `sqlx`-via-pool
/// pattern (`config/database.rs`), adapted from Postgres to SQLite because
/// this is a single-tenant background job rather than a multi-tenant API
/// server — see DESIGN.md for the substitution rationale.
///
/// Uses the runtime `sqlx::query`/`query_as` API rather than the
/// compile-time-checked `query!` macros, since those require a live,
/// migrated database reachable at build time.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS health_samples (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    source TEXT NOT NULL,
    sleep_duration_hours REAL NOT NULL,
    sleep_quality_score REAL NOT NULL,
    resting_hr REAL NOT NULL,
    hrv_score REAL NOT NULL,
    stress_level REAL NOT NULL,
    recovery_score REAL NOT NULL,
    steps INTEGER NOT NULL,
    raw_payload TEXT NOT NULL,
    UNIQUE(timestamp, source)
);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    discipline TEXT NOT NULL,
    duration_minutes REAL NOT NULL,
    distance_km REAL,
    avg_hr REAL,
    training_load REAL NOT NULL,
    perceived_exertion INTEGER,
    calories REAL,
    raw_payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_actions (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    agent TEXT NOT NULL,
    action_type TEXT NOT NULL,
    confidence REAL NOT NULL,
    before_state TEXT,
    after_state TEXT,
    reasoning TEXT NOT NULL,
    data_sources TEXT NOT NULL,
    executed INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS process_lock (
    config_path TEXT PRIMARY KEY,
    locked_at TEXT NOT NULL
);
"#;

impl SqliteStore {
    /// Opens (creating if absent) the SQLite file at `path` and applies
    /// the schema above. `path` may be `:memory:` for tests.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Attempts to take the single-flight advisory lock for `config_path`.
    /// Returns `true` if the lock was acquired, `false` if another cycle
    /// already holds it (spec.md §5.1).
    pub async fn try_acquire_lock(&self, config_path: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO process_lock (config_path, locked_at) VALUES (?, ?)")
            .bind(config_path)
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
            Err(e) => Err(StoreError::Sqlx(e)),
        }
    }

    pub async fn release_lock(&self, config_path: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM process_lock WHERE config_path = ?")
            .bind(config_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn discipline_from_str(s: &str) -> Discipline {
    match s {
        "run" => Discipline::Run,
        "bike" => Discipline::Bike,
        "swim" => Discipline::Swim,
        "strength" => Discipline::Strength,
        _ => Discipline::Other,
    }
}

#[async_trait]
impl HealthStore for SqliteStore {
    async fn latest_before(&self, cutoff: DateTime<Utc>) -> Result<Option<HealthSample>, StoreError> {
        let row = sqlx::query(
            "SELECT id, timestamp, source, sleep_duration_hours, sleep_quality_score, resting_hr, \
             hrv_score, stress_level, recovery_score, steps, raw_payload FROM health_samples \
             WHERE timestamp < ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_sample(&r)).transpose()
    }

    async fn samples_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HealthSample>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, source, sleep_duration_hours, sleep_quality_score, resting_hr, \
             hrv_score, stress_level, recovery_score, steps, raw_payload FROM health_samples \
             WHERE timestamp >= ? AND timestamp < ? ORDER BY timestamp ASC",
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_sample).collect()
    }

    async fn activities_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, discipline, duration_minutes, distance_km, avg_hr, training_load, \
             perceived_exertion, calories, raw_payload FROM activities \
             WHERE timestamp >= ? AND timestamp < ? ORDER BY timestamp ASC",
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_activity).collect()
    }

    async fn upsert_sample(&self, sample: HealthSample) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO health_samples (id, timestamp, source, sleep_duration_hours, sleep_quality_score, \
             resting_hr, hrv_score, stress_level, recovery_score, steps, raw_payload) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sample.id.to_string())
        .bind(sample.timestamp.to_rfc3339())
        .bind(&sample.source)
        .bind(sample.sleep_duration_hours)
        .bind(sample.sleep_quality_score)
        .bind(sample.resting_hr)
        .bind(sample.hrv_score)
        .bind(sample.stress_level)
        .bind(sample.recovery_score)
        .bind(sample.steps)
        .bind(sample.raw_payload.to_string())
        .execute(&self.pool)
        .await;

        absorb_unique_violation(result)
    }

    async fn upsert_activity(&self, activity: Activity) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO activities (id, timestamp, discipline, duration_minutes, distance_km, avg_hr, \
             training_load, perceived_exertion, calories, raw_payload) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(activity.id.to_string())
        .bind(activity.timestamp.to_rfc3339())
        .bind(activity.discipline.as_tag())
        .bind(activity.duration_minutes)
        .bind(activity.distance_km)
        .bind(activity.avg_hr)
        .bind(activity.training_load)
        .bind(activity.perceived_exertion)
        .bind(activity.calories)
        .bind(activity.raw_payload.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn absorb_unique_violation(result: Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(StoreError::Duplicate(db_err.to_string()))
        }
        Err(e) => Err(StoreError::Sqlx(e)),
    }
}

fn row_to_sample(row: &sqlx::sqlite::SqliteRow) -> Result<HealthSample, StoreError> {
    let id: String = row.try_get("id")?;
    let timestamp: String = row.try_get("timestamp")?;
    let raw_payload: String = row.try_get("raw_payload")?;
    Ok(HealthSample {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        source: row.try_get("source")?,
        sleep_duration_hours: row.try_get("sleep_duration_hours")?,
        sleep_quality_score: row.try_get("sleep_quality_score")?,
        resting_hr: row.try_get("resting_hr")?,
        hrv_score: row.try_get("hrv_score")?,
        stress_level: row.try_get("stress_level")?,
        recovery_score: row.try_get("recovery_score")?,
        steps: row.try_get("steps")?,
        raw_payload: serde_json::from_str(&raw_payload).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<Activity, StoreError> {
    let id: String = row.try_get("id")?;
    let timestamp: String = row.try_get("timestamp")?;
    let discipline: String = row.try_get("discipline")?;
    let raw_payload: String = row.try_get("raw_payload")?;
    Ok(Activity {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        discipline: discipline_from_str(&discipline),
        duration_minutes: row.try_get("duration_minutes")?,
        distance_km: row.try_get("distance_km")?,
        avg_hr: row.try_get("avg_hr")?,
        training_load: row.try_get("training_load")?,
        perceived_exertion: row.try_get("perceived_exertion")?,
        calories: row.try_get("calories")?,
        raw_payload: serde_json::from_str(&raw_payload).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_audit(row: &sqlx::sqlite::SqliteRow) -> Result<AuditAction, StoreError> {
    let id: String = row.try_get("id")?;
    let timestamp: String = row.try_get("timestamp")?;
    let action_type: String = row.try_get("action_type")?;
    let before_state: Option<String> = row.try_get("before_state")?;
    let after_state: Option<String> = row.try_get("after_state")?;
    let data_sources: String = row.try_get("data_sources")?;
    let executed: i64 = row.try_get("executed")?;

    Ok(AuditAction {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        agent: row.try_get("agent")?,
        action_type: action_type_from_str(&action_type),
        confidence: row.try_get("confidence")?,
        before_state: before_state.and_then(|s| serde_json::from_str(&s).ok()),
        after_state: after_state.and_then(|s| serde_json::from_str(&s).ok()),
        reasoning: row.try_get("reasoning")?,
        data_sources: serde_json::from_str(&data_sources).unwrap_or_default(),
        executed: executed != 0,
    })
}

fn action_type_from_str(s: &str) -> ActionType {
    match s {
        "plan" => ActionType::Plan,
        "reschedule" => ActionType::Reschedule,
        "cancel" => ActionType::Cancel,
        "mark_completed" => ActionType::MarkCompleted,
        "missed" => ActionType::Missed,
        "skip_duplicate" => ActionType::SkipDuplicate,
        "skip_target_met" => ActionType::SkipTargetMet,
        "cycle_aborted" => ActionType::CycleAborted,
        _ => ActionType::PermissionDenied,
    }
}

fn action_type_as_str(a: ActionType) -> &'static str {
    match a {
        ActionType::Plan => "plan",
        ActionType::Reschedule => "reschedule",
        ActionType::Cancel => "cancel",
        ActionType::MarkCompleted => "mark_completed",
        ActionType::Missed => "missed",
        ActionType::SkipDuplicate => "skip_duplicate",
        ActionType::SkipTargetMet => "skip_target_met",
        ActionType::CycleAborted => "cycle_aborted",
        ActionType::PermissionDenied => "permission_denied",
    }
}

#[async_trait]
impl AuditStore for SqliteStore {
    async fn append(&self, action: AuditAction) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_actions (id, timestamp, agent, action_type, confidence, before_state, \
             after_state, reasoning, data_sources, executed) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(action.id.to_string())
        .bind(action.timestamp.to_rfc3339())
        .bind(&action.agent)
        .bind(action_type_as_str(action.action_type))
        .bind(action.confidence)
        .bind(action.before_state.as_ref().map(std::string::ToString::to_string))
        .bind(action.after_state.as_ref().map(std::string::ToString::to_string))
        .bind(&action.reasoning)
        .bind(serde_json::to_string(&action.data_sources).unwrap_or_default())
        .bind(action.executed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, since: DateTime<Utc>) -> Result<Vec<AuditAction>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, agent, action_type, confidence, before_state, after_state, reasoning, \
             data_sources, executed FROM audit_actions WHERE timestamp >= ? ORDER BY timestamp ASC",
        )
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_audit).collect()
    }
}

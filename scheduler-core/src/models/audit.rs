use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of every planner/reconciler decision (spec.md §3).
///
/// Not derived as an `sqlx::FromRow`: `data_sources` has no native SQLite
/// column type, so the SQLite-backed `AuditStore` maps rows by hand (see
/// `clients::sqlite_store`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditAction {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub action_type: ActionType,
    pub confidence: f64,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub reasoning: String,
    pub data_sources: Vec<String>,
    pub executed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Plan,
    Reschedule,
    Cancel,
    MarkCompleted,
    Missed,
    SkipDuplicate,
    SkipTargetMet,
    CycleAborted,
    PermissionDenied,
}

impl AuditAction {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        now: DateTime<Utc>,
        agent: impl Into<String>,
        action_type: ActionType,
        confidence: f64,
        before_state: Option<serde_json::Value>,
        after_state: Option<serde_json::Value>,
        reasoning: impl Into<String>,
        data_sources: Vec<String>,
        executed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            agent: agent.into(),
            action_type,
            confidence,
            before_state,
            after_state,
            reasoning: reasoning.into(),
            data_sources,
            executed,
        }
    }
}

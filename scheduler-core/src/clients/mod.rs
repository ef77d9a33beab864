//! Collaborator traits. The core never branches on a concrete
//! implementation — every external system is reached through one of
//! these, per the teacher's "duck-typed tool calls become explicit
//! capability sets" re-architecture note (spec.md §9).

mod clock;
mod http_calendar;
mod http_lm;
mod sqlite_store;

pub use clock::{Clock, SystemClock};
pub use http_calendar::HttpCalendarClient;
pub use http_lm::HttpLmClient;
pub use sqlite_store::SqliteStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{CalendarError, LmError, StoreError};
use crate::models::{Activity, AuditAction, CalendarEvent, HealthSample};

/// Supports `List` / `Upsert` / `Delete` on the remote calendar
/// (spec.md §4.2).
#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn list_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Creates or updates, identified by `external_id` when known,
    /// returning the event with its (possibly newly assigned)
    /// `external_id` populated.
    async fn upsert(&self, event: CalendarEvent) -> Result<CalendarEvent, CalendarError>;

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError>;
}

/// Invokes a language model with a prompt and a per-call deadline
/// (spec.md §4.6).
#[async_trait]
pub trait LmClient: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str, deadline: Duration) -> Result<String, LmError>;
}

/// Read access to health samples and activities (spec.md §4.1 / §6).
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn latest_before(&self, cutoff: DateTime<Utc>) -> Result<Option<HealthSample>, StoreError>;

    async fn samples_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HealthSample>, StoreError>;

    async fn activities_in(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError>;

    /// Idempotent upsert keyed by `(timestamp, source)` for samples, and
    /// by wearable-assigned identity for activities. A duplicate key
    /// surfaces as `StoreError::Duplicate`, which callers are expected to
    /// treat as an idempotent no-op and audit as `skip_duplicate` rather
    /// than a failure (spec.md §7 `IntegrityError`).
    async fn upsert_sample(&self, sample: HealthSample) -> Result<(), StoreError>;

    async fn upsert_activity(&self, activity: Activity) -> Result<(), StoreError>;
}

/// Append-only audit log (spec.md §3 / §6).
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, action: AuditAction) -> Result<(), StoreError>;

    async fn recent(&self, since: DateTime<Utc>) -> Result<Vec<AuditAction>, StoreError>;
}

//! Calendar View (C3) — spec.md §4.2. Wraps a `dyn CalendarClient`,
//! owning the retry/backoff policy and the planner-owned tag convention.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::clients::CalendarClient;
use crate::errors::CalendarError;
use crate::models::{CalendarEvent, PLANNED_PREFIX};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: StdDuration = StdDuration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;
const JITTER_FRACTION: f64 = 0.20;

pub struct CalendarView {
    client: Arc<dyn CalendarClient>,
}

impl CalendarView {
    #[must_use]
    pub fn new(client: Arc<dyn CalendarClient>) -> Self {
        Self { client }
    }

    /// Lists events in `[start, end)`, ascending by start. May span up to
    /// 90 days per spec.md §4.2.
    pub async fn list_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = self
            .with_retry(|| {
                let client = self.client.clone();
                Box::pin(async move { client.list_range(start, end).await })
            })
            .await?;
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    pub async fn upsert(&self, event: CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        self.with_retry(|| {
            let client = self.client.clone();
            let event = event.clone();
            Box::pin(async move { client.upsert(event).await })
        })
        .await
    }

    pub async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        let external_id = external_id.to_string();
        self.with_retry(|| {
            let client = self.client.clone();
            let external_id = external_id.clone();
            Box::pin(async move { client.delete(&external_id).await })
        })
        .await
    }

    /// Retries `Transient` failures up to `MAX_ATTEMPTS` with exponential
    /// backoff and ±20% jitter; every other classification surfaces
    /// immediately (spec.md §4.2 Failure policy).
    async fn with_retry<T, F>(&self, mut call: F) -> Result<T, CalendarError>
    where
        F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, CalendarError>> + Send>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if matches!(e, CalendarError::Transient(_)) && attempt < MAX_ATTEMPTS => {
                    let backoff = BASE_BACKOFF * BACKOFF_FACTOR.pow(attempt - 1);
                    tokio::time::sleep(jittered(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn jittered(base: StdDuration) -> StdDuration {
    let mut rng = rand::thread_rng();
    let jitter: f64 = rng.gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
    let millis = base.as_millis() as f64 * (1.0 + jitter);
    StdDuration::from_millis(millis.max(0.0) as u64)
}

/// Resolve the stable upsert key for a planner-owned slot when no
/// `external_id` is yet known (spec.md §4.2 Upsert()).
#[must_use]
pub fn slot_key(date: chrono::NaiveDate, discipline: crate::models::Discipline) -> String {
    CalendarEvent::slot_key(date, discipline)
}

#[must_use]
pub fn is_planner_owned_summary(summary: &str) -> bool {
    summary.starts_with(PLANNED_PREFIX)
}

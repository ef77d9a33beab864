use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};

use crate::errors::CalendarError;
use crate::models::CalendarEvent;

use super::CalendarClient;

/// Thin reference implementation of [`CalendarClient`] against a generic
/// REST calendar API (list/create/update/delete over JSON). The real
/// wearable-facing calendar product is an out-of-scope collaborator per
/// spec.md §1 — this exists so the crate runs end to end against any
/// backend exposing the same small surface.
pub struct HttpCalendarClient {
    base_url: String,
    client: Client,
}

impl HttpCalendarClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn classify(status: StatusCode, body: String) -> CalendarError {
        match status.as_u16() {
            401 | 403 => CalendarError::Permission(body),
            404 => CalendarError::NotFound(body),
            408 | 425 | 429 | 500..=599 => CalendarError::Transient(body),
            _ => CalendarError::Permanent(body),
        }
    }
}

#[async_trait]
impl CalendarClient for HttpCalendarClient {
    async fn list_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let resp = self
            .client
            .get(format!("{}/events", self.base_url))
            .query(&[("start", start.to_rfc3339()), ("end", end.to_rfc3339())])
            .send()
            .await
            .map_err(|e| CalendarError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify(status, body));
        }

        resp.json::<Vec<CalendarEvent>>()
            .await
            .map_err(|e| CalendarError::Permanent(e.to_string()))
    }

    async fn upsert(&self, event: CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        let resp = self
            .client
            .post(format!("{}/events", self.base_url))
            .json(&event)
            .send()
            .await
            .map_err(|e| CalendarError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify(status, body));
        }

        resp.json::<CalendarEvent>()
            .await
            .map_err(|e| CalendarError::Permanent(e.to_string()))
    }

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        let resp = self
            .client
            .delete(format!("{}/events/{}", self.base_url, external_id))
            .send()
            .await
            .map_err(|e| CalendarError::Transient(e.to_string()))?;

        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify(status, body));
        }
        Ok(())
    }
}

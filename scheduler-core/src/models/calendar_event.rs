use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::Discipline;
use super::validate::ValidationError;

/// An entry in the remote calendar.
///
/// `origin = Planned` events are exclusively owned by the planner; the
/// reconciler and planner never mutate an `External` event (SPEC_FULL.md
/// §3 ownership rule, tested as Invariant 5 / "protected events untouched"
/// for the stronger keyword case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub external_id: Option<String>,
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tags: BTreeSet<String>,
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Planned,
    External,
}

/// Prefix every planner-owned event's summary carries. Resolves the Open
/// Question in spec.md §9: summary-prefix, not a hidden extended property.
pub const PLANNED_PREFIX: &str = "[AI Workout]";
pub const DONE_PREFIX: &str = "[\u{2713} Done]";
pub const MISSED_PREFIX: &str = "[\u{2717} Missed]";

impl CalendarEvent {
    pub fn try_new(
        external_id: Option<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tags: BTreeSet<String>,
        origin: EventOrigin,
    ) -> Result<Self, ValidationError> {
        let start = start;
        let end = end;
        if end <= start {
            return Err(ValidationError {
                field: "end",
                min: 0,
                max: i64::MAX,
                value: (end - start).num_seconds(),
            });
        }
        Ok(Self {
            external_id,
            summary: summary.into(),
            description: description.into(),
            start,
            end,
            tags,
            origin,
        })
    }

    /// Whether this event carries the planner's summary prefix — the sole
    /// round-trip identification mechanism (spec.md §4.2 Tag()).
    #[must_use]
    pub fn is_planner_owned(&self) -> bool {
        matches!(self.origin, EventOrigin::Planned) && self.summary.starts_with(PLANNED_PREFIX)
    }

    /// Discipline tag embedded in the description as `workout:<discipline>`,
    /// if present.
    #[must_use]
    pub fn discipline_tag(&self) -> Option<Discipline> {
        self.description.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("workout:")?;
            match rest.trim() {
                "run" => Some(Discipline::Run),
                "bike" => Some(Discipline::Bike),
                "swim" => Some(Discipline::Swim),
                "strength" => Some(Discipline::Strength),
                "other" => Some(Discipline::Other),
                _ => None,
            }
        })
    }

    /// Whether this event's summary or tags match any configured
    /// protected keyword (spec.md §4.8 safety limit). Case-insensitive
    /// substring match, same as a human would eyeball a calendar.
    #[must_use]
    pub fn matches_protected_keyword(&self, keywords: &[String]) -> bool {
        let summary_lower = self.summary.to_lowercase();
        keywords.iter().any(|kw| {
            let kw_lower = kw.to_lowercase();
            summary_lower.contains(&kw_lower) || self.tags.iter().any(|t| t.to_lowercase().contains(&kw_lower))
        })
    }

    /// Stable key used to find an existing planned event for a slot before
    /// an `external_id` is known (spec.md §4.2 Upsert()).
    #[must_use]
    pub fn slot_key(date: chrono::NaiveDate, discipline: Discipline) -> String {
        format!("{date}:{discipline}")
    }

    /// This event's own slot key, derived from its start date and embedded
    /// discipline tag. Untagged events get a key that never collides with
    /// a real `(date, discipline)` pair.
    #[must_use]
    pub fn slot_key_owned(&self) -> String {
        self.discipline_tag()
            .map_or_else(|| format!("{}:untagged", self.start.date_naive()), |d| Self::slot_key(self.start.date_naive(), d))
    }
}

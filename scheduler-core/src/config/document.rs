//! Loads the declarative goals/template TOML document (spec.md §6).
//!
//! Parsed twice into two narrow structs rather than one `#[serde(flatten)]`
//! struct: `Goals` ignores the `[templates.*]` tables it doesn't recognize,
//! and `TemplatesDocument` ignores everything except `[templates.*]` —
//! both rely on serde's default "ignore unknown fields" behavior, which is
//! also what spec.md §6 requires for the goals document itself.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::models::{Discipline, Goals, IntensityTier, IntensityVariant, WorkoutTemplate};

#[derive(Debug, Deserialize)]
struct TemplatesDocument {
    #[serde(default)]
    templates: HashMap<Discipline, RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    warmup: String,
    cooldown: String,
    #[serde(default)]
    variants: HashMap<IntensityTier, IntensityVariant>,
}

/// Load `Goals` and the per-discipline `WorkoutTemplate` map from the TOML
/// file at `path`.
pub fn load(path: &Path) -> Result<(Goals, HashMap<Discipline, WorkoutTemplate>), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_str(&text)
}

/// As [`load`], but from an in-memory document (used by tests and by
/// callers that have already fetched the config from elsewhere).
pub fn load_str(text: &str) -> Result<(Goals, HashMap<Discipline, WorkoutTemplate>), ConfigError> {
    let goals: Goals = toml::from_str(text)?;
    validate_goals(&goals)?;

    let templates_doc: TemplatesDocument = toml::from_str(text)?;
    let templates = templates_doc
        .templates
        .into_iter()
        .map(|(discipline, raw)| {
            (
                discipline,
                WorkoutTemplate {
                    discipline,
                    warmup: raw.warmup,
                    cooldown: raw.cooldown,
                    variants: raw.variants,
                },
            )
        })
        .collect();

    Ok((goals, templates))
}

/// Validation beyond what serde's type-directed deserialization already
/// enforces: window ordering (spec.md §6 `0 ≤ H_start < H_end ≤ 24`) and a
/// recognizable IANA timezone.
fn validate_goals(goals: &Goals) -> Result<(), ConfigError> {
    if !goals.preferences.morning_hours.is_valid() {
        return Err(ConfigError::InvalidValue {
            field: "preferences.morning_hours",
            reason: "expected 0 <= start_hour < end_hour <= 24".to_string(),
        });
    }
    if !goals.preferences.evening_hours.is_valid() {
        return Err(ConfigError::InvalidValue {
            field: "preferences.evening_hours",
            reason: "expected 0 <= start_hour < end_hour <= 24".to_string(),
        });
    }
    if goals.preferences.user_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(ConfigError::InvalidValue {
            field: "preferences.user_timezone",
            reason: format!("not a recognized IANA timezone: {}", goals.preferences.user_timezone),
        });
    }
    Ok(())
}

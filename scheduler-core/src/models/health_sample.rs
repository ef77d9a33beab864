use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{bounded, ValidationError};

/// A timestamped measurement from one external wearable/source.
///
/// Keyed by `(timestamp, source)` per SPEC_FULL.md §3; `id` exists purely
/// as a SQLite primary key and carries no business meaning.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HealthSample {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub sleep_duration_hours: f64,
    pub sleep_quality_score: f64,
    pub resting_hr: f64,
    pub hrv_score: f64,
    pub stress_level: f64,
    pub recovery_score: f64,
    pub steps: i64,
    pub raw_payload: serde_json::Value,
}

impl HealthSample {
    /// Construct a sample, validating the bounded fields from SPEC_FULL.md
    /// §3. The raw payload is always retained, even on a field that looks
    /// implausible, so re-derivation later is still possible.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        sleep_duration_hours: f64,
        sleep_quality_score: f64,
        resting_hr: f64,
        hrv_score: f64,
        stress_level: f64,
        recovery_score: f64,
        steps: i64,
        raw_payload: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        bounded("sleep_duration_hours", sleep_duration_hours, 0.0, 24.0)?;
        bounded("sleep_quality_score", sleep_quality_score, 0.0, 100.0)?;
        bounded("stress_level", stress_level, 0.0, 100.0)?;
        bounded("recovery_score", recovery_score, 0.0, 100.0)?;

        Ok(Self {
            id: Uuid::new_v4(),
            timestamp,
            source: source.into(),
            sleep_duration_hours,
            sleep_quality_score,
            resting_hr,
            hrv_score,
            stress_level,
            recovery_score,
            steps,
            raw_payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_sleep_quality() {
        let err = HealthSample::try_new(
            Utc::now(),
            "garmin",
            7.5,
            150.0,
            55.0,
            62.0,
            20.0,
            70.0,
            8000,
            serde_json::json!({}),
        )
        .unwrap_err();
        assert_eq!(err.field, "sleep_quality_score");
    }

    #[test]
    fn accepts_in_range_values() {
        assert!(HealthSample::try_new(
            Utc::now(),
            "garmin",
            7.5,
            82.0,
            55.0,
            62.0,
            20.0,
            70.0,
            8000,
            serde_json::json!({}),
        )
        .is_ok());
    }
}

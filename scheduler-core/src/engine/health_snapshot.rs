//! Health Snapshot (C2) — spec.md §4.1. A pure function over already
//! fetched rows; the `HealthStore` trait does the I/O.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Activity, HealthSample};

/// Named, tested constants for the recovery-tier weighted blend. Resolves
/// the Open Question in spec.md §9 ("exact weights differ between two
/// source locations") by picking one set and pinning it here.
pub mod weights {
    pub const SLEEP_QUALITY: f64 = 0.35;
    pub const HRV_TUNED: f64 = 0.25;
    pub const RHR_TUNED: f64 = 0.20;
    pub const STRESS_INVERSE: f64 = 0.15;
    pub const TRAINING_LOAD_INVERSE: f64 = 0.10;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    Excellent,
    Good,
    Fair,
    Poor,
    /// No sample within 48h of the reference date; the planner treats
    /// this as `Good` (neutral default) while flagging the decision.
    Unknown,
}

impl RecoveryTier {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// The neutral default the planner substitutes for `Unknown`.
    #[must_use]
    pub fn effective(self) -> Self {
        if matches!(self, Self::Unknown) {
            Self::Good
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub reference_date: DateTime<Utc>,
    pub latest_sample: Option<HealthSample>,
    pub resting_hr_baseline_7d: Option<f64>,
    pub hrv_baseline_7d: Option<f64>,
    pub stress_baseline_7d: Option<f64>,
    pub training_load_48h: f64,
    pub recovery_score: Option<f64>,
    pub recovery_tier: RecoveryTier,
}

impl HealthSnapshot {
    /// Compute the snapshot for `reference_date` from a window of samples
    /// and activities already fetched by the caller. `samples_7d` must
    /// cover the trailing 7 days ending at `reference_date` (for the
    /// rolling baselines); `activities_48h` the trailing 48 hours (for
    /// `training_load_48h`).
    #[must_use]
    pub fn compute(
        reference_date: DateTime<Utc>,
        samples_7d: &[HealthSample],
        activities_48h: &[Activity],
    ) -> Self {
        let cutoff = reference_date + Duration::days(1);
        let latest_sample = samples_7d
            .iter()
            .filter(|s| s.timestamp < cutoff)
            .max_by_key(|s| s.timestamp)
            .cloned();

        let resting_hr_baseline_7d = median(samples_7d.iter().map(|s| s.resting_hr).collect());
        let hrv_baseline_7d = median(samples_7d.iter().map(|s| s.hrv_score).collect());
        let stress_baseline_7d = median(samples_7d.iter().map(|s| s.stress_level).collect());

        let training_load_48h: f64 = activities_48h.iter().map(|a| a.training_load).sum();

        let no_recent_sample = latest_sample
            .as_ref()
            .map_or(true, |s| reference_date - s.timestamp > Duration::hours(48));

        if no_recent_sample {
            return Self {
                reference_date,
                latest_sample,
                resting_hr_baseline_7d,
                hrv_baseline_7d,
                stress_baseline_7d,
                training_load_48h,
                recovery_score: None,
                recovery_tier: RecoveryTier::Unknown,
            };
        }

        let sample = latest_sample.as_ref().expect("checked above");
        let hrv_tuned = tuned_component(sample.hrv_score, hrv_baseline_7d, true);
        let rhr_tuned = tuned_component(sample.resting_hr, resting_hr_baseline_7d, false);
        let normalized_load = (training_load_48h / 400.0 * 100.0).min(100.0);

        let score = weights::SLEEP_QUALITY * sample.sleep_quality_score
            + weights::HRV_TUNED * hrv_tuned
            + weights::RHR_TUNED * rhr_tuned
            + weights::STRESS_INVERSE * (100.0 - sample.stress_level)
            + weights::TRAINING_LOAD_INVERSE * (100.0 - normalized_load);

        Self {
            reference_date,
            latest_sample: Some(sample.clone()),
            resting_hr_baseline_7d,
            hrv_baseline_7d,
            stress_baseline_7d,
            training_load_48h,
            recovery_score: Some(score),
            recovery_tier: RecoveryTier::from_score(score),
        }
    }
}

/// Linearly compare `value` against `baseline`: for `higher_is_better`
/// metrics (HRV) a value above baseline scores above 50; for
/// `lower_is_better` metrics (resting HR) a value below baseline scores
/// above 50. Clamped to `[0, 100]`.
fn tuned_component(value: f64, baseline: Option<f64>, higher_is_better: bool) -> f64 {
    let Some(baseline) = baseline else {
        return 50.0;
    };
    if baseline <= 0.0 {
        return 50.0;
    }
    let ratio = value / baseline;
    let delta = if higher_is_better { ratio - 1.0 } else { 1.0 - ratio };
    (50.0 + delta * 100.0).clamp(0.0, 100.0)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

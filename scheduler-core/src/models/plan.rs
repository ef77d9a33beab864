use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::activity::Discipline;
use super::goals::TimeWindow;
use super::health_sample::HealthSample;
use super::template::WorkoutTemplate;

/// Target load level for a workout (spec.md §4.5 step 4 / GLOSSARY).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    Normal,
    Reduced,
    Backup,
}

impl IntensityTier {
    /// Downshift one tier, per spec.md §4.5 step 4's training-load ceiling
    /// rule. Already at `Backup` stays at `Backup`.
    #[must_use]
    pub fn downshift(self) -> Self {
        match self {
            Self::Normal => Self::Reduced,
            Self::Reduced | Self::Backup => Self::Backup,
        }
    }
}

/// Transient input the planner hands to the LM content generator
/// (spec.md §3 / §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub date: NaiveDate,
    pub discipline: Discipline,
    pub intensity_tier: IntensityTier,
    pub preferred_window: TimeWindow,
    pub recent_activities_summary: String,
    pub health_snapshot: HealthSnapshotView,
    pub template: WorkoutTemplate,
}

/// A read-only projection of the health snapshot sized for prompt
/// rendering; avoids leaking the full `HealthSample`/`Activity` history
/// into every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshotView {
    pub recovery_tier: String,
    pub recovery_score: Option<f64>,
    pub training_load_48h: f64,
    pub sleep_quality_score: Option<f64>,
    pub stress_level: Option<f64>,
}

/// One of the two labeled alternatives in a parsed `WorkoutPlan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutOption {
    pub label: String,
    pub summary: String,
    pub steps: String,
    pub target_hr_zone_low: Option<u32>,
    pub target_hr_zone_high: Option<u32>,
    pub duration_minutes: Option<u32>,
}

/// The LM output parsed into Option A / Option B plus a backup
/// (low-energy) variant (spec.md §3 / §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub option_a: WorkoutOption,
    pub option_b: WorkoutOption,
    pub backup: String,
    pub model_used: Option<String>,
    pub degraded: bool,
}

impl WorkoutPlan {
    /// Render the two options and backup into the calendar event
    /// description, satisfying the parse contract of spec.md §4.6/§8
    /// (Invariant 8): every persisted description contains `Option A`,
    /// `Option B`, and a backup section.
    #[must_use]
    pub fn render_description(&self) -> String {
        let mut text = format!(
            "Option A: {}\n{}\n\nOption B: {}\n{}\n\nBackup (low energy):\n{}",
            self.option_a.summary, self.option_a.steps, self.option_b.summary, self.option_b.steps, self.backup
        );

        const MAX_LEN: usize = 8_000;
        if text.chars().count() > MAX_LEN {
            let truncated: String = text.chars().take(MAX_LEN).collect();
            text = format!("{truncated}\u{2026}");
        }
        text
    }
}

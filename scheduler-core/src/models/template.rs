use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::activity::Discipline;
use super::plan::IntensityTier;

/// Per-discipline structured recipe: warmup, main set variants by
/// intensity tier, cooldown (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub discipline: Discipline,
    pub warmup: String,
    pub cooldown: String,
    pub variants: HashMap<IntensityTier, IntensityVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityVariant {
    pub main_set: String,
    pub target_duration_minutes: u32,
    pub hr_zone_low: u32,
    pub hr_zone_high: u32,
}

impl WorkoutTemplate {
    #[must_use]
    pub fn variant(&self, tier: IntensityTier) -> Option<&IntensityVariant> {
        self.variants.get(&tier)
    }

    /// Render the template verbatim, with no LM involvement — used as the
    /// deterministic fallback in spec.md §4.6 and as filler when the LM
    /// response lacks a `Backup` section.
    #[must_use]
    pub fn render_plain(&self, tier: IntensityTier) -> String {
        let variant = self.variant(tier);
        let main_set = variant.map_or("(no main set defined for this tier)", |v| v.main_set.as_str());
        format!(
            "Warmup:\n{}\n\nMain set:\n{}\n\nCooldown:\n{}",
            self.warmup, main_set, self.cooldown
        )
    }
}

//! Domain entities. See SPEC_FULL.md §3.

mod activity;
mod audit;
mod calendar_event;
mod goals;
mod health_sample;
mod plan;
mod template;
mod validate;

pub use activity::{Activity, Discipline};
pub use audit::{ActionType, AuditAction};
pub use calendar_event::{CalendarEvent, EventOrigin, DONE_PREFIX, MISSED_PREFIX, PLANNED_PREFIX};
pub use goals::{Goals, Preferences, PreferredTime, SafetyLimits, TimeWindow, WeeklyStructure};
pub use health_sample::HealthSample;
pub use plan::{HealthSnapshotView, IntensityTier, PlanRequest, WorkoutOption, WorkoutPlan};
pub use template::{IntensityVariant, WorkoutTemplate};
pub use validate::ValidationError;

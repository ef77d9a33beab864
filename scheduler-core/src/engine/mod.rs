//! The planning/reconciliation engine (C2–C9). Every submodule here is
//! named after the component it implements in SPEC_FULL.md §4.

pub mod budgeter;
pub mod calendar_view;
pub mod conflict;
pub mod health_snapshot;
pub mod llm_generator;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;

pub use budgeter::Week;
pub use calendar_view::CalendarView;
pub use health_snapshot::{HealthSnapshot, RecoveryTier};
pub use llm_generator::{LmContentGenerator, ModelSpec};
pub use orchestrator::{CycleConfig, CycleSummary, Orchestrator};
pub use planner::{PlanOutcome, Planner};
pub use reconciler::{FutureOutcome, PastOutcome, Reconciler};

//! `scheduler-core` — the planning, rescheduling, and reconciliation
//! engine for the autonomous fitness-workout scheduler. See
//! SPEC_FULL.md for the full requirements this crate implements.
//!
//! The crate never talks to a real wearable, calendar, or LM endpoint
//! directly; it depends only on the small collaborator traits in
//! [`clients`] (`CalendarClient`, `LmClient`, `HealthStore`, `AuditStore`,
//! `Clock`), plus reference implementations sufficient to run end to end.

pub mod clients;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;

pub use errors::SchedulerError;

use chrono::{DateTime, Utc};

/// Abstracts `now()` so the orchestrator's deadline/cancellation logic
/// (spec.md §5) is deterministically testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! Exit code mapping from spec.md §6:
//! `0` success (including degraded), `1` user/config error,
//! `2` transient external failure, `3` aborted by deadline/cancellation.

use scheduler_core::SchedulerError;

pub const OK: u8 = 0;
pub const USER_ERROR: u8 = 1;
pub const TRANSIENT_FAILURE: u8 = 2;
pub const ABORTED: u8 = 3;

#[must_use]
pub fn for_error(err: &SchedulerError) -> u8 {
    match err {
        SchedulerError::Config(_) => USER_ERROR,
        SchedulerError::Calendar(scheduler_core::errors::CalendarError::Permission(_)) => USER_ERROR,
        SchedulerError::Calendar(_) | SchedulerError::Lm(_) | SchedulerError::Store(_) => TRANSIENT_FAILURE,
        SchedulerError::ConflictUnresolved { .. } => OK,
        SchedulerError::DeadlineExceeded => ABORTED,
        SchedulerError::AlreadyRunning => USER_ERROR,
    }
}

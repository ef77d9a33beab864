//! Error taxonomy for the scheduler core, keyed to the policy table in
//! SPEC_FULL.md §7.

use thiserror::Error;

/// Top-level error surfaced by a component or the orchestrator.
///
/// Each variant corresponds 1:1 to a row in the error-handling policy
/// table; the orchestrator matches on these to decide whether a cycle is
/// fatal, degraded, or should simply skip the affected unit of work.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("language model error: {0}")]
    Lm(#[from] LmError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("planner could not find a slot for {discipline} on {date}")]
    ConflictUnresolved {
        date: chrono::NaiveDate,
        discipline: String,
    },

    #[error("cycle deadline exceeded")]
    DeadlineExceeded,

    #[error("another cycle is already running")]
    AlreadyRunning,
}

impl SchedulerError {
    /// Whether this error should abort the whole cycle (vs. being logged
    /// and absorbed for a single unit of work).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Calendar(CalendarError::Permission(_)) | Self::AlreadyRunning
        )
    }
}

/// Errors loading or validating the declarative goals/template document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Calendar API failure, classified per SPEC_FULL.md §4.2 / §7.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarErrorKind {
    Transient,
    Permission,
    NotFound,
    Permanent,
}

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("transient calendar error: {0}")]
    Transient(String),
    #[error("permission denied by calendar API: {0}")]
    Permission(String),
    #[error("calendar event not found: {0}")]
    NotFound(String),
    #[error("permanent calendar error: {0}")]
    Permanent(String),
}

impl CalendarError {
    #[must_use]
    pub fn kind(&self) -> CalendarErrorKind {
        match self {
            Self::Transient(_) => CalendarErrorKind::Transient,
            Self::Permission(_) => CalendarErrorKind::Permission,
            Self::NotFound(_) => CalendarErrorKind::NotFound,
            Self::Permanent(_) => CalendarErrorKind::Permanent,
        }
    }
}

/// Language-model call failure. Distinguishes retryable-next-model errors
/// from a non-parseable body, which also advances the fallback chain but
/// is worth logging differently.
#[derive(Error, Debug)]
pub enum LmError {
    #[error("network error calling model {model}: {source}")]
    Network {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model {model} timed out after {timeout_secs}s")]
    Timeout { model: String, timeout_secs: u64 },
    #[error("model {model} quota/rate-limit exceeded")]
    Quota { model: String },
    #[error("model {model} returned a non-parseable body")]
    NonParseable { model: String },
}

/// Persistent-store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("duplicate key, treated as idempotent no-op: {0}")]
    Duplicate(String),
}

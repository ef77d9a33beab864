use thiserror::Error;

/// Raised when a constructed entity would violate a bounded-range
/// invariant from SPEC_FULL.md §3 (e.g. `sleep_quality_score` outside
/// 0–100). Kept as its own small error type so every entity's `try_new`
/// can share the same shape, the way the teacher's `CreateGoalRequest`
/// validators report field-level problems.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{field} must be within {min}..={max}, got {value}")]
pub struct ValidationError {
    pub field: &'static str,
    pub min: i64,
    pub max: i64,
    pub value: i64,
}

pub(crate) fn bounded(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError {
            field,
            min: min as i64,
            max: max as i64,
            value: value as i64,
        });
    }
    Ok(())
}

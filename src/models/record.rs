use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// Derived, never persisted. Recomputed from raw `(weight, reps)` at read
/// time so a formula change retroactively re-ranks all history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EstimatedRecord {
    pub exercise_id: String,
    pub weight: f64,
    pub reps: i32,
    pub date: NaiveDate,
    pub estimated_1rm: f64,
}

/// Best weight ever logged at an exact rep count, per exercise.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RepBucketRecord {
    pub exercise_id: String,
    pub reps: i32,
    pub weight: f64,
    pub achieved_on: NaiveDate,
}

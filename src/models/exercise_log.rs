use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One performed set. Weight in kg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    pub weight: f64,
    pub reps: i32,
}

impl SetEntry {
    /// Zero-valued sets are unfilled placeholders and never count toward
    /// records or estimates.
    pub fn is_loggable(&self) -> bool {
        self.weight > 0.0 && self.reps > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day: i32,
    pub exercise_id: String,
    pub sets: Json<Vec<SetEntry>>,
    pub log_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertLogRequest {
    #[validate(length(min = 1, max = 100, message = "exercise_id must be 1-100 characters"))]
    pub exercise_id: String,

    /// Program day index the workout belongs to
    #[validate(range(min = 1, max = 31, message = "day must be 1-31"))]
    pub day: i32,

    /// Default: today
    pub log_date: Option<NaiveDate>,

    #[validate(length(max = 30, message = "At most 30 sets per exercise"))]
    pub sets: Vec<SetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub exercise_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggable_requires_positive_weight_and_reps() {
        assert!(SetEntry { weight: 60.0, reps: 5 }.is_loggable());
        assert!(!SetEntry { weight: 0.0, reps: 5 }.is_loggable());
        assert!(!SetEntry { weight: 60.0, reps: 0 }.is_loggable());
        assert!(!SetEntry { weight: 0.0, reps: 0 }.is_loggable());
    }

    #[test]
    fn test_upsert_request_deserializes() {
        let json = r#"{"exercise_id":"squat","day":1,"sets":[{"weight":100,"reps":5}]}"#;
        let req: UpsertLogRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.exercise_id, "squat");
        assert_eq!(req.day, 1);
        assert!(req.log_date.is_none());
        assert_eq!(req.sets, vec![SetEntry { weight: 100.0, reps: 5 }]);
    }

    #[test]
    fn test_upsert_request_rejects_missing_sets() {
        let json = r#"{"exercise_id":"squat","day":1}"#;
        assert!(serde_json::from_str::<UpsertLogRequest>(json).is_err());
    }

    #[test]
    fn test_upsert_request_validation_bounds() {
        let req = UpsertLogRequest {
            exercise_id: String::new(),
            day: 0,
            log_date: None,
            sets: vec![],
        };
        assert!(req.validate().is_err());

        let req = UpsertLogRequest {
            exercise_id: "bench".into(),
            day: 3,
            log_date: None,
            sets: vec![SetEntry { weight: 60.0, reps: 8 }],
        };
        assert!(req.validate().is_ok());
    }
}

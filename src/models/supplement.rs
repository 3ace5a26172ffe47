use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplementItem {
    pub name: String,
    pub dosage: String,
}

/// One row per (user, weekday); absence means no reminder that day.
/// day_of_week: 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupplementSchedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day_of_week: i16,
    pub reminder_time: NaiveTime,
    pub supplements: Json<Vec<SupplementItem>>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per (user, date). Rows are only ever written in a terminal state
/// (taken or skipped); "unmark" deletes the row, returning the date to
/// pending.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupplementLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub taken_at: Option<DateTime<Utc>>,
    pub skipped: bool,
    pub created_at: DateTime<Utc>,
}

impl SupplementLog {
    pub fn is_terminal(&self) -> bool {
        self.taken_at.is_some() || self.skipped
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertScheduleRequest {
    #[validate(range(min = 0, max = 6, message = "day_of_week must be 0-6 (Sunday-Saturday)"))]
    pub day_of_week: i16,

    /// "HH:MM" (seconds accepted and ignored)
    pub reminder_time: String,

    #[validate(length(min = 1, max = 20, message = "1-20 supplements per day"))]
    pub supplements: Vec<SupplementItem>,

    /// Default: true
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkAction {
    Taken,
    Skipped,
}

#[derive(Debug, Deserialize)]
pub struct MarkSupplementRequest {
    /// Default: today
    pub date: Option<NaiveDate>,
    pub action: MarkAction,
}

#[derive(Debug, Deserialize)]
pub struct UnmarkQuery {
    pub date: Option<NaiveDate>,
}

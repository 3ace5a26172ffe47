use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Datelike, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::supplement::{
    MarkAction, MarkSupplementRequest, SupplementLog, SupplementSchedule, UnmarkQuery,
    UpsertScheduleRequest,
};
use crate::AppState;

pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<SupplementSchedule>>> {
    let schedules = sqlx::query_as::<_, SupplementSchedule>(
        "SELECT * FROM supplement_schedules WHERE user_id = $1 ORDER BY day_of_week ASC",
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(schedules))
}

pub async fn upsert_schedule(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertScheduleRequest>,
) -> AppResult<Json<SupplementSchedule>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    for item in &body.supplements {
        if item.name.trim().is_empty() {
            return Err(AppError::Validation("Supplement name is required".into()));
        }
    }

    let reminder_time = parse_reminder_time(&body.reminder_time)?;

    let schedule = sqlx::query_as::<_, SupplementSchedule>(
        r#"
        INSERT INTO supplement_schedules (id, user_id, day_of_week, reminder_time, supplements, enabled)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, day_of_week) DO UPDATE SET
            reminder_time = EXCLUDED.reminder_time,
            supplements = EXCLUDED.supplements,
            enabled = EXCLUDED.enabled,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.day_of_week)
    .bind(reminder_time)
    .bind(sqlx::types::Json(&body.supplements))
    .bind(body.enabled.unwrap_or(true))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(schedule))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(day_of_week): Path<i16>,
) -> AppResult<Json<serde_json::Value>> {
    let result =
        sqlx::query("DELETE FROM supplement_schedules WHERE user_id = $1 AND day_of_week = $2")
            .bind(auth_user.id)
            .bind(day_of_week)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("No schedule for that day".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Serialize)]
pub struct TodayStatusResponse {
    pub date: chrono::NaiveDate,
    /// "pending" | "taken" | "skipped"
    pub status: &'static str,
    pub schedule: Option<SupplementSchedule>,
}

pub async fn today_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<TodayStatusResponse>> {
    let now = Utc::now();
    let today = now.date_naive();
    let day_of_week = now.weekday().num_days_from_sunday() as i16;

    let log = sqlx::query_as::<_, SupplementLog>(
        "SELECT * FROM supplement_logs WHERE user_id = $1 AND log_date = $2",
    )
    .bind(auth_user.id)
    .bind(today)
    .fetch_optional(&state.db)
    .await?;

    let schedule = sqlx::query_as::<_, SupplementSchedule>(
        "SELECT * FROM supplement_schedules WHERE user_id = $1 AND day_of_week = $2",
    )
    .bind(auth_user.id)
    .bind(day_of_week)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(TodayStatusResponse {
        date: today,
        status: log_status(log.as_ref()),
        schedule,
    }))
}

/// Mark a date taken or skipped. Both states are terminal: marking an
/// already-marked date is a conflict, and the row must be unmarked
/// (deleted) first to change it.
pub async fn mark_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<MarkSupplementRequest>,
) -> AppResult<Json<SupplementLog>> {
    let log_date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let (taken_at, skipped) = match body.action {
        MarkAction::Taken => (Some(Utc::now()), false),
        MarkAction::Skipped => (None, true),
    };

    let inserted = sqlx::query_as::<_, SupplementLog>(
        r#"
        INSERT INTO supplement_logs (id, user_id, log_date, taken_at, skipped)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, log_date) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(log_date)
    .bind(taken_at)
    .bind(skipped)
    .fetch_optional(&state.db)
    .await?;

    match inserted {
        Some(log) => Ok(Json(log)),
        None => Err(AppError::Conflict(
            "Supplements already marked for this date".into(),
        )),
    }
}

/// Unmark returns the date to pending by deleting the row. Idempotent.
pub async fn unmark_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<UnmarkQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let log_date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    sqlx::query("DELETE FROM supplement_logs WHERE user_id = $1 AND log_date = $2")
        .bind(auth_user.id)
        .bind(log_date)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn log_status(log: Option<&SupplementLog>) -> &'static str {
    match log {
        Some(log) if !log.is_terminal() => "pending",
        Some(log) if log.taken_at.is_some() => "taken",
        Some(_) => "skipped",
        None => "pending",
    }
}

/// Accept "HH:MM" (seconds tolerated and ignored by the matcher).
fn parse_reminder_time(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::Validation("reminder_time must be HH:MM".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_reminder_time_formats() {
        assert_eq!(
            parse_reminder_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_reminder_time("21:05:30").unwrap(),
            NaiveTime::from_hms_opt(21, 5, 30).unwrap()
        );
        assert!(parse_reminder_time("8.30").is_err());
        assert!(parse_reminder_time("25:00").is_err());
        assert!(parse_reminder_time("").is_err());
    }

    #[test]
    fn test_log_status_mapping() {
        assert_eq!(log_status(None), "pending");

        let base = SupplementLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            log_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            taken_at: None,
            skipped: false,
            created_at: Utc::now(),
        };

        let taken = SupplementLog {
            taken_at: Some(Utc::now()),
            ..base.clone()
        };
        assert_eq!(log_status(Some(&taken)), "taken");

        let skipped = SupplementLog {
            skipped: true,
            ..base
        };
        assert_eq!(log_status(Some(&skipped)), "skipped");
    }
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::exercise_log::{ExerciseLog, LogQuery, UpsertLogRequest};
use crate::services::records::{
    fetch_rep_bucket_bests, is_set_personal_record, record_rep_bucket_best,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NewRecord {
    pub reps: i32,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct UpsertLogResponse {
    pub log: ExerciseLog,
    pub new_records: Vec<NewRecord>,
}

pub async fn upsert_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertLogRequest>,
) -> AppResult<Json<UpsertLogResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Zero-valued sets are allowed as placeholders; negatives never are.
    for set in &body.sets {
        if set.weight < 0.0 || set.reps < 0 {
            return Err(AppError::Validation(
                "Set weight and reps must not be negative".into(),
            ));
        }
    }

    let log_date = body.log_date.unwrap_or_else(|| Utc::now().date_naive());

    let log = sqlx::query_as::<_, ExerciseLog>(
        r#"
        INSERT INTO exercise_logs (id, user_id, day, exercise_id, sets, log_date, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (user_id, day, log_date, exercise_id) DO UPDATE SET
            sets = EXCLUDED.sets,
            completed_at = NOW(),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.day)
    .bind(&body.exercise_id)
    .bind(sqlx::types::Json(&body.sets))
    .bind(log_date)
    .fetch_one(&state.db)
    .await?;

    // Detection is side-effect-free; recording happens here, after the log
    // is durable. The in-memory bests map is advanced between sets so two
    // records in one request compare against each other.
    let mut bests = fetch_rep_bucket_bests(&state.db, auth_user.id, &body.exercise_id).await?;
    let mut new_records = Vec::new();
    for set in &body.sets {
        if !is_set_personal_record(set, &bests) {
            continue;
        }
        record_rep_bucket_best(
            &state.db,
            auth_user.id,
            &body.exercise_id,
            set.reps,
            set.weight,
            log_date,
        )
        .await?;
        bests.insert(set.reps, set.weight);
        new_records.push(NewRecord {
            reps: set.reps,
            weight: set.weight,
        });
    }

    if !new_records.is_empty() {
        if let Some(tx) = state.ws_tx.as_ref() {
            let msg = serde_json::json!({
                "type": "pr_recorded",
                "user_id": auth_user.id,
                "exercise_id": body.exercise_id,
                "records": &new_records,
            });
            let _ = tx.send(msg.to_string());
        }
    }

    Ok(Json(UpsertLogResponse { log, new_records }))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<Vec<ExerciseLog>>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let logs = if let Some(exercise_id) = query.exercise_id {
        sqlx::query_as::<_, ExerciseLog>(
            r#"
            SELECT * FROM exercise_logs
            WHERE user_id = $1 AND exercise_id = $2 AND log_date BETWEEN $3 AND $4
            ORDER BY log_date DESC, completed_at DESC
            "#,
        )
        .bind(auth_user.id)
        .bind(exercise_id)
        .bind(start)
        .bind(end)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, ExerciseLog>(
            r#"
            SELECT * FROM exercise_logs
            WHERE user_id = $1 AND log_date BETWEEN $2 AND $3
            ORDER BY log_date DESC, completed_at DESC
            "#,
        )
        .bind(auth_user.id)
        .bind(start)
        .bind(end)
        .fetch_all(&state.db)
        .await?
    };

    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_response_shape() {
        let records = vec![NewRecord {
            reps: 5,
            weight: 102.5,
        }];
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[0]["reps"], 5);
        assert_eq!(json[0]["weight"], 102.5);
    }
}

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::exercise_log::ExerciseLog;
use crate::models::record::{EstimatedRecord, RepBucketRecord};
use crate::services::records::{clamp_leaderboard_limit, rank_personal_records};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Default: the caller. Other users require admin.
    pub user_id: Option<Uuid>,
    /// Raw string: the limit clamps to its bounds instead of rejecting junk
    pub limit: Option<String>,
}

/// Top-N exercises by estimated one-rep-max, recomputed from the full log
/// history on every request.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<EstimatedRecord>>> {
    let target = query.user_id.unwrap_or(auth_user.id);
    if !auth_user.can_access(target) {
        return Err(AppError::Forbidden);
    }

    let limit = clamp_leaderboard_limit(query.limit.as_deref());

    let logs = sqlx::query_as::<_, ExerciseLog>("SELECT * FROM exercise_logs WHERE user_id = $1")
        .bind(target)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(rank_personal_records(&logs, limit)))
}

#[derive(Debug, Deserialize)]
pub struct BucketQuery {
    pub user_id: Option<Uuid>,
}

/// Best weight per tracked rep bucket for one exercise, with the date each
/// record was set.
pub async fn get_rep_buckets(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(exercise_id): Path<String>,
    Query(query): Query<BucketQuery>,
) -> AppResult<Json<Vec<RepBucketRecord>>> {
    let target = query.user_id.unwrap_or(auth_user.id);
    if !auth_user.can_access(target) {
        return Err(AppError::Forbidden);
    }

    let records = sqlx::query_as::<_, RepBucketRecord>(
        r#"
        SELECT exercise_id, reps, weight, achieved_on FROM user_exercise_records
        WHERE user_id = $1 AND exercise_id = $2
        ORDER BY reps ASC
        "#,
    )
    .bind(target)
    .bind(&exercise_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_rep_bucket_record_shape() {
        let record = RepBucketRecord {
            exercise_id: "squat".into(),
            reps: 5,
            weight: 140.0,
            achieved_on: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["reps"], 5);
        assert_eq!(json["weight"], 140.0);
        assert_eq!(json["achieved_on"], "2026-08-01");
    }
}

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::subscription::{PushSubscription, SubscribeRequest, UnsubscribeRequest};
use crate::services::push::delete_subscription;
use crate::AppState;

/// Public VAPID key the browser needs to create a subscription.
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "public_key": state.config.vapid_public_key }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SubscribeRequest>,
) -> AppResult<Json<PushSubscription>> {
    if !body.endpoint.starts_with("https://") {
        return Err(AppError::Validation("endpoint must be an https URL".into()));
    }
    if body.keys.p256dh.is_empty() || body.keys.auth.is_empty() {
        return Err(AppError::Validation("Subscription keys are required".into()));
    }

    // The endpoint is the identity: re-subscribing reassigns the owner
    // (last-write-wins against a concurrent prune).
    let subscription = sqlx::query_as::<_, PushSubscription>(
        r#"
        INSERT INTO push_subscriptions (endpoint, user_id, p256dh, auth)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (endpoint) DO UPDATE SET
            user_id = EXCLUDED.user_id,
            p256dh = EXCLUDED.p256dh,
            auth = EXCLUDED.auth
        RETURNING *
        "#,
    )
    .bind(&body.endpoint)
    .bind(auth_user.id)
    .bind(&body.keys.p256dh)
    .bind(&body.keys.auth)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(subscription))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(body): Json<UnsubscribeRequest>,
) -> AppResult<Json<Value>> {
    delete_subscription(&state.db, &body.endpoint).await?;
    Ok(Json(json!({ "deleted": true })))
}

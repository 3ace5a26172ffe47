use axum::{extract::State, http::HeaderMap, Json};

use crate::error::{AppError, AppResult};
use crate::services::reminders::{run_reminder_sweep, SweepOutcome};
use crate::AppState;

const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// The sweep trigger for an external scheduler. Unset secret disables the
/// endpoint rather than leaving it open.
pub async fn supplement_reminder_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<SweepOutcome>> {
    if state.config.cron_secret.is_empty() {
        return Err(AppError::Forbidden);
    }

    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(state.config.cron_secret.as_str()) {
        return Err(AppError::Unauthorized);
    }

    let outcome = run_reminder_sweep(&state).await?;
    Ok(Json(outcome))
}

//! Supplement reminder matching: a recurring weekly schedule swept on a
//! fixed interval. A reminder fires in the first sweep whose window covers
//! it; once the user marks the day taken or skipped, the terminal log row
//! suppresses any further reminders for that date.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::supplement::{SupplementItem, SupplementSchedule};
use crate::services::push::{dispatch, fetch_subscriptions, ReminderPayload};
use crate::AppState;

/// Width of the match window, in minutes. Must equal the sweep cadence: a
/// sweep outage longer than the window drops the reminder (best effort, no
/// catch-up).
pub const REMINDER_WINDOW_MINUTES: u32 = 5;

#[derive(Debug)]
pub struct DueReminder {
    pub user_id: Uuid,
    pub supplements: Vec<SupplementItem>,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepOutcome {
    pub checked: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Half-open window `(now - 5min, now]`, compared at minute precision.
/// Times never wrap midnight: a reminder in the final minutes of a day is
/// only matched by a sweep on the same calendar day.
pub fn is_reminder_due(reminder: NaiveTime, now: NaiveTime) -> bool {
    let reminder_min = reminder.hour() * 60 + reminder.minute();
    let now_min = now.hour() * 60 + now.minute();
    now_min >= reminder_min && now_min - reminder_min < REMINDER_WINDOW_MINUTES
}

/// Users whose enabled schedule for today's weekday falls inside the match
/// window and who have not already acknowledged today.
pub async fn find_due_reminders(
    db: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<DueReminder>, sqlx::Error> {
    let day_of_week = now.weekday().num_days_from_sunday() as i16;
    let today = now.date_naive();
    let time = now.time();

    let schedules = sqlx::query_as::<_, SupplementSchedule>(
        "SELECT * FROM supplement_schedules WHERE day_of_week = $1 AND enabled = true",
    )
    .bind(day_of_week)
    .fetch_all(db)
    .await?;

    let candidates: Vec<&SupplementSchedule> = schedules
        .iter()
        .filter(|s| is_reminder_due(s.reminder_time, time))
        .collect();

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<Uuid> = candidates.iter().map(|s| s.user_id).collect();
    let acknowledged: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT user_id FROM supplement_logs
        WHERE log_date = $1 AND user_id = ANY($2)
          AND (taken_at IS NOT NULL OR skipped = true)
        "#,
    )
    .bind(today)
    .bind(&user_ids)
    .fetch_all(db)
    .await?;

    Ok(candidates
        .into_iter()
        .filter(|s| !acknowledged.contains(&s.user_id))
        .map(|s| DueReminder {
            user_id: s.user_id,
            supplements: s.supplements.0.clone(),
        })
        .collect())
}

/// One sweep: match due users, then fan a reminder out to each user's
/// subscriptions. Delivery failures are aggregated, never propagated;
/// a persistence failure aborts the sweep and surfaces to the trigger.
pub async fn run_reminder_sweep(state: &AppState) -> Result<SweepOutcome, sqlx::Error> {
    let due = find_due_reminders(&state.db, Utc::now()).await?;

    let mut outcome = SweepOutcome {
        checked: due.len() as u64,
        ..Default::default()
    };

    for reminder in &due {
        let subscriptions = fetch_subscriptions(&state.db, reminder.user_id).await?;
        let payload = ReminderPayload::supplement_reminder(&reminder.supplements);
        let delivered = dispatch(&state.db, &state.push, &subscriptions, &payload).await;
        outcome.sent += u64::from(delivered.sent);
        outcome.failed += u64::from(delivered.failed);
    }

    if outcome.checked > 0 {
        tracing::info!(
            checked = outcome.checked,
            sent = outcome.sent,
            failed = outcome.failed,
            "Supplement reminder sweep completed"
        );
    }

    Ok(outcome)
}

/// In-process sweep loop for deployments without an external cron. The
/// interval equals the match window, so exactly one trigger source may run.
pub fn spawn_reminder_worker(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            u64::from(REMINDER_WINDOW_MINUTES) * 60,
        ));
        loop {
            interval.tick().await;
            if let Err(e) = run_reminder_sweep(&state).await {
                tracing::error!(error = %e, "Reminder sweep worker error");
            }
        }
    });
}

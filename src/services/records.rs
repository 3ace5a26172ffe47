//! Personal-record math: one-rep-max estimation, leaderboard ranking, and
//! set-level record detection over raw `(weight, reps)` history. Estimates
//! are always derived at read time, never stored.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::exercise_log::{ExerciseLog, SetEntry};
use crate::models::record::EstimatedRecord;

/// Rep counts tracked as record-eligible buckets. Any other rep count never
/// produces a record signal, no matter how heavy.
pub const PR_REP_BUCKETS: [i32; 3] = [1, 3, 5];

const DEFAULT_LEADERBOARD_LIMIT: usize = 5;
const MAX_LEADERBOARD_LIMIT: usize = 50;

/// Epley estimate: `weight * (1 + reps/30)`, rounded to one decimal
/// (half up). A single is returned as-is so the estimate never distorts a
/// true max. Unloggable input yields 0 rather than an error.
pub fn estimate_one_rep_max(weight: f64, reps: i32) -> f64 {
    if weight <= 0.0 || reps <= 0 {
        return 0.0;
    }
    if reps == 1 {
        return weight;
    }
    round_tenths(weight * (1.0 + reps as f64 / 30.0))
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Best estimated single per exercise across the full history, ranked
/// heaviest first and truncated to `limit`.
///
/// Entries are processed newest first, and an estimate only displaces the
/// held one when strictly greater, so a tie resolves to the most recent set
/// regardless of how the rows arrived.
pub fn rank_personal_records(logs: &[ExerciseLog], limit: usize) -> Vec<EstimatedRecord> {
    let mut ordered: Vec<&ExerciseLog> = logs.iter().collect();
    ordered.sort_by(|a, b| (b.log_date, b.completed_at).cmp(&(a.log_date, a.completed_at)));

    let mut best: HashMap<&str, EstimatedRecord> = HashMap::new();
    for log in ordered {
        for set in log.sets.iter() {
            if !set.is_loggable() {
                continue;
            }
            let estimated = estimate_one_rep_max(set.weight, set.reps);
            if best
                .get(log.exercise_id.as_str())
                .map_or(true, |held| estimated > held.estimated_1rm)
            {
                best.insert(
                    log.exercise_id.as_str(),
                    EstimatedRecord {
                        exercise_id: log.exercise_id.clone(),
                        weight: set.weight,
                        reps: set.reps,
                        date: log.log_date,
                        estimated_1rm: estimated,
                    },
                );
            }
        }
    }

    let mut records: Vec<EstimatedRecord> = best.into_values().collect();
    records.sort_by(|a, b| {
        b.estimated_1rm
            .partial_cmp(&a.estimated_1rm)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.exercise_id.cmp(&b.exercise_id))
    });
    records.truncate(limit);
    records
}

/// The leaderboard limit clamps rather than rejects: absent or unparseable
/// input falls back to the default, out-of-range values saturate at the
/// bounds.
pub fn clamp_leaderboard_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) => n.clamp(1, MAX_LEADERBOARD_LIMIT as i64) as usize,
        None => DEFAULT_LEADERBOARD_LIMIT,
    }
}

/// Whether a set beats the stored best for its exact rep count.
///
/// Side-effect-free: callers decide when a confirmed record is persisted,
/// so a provisional or later-edited set never corrupts record state.
pub fn is_set_personal_record(set: &SetEntry, bests: &HashMap<i32, f64>) -> bool {
    if !set.is_loggable() {
        return false;
    }
    if !PR_REP_BUCKETS.contains(&set.reps) {
        return false;
    }
    match bests.get(&set.reps) {
        Some(best) => set.weight > *best,
        None => true,
    }
}

pub async fn fetch_rep_bucket_bests(
    db: &PgPool,
    user_id: Uuid,
    exercise_id: &str,
) -> Result<HashMap<i32, f64>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i32, f64)>(
        "SELECT reps, weight FROM user_exercise_records WHERE user_id = $1 AND exercise_id = $2",
    )
    .bind(user_id)
    .bind(exercise_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Monotonic upsert: the row is only written when the new weight strictly
/// exceeds the stored one, so concurrent writers cannot regress a record.
pub async fn record_rep_bucket_best(
    db: &PgPool,
    user_id: Uuid,
    exercise_id: &str,
    reps: i32,
    weight: f64,
    achieved_on: NaiveDate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_exercise_records (user_id, exercise_id, reps, weight, achieved_on)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, exercise_id, reps) DO UPDATE SET
            weight = EXCLUDED.weight,
            achieved_on = EXCLUDED.achieved_on,
            updated_at = NOW()
        WHERE user_exercise_records.weight < EXCLUDED.weight
        "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(reps)
    .bind(weight)
    .bind(achieved_on)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::types::Json;

    fn log(exercise_id: &str, date: NaiveDate, sets: &[(f64, i32)]) -> ExerciseLog {
        let completed_at = Utc
            .from_utc_datetime(&date.and_hms_opt(18, 0, 0).unwrap());
        ExerciseLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            day: 1,
            exercise_id: exercise_id.into(),
            sets: Json(sets.iter().map(|&(weight, reps)| SetEntry { weight, reps }).collect()),
            log_date: date,
            completed_at,
            created_at: completed_at,
            updated_at: completed_at,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── estimate_one_rep_max ─────────────────────────────────────────────

    #[test]
    fn test_estimate_single_is_identity() {
        assert_eq!(estimate_one_rep_max(100.0, 1), 100.0);
        assert_eq!(estimate_one_rep_max(142.5, 1), 142.5);
        assert_eq!(estimate_one_rep_max(60.0, 1), 60.0);
    }

    #[test]
    fn test_estimate_unloggable_is_zero() {
        assert_eq!(estimate_one_rep_max(100.0, 0), 0.0);
        assert_eq!(estimate_one_rep_max(100.0, -1), 0.0);
        assert_eq!(estimate_one_rep_max(0.0, 5), 0.0);
        assert_eq!(estimate_one_rep_max(-80.0, 5), 0.0);
    }

    #[test]
    fn test_estimate_epley_rounds_to_tenths() {
        // 100 × (1 + 10/30) = 133.33… → 133.3
        assert_eq!(estimate_one_rep_max(100.0, 10), 133.3);
        // 100 × (1 + 5/30) = 116.66… → 116.7
        assert_eq!(estimate_one_rep_max(100.0, 5), 116.7);
        // 80 × (1 + 8/30) = 101.33… → 101.3
        assert_eq!(estimate_one_rep_max(80.0, 8), 101.3);
        // 60 × (1 + 10/30) = 80.0 exactly
        assert_eq!(estimate_one_rep_max(60.0, 10), 80.0);
    }

    // ── rank_personal_records ────────────────────────────────────────────

    #[test]
    fn test_ranking_keeps_best_set_per_exercise() {
        let logs = vec![
            log("squat", date(2026, 7, 1), &[(100.0, 5)]),
            log("squat", date(2026, 7, 8), &[(80.0, 8)]),
            log("bench", date(2026, 7, 2), &[(60.0, 10)]),
        ];

        let ranked = rank_personal_records(&logs, 5);
        assert_eq!(ranked.len(), 2, "one entry per exercise");
        assert_eq!(ranked[0].exercise_id, "squat");
        assert_eq!(ranked[0].estimated_1rm, 116.7);
        assert_eq!(ranked[0].weight, 100.0);
        assert_eq!(ranked[0].reps, 5);
        assert_eq!(ranked[1].exercise_id, "bench");
        assert_eq!(ranked[1].estimated_1rm, 80.0);
    }

    #[test]
    fn test_ranking_skips_placeholder_sets() {
        let logs = vec![log(
            "deadlift",
            date(2026, 7, 1),
            &[(0.0, 5), (140.0, 0), (120.0, 3)],
        )];

        let ranked = rank_personal_records(&logs, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].weight, 120.0);
        assert_eq!(ranked[0].reps, 3);
    }

    #[test]
    fn test_ranking_only_placeholders_is_empty() {
        let logs = vec![log("row", date(2026, 7, 1), &[(0.0, 0), (0.0, 0)])];
        assert!(rank_personal_records(&logs, 5).is_empty());
    }

    #[test]
    fn test_ranking_empty_history_is_empty() {
        assert!(rank_personal_records(&[], 5).is_empty());
    }

    #[test]
    fn test_ranking_tie_resolves_to_most_recent() {
        // Identical estimates on two dates: the newer set holds the record,
        // independent of input order.
        let older = log("squat", date(2026, 6, 1), &[(100.0, 1)]);
        let newer = log("squat", date(2026, 6, 15), &[(100.0, 1)]);

        let ranked = rank_personal_records(&[older.clone(), newer.clone()], 5);
        assert_eq!(ranked[0].date, date(2026, 6, 15));

        let ranked = rank_personal_records(&[newer, older], 5);
        assert_eq!(ranked[0].date, date(2026, 6, 15));
    }

    #[test]
    fn test_ranking_truncates_to_limit() {
        let logs = vec![
            log("squat", date(2026, 7, 1), &[(100.0, 5)]),
            log("bench", date(2026, 7, 1), &[(80.0, 5)]),
            log("deadlift", date(2026, 7, 1), &[(140.0, 5)]),
        ];

        let ranked = rank_personal_records(&logs, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].exercise_id, "deadlift");
        assert_eq!(ranked[1].exercise_id, "squat");
    }

    #[test]
    fn test_clamp_leaderboard_limit() {
        assert_eq!(clamp_leaderboard_limit(None), 5);
        assert_eq!(clamp_leaderboard_limit(Some("abc")), 5);
        assert_eq!(clamp_leaderboard_limit(Some("")), 5);
        assert_eq!(clamp_leaderboard_limit(Some("7")), 7);
        assert_eq!(clamp_leaderboard_limit(Some(" 12 ")), 12);
        assert_eq!(clamp_leaderboard_limit(Some("0")), 1);
        assert_eq!(clamp_leaderboard_limit(Some("-3")), 1);
        assert_eq!(clamp_leaderboard_limit(Some("999")), 50);
    }

    // ── is_set_personal_record ───────────────────────────────────────────

    #[test]
    fn test_detector_ignores_untracked_rep_counts() {
        let bests = HashMap::new();
        assert!(!is_set_personal_record(
            &SetEntry { weight: 100.0, reps: 8 },
            &bests
        ));
        assert!(!is_set_personal_record(
            &SetEntry { weight: 200.0, reps: 12 },
            &bests
        ));
    }

    #[test]
    fn test_detector_first_entry_is_a_record() {
        let bests = HashMap::new();
        for reps in PR_REP_BUCKETS {
            assert!(is_set_personal_record(&SetEntry { weight: 50.0, reps }, &bests));
        }
    }

    #[test]
    fn test_detector_requires_strict_improvement() {
        let bests = HashMap::from([(5, 90.0)]);
        assert!(is_set_personal_record(
            &SetEntry { weight: 100.0, reps: 5 },
            &bests
        ));
        assert!(!is_set_personal_record(
            &SetEntry { weight: 90.0, reps: 5 },
            &bests
        ));
        assert!(!is_set_personal_record(
            &SetEntry { weight: 80.0, reps: 5 },
            &bests
        ));
    }

    #[test]
    fn test_detector_rejects_placeholder_sets() {
        let bests = HashMap::new();
        assert!(!is_set_personal_record(&SetEntry { weight: 0.0, reps: 5 }, &bests));
        assert!(!is_set_personal_record(&SetEntry { weight: 100.0, reps: 0 }, &bests));
    }

    #[test]
    fn test_detector_buckets_are_independent() {
        let bests = HashMap::from([(1, 140.0), (3, 120.0)]);
        // A heavy triple does not consult the single's bucket
        assert!(is_set_personal_record(
            &SetEntry { weight: 125.0, reps: 3 },
            &bests
        ));
        assert!(!is_set_personal_record(
            &SetEntry { weight: 125.0, reps: 1 },
            &bests
        ));
        // The 5-rep bucket is empty, so any loggable five is a record
        assert!(is_set_personal_record(
            &SetEntry { weight: 60.0, reps: 5 },
            &bests
        ));
    }
}

//! Set-record log and user settings persistence
//!
//! The set-record log is append-only: records are inserted and read back,
//! never updated or deleted. Analysis always works on a snapshot read here.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::analysis::UserSettings;
use crate::exercises::normalize_name;
use crate::models::{NewSetRecord, SetRecord};

// ---------------------------------------------------------------------------
// Snapshot Fingerprint
// ---------------------------------------------------------------------------

/// Version of a record snapshot; any append changes both fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct LogFingerprint {
    pub record_count: usize,
    pub last_record_id: i64,
}

impl LogFingerprint {
    pub fn of(records: &[SetRecord]) -> Self {
        Self {
            record_count: records.len(),
            last_record_id: records.iter().map(|r| r.id).max().unwrap_or(0),
        }
    }
}

/// All records of one exercise, keyed by normalized name
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseLog {
    /// Name as most recently logged
    pub exercise_name: String,
    pub records: Vec<SetRecord>,
}

/// Split a user's snapshot per exercise; names that differ only in case,
/// spacing or underscores are the same exercise
pub fn group_by_exercise(records: &[SetRecord]) -> Vec<ExerciseLog> {
    let mut groups: BTreeMap<String, Vec<SetRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(normalize_name(&record.exercise_name))
            .or_default()
            .push(record.clone());
    }

    groups
        .into_values()
        .map(|records| {
            let exercise_name = records
                .iter()
                .max_by(|a, b| a.performed_at.cmp(&b.performed_at).then_with(|| a.id.cmp(&b.id)))
                .map(|r| r.exercise_name.trim().to_string())
                .unwrap_or_default();
            ExerciseLog {
                exercise_name,
                records,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Set Records
// ---------------------------------------------------------------------------

/// Load every set record of a user, oldest first
pub async fn load_user_records(pool: &SqlitePool, user_id: &str) -> Result<Vec<SetRecord>, sqlx::Error> {
    sqlx::query_as::<_, SetRecord>(
        r#"
        SELECT id, user_id, exercise_name, workout_id, weight_kg, reps, rpe, performed_at
        FROM set_records
        WHERE user_id = ?
        ORDER BY performed_at, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Load one exercise's records for a user, matching names case-insensitively
pub async fn load_exercise_records(
    pool: &SqlitePool,
    user_id: &str,
    exercise_name: &str,
) -> Result<Vec<SetRecord>, sqlx::Error> {
    let key = normalize_name(exercise_name);
    let records = load_user_records(pool, user_id).await?;
    Ok(records
        .into_iter()
        .filter(|r| normalize_name(&r.exercise_name) == key)
        .collect())
}

/// Append one record to the log, returning its id
pub async fn append_set_record(pool: &SqlitePool, record: &NewSetRecord) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO set_records
            (user_id, exercise_name, workout_id, weight_kg, reps, rpe, performed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.user_id)
    .bind(record.exercise_name.trim())
    .bind(&record.workout_id)
    .bind(record.weight_kg)
    .bind(record.reps)
    .bind(record.rpe)
    .bind(record.performed_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// User Settings
// ---------------------------------------------------------------------------

/// Settings for a user; defaults when none are stored
pub async fn load_user_settings(pool: &SqlitePool, user_id: &str) -> Result<UserSettings, sqlx::Error> {
    let row: Option<(Option<f64>, f64)> = sqlx::query_as(
        "SELECT exercise_sessions_per_week, load_increment_kg FROM user_settings WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((exercise_sessions_per_week, load_increment_kg)) => UserSettings {
            exercise_sessions_per_week,
            load_increment_kg,
        },
        None => UserSettings::default(),
    })
}

pub async fn save_user_settings(
    pool: &SqlitePool,
    user_id: &str,
    settings: &UserSettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_settings (user_id, exercise_sessions_per_week, load_increment_kg, updated_at)
        VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
        ON CONFLICT(user_id) DO UPDATE SET
            exercise_sessions_per_week = excluded.exercise_sessions_per_week,
            load_increment_kg = excluded.load_increment_kg,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(settings.exercise_sessions_per_week)
    .bind(settings.load_increment_kg)
    .execute(pool)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Test utilities and helpers for unit and command testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seeded set-record histories
//! - Record, session and trend factories

use crate::analysis::UserSettings;
use crate::coaching::SuggestionEnricher;
use crate::config::CoachConfig;
use crate::db::AppState;
use crate::history;
use crate::models::{ExerciseTrend, NewSetRecord, Session, SetRecord, TrendMetrics};
use crate::suggestions::SuggestionService;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const TEST_USER: &str = "user-1";

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Managed state over `pool` with default configuration and template cues
pub fn test_state(pool: SqlitePool) -> Arc<AppState> {
  Arc::new(AppState {
    db: pool,
    service: SuggestionService::new(CoachConfig::default(), SuggestionEnricher::templates()),
  })
}

/// Seed a steadily progressing history (see [`progressing_records`])
/// Returns the IDs of created records
pub async fn seed_progressing_history(
  pool: &SqlitePool,
  user_id: &str,
  exercise: &str,
  sessions: usize,
  as_of: DateTime<Utc>,
) -> Vec<i64> {
  let mut ids = Vec::new();

  for record in progressing_records(exercise, sessions, as_of, 1) {
    let new_record = NewSetRecord {
      user_id: user_id.to_string(),
      exercise_name: record.exercise_name,
      workout_id: record.workout_id,
      weight_kg: record.weight_kg,
      reps: record.reps,
      rpe: record.rpe,
      performed_at: record.performed_at,
    };
    let id = history::append_set_record(pool, &new_record)
      .await
      .expect("Failed to insert test set record");
    ids.push(id);
  }

  ids
}

/// Seed the database with test user settings
pub async fn seed_test_user_settings(pool: &SqlitePool, user_id: &str) -> UserSettings {
  let settings = UserSettings {
    exercise_sessions_per_week: Some(2.0),
    load_increment_kg: 2.5,
  };

  history::save_user_settings(pool, user_id, &settings)
    .await
    .expect("Failed to seed user settings");

  settings
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Fixed reference time so date arithmetic in tests is reproducible
pub fn fixed_as_of() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
}

pub fn set_record(
  id: i64,
  exercise: &str,
  weight: f64,
  reps: i64,
  rpe: Option<f64>,
  performed_at: DateTime<Utc>,
) -> SetRecord {
  SetRecord {
    id,
    user_id: TEST_USER.to_string(),
    exercise_name: exercise.to_string(),
    workout_id: None,
    weight_kg: weight,
    reps,
    rpe,
    performed_at,
  }
}

pub fn session(
  idx: i64,
  performed_at: DateTime<Utc>,
  total_volume: f64,
  top_set_weight: f64,
  avg_rpe: Option<f64>,
) -> Session {
  Session {
    session_id: format!("session-{}", idx),
    performed_at,
    total_volume,
    top_set_weight,
    top_set_reps: 5,
    avg_rpe,
    reps_distribution: vec![5, 5, 5],
  }
}

/// One session per volume, every other day, the last one a day before `as_of`
pub fn sessions_from_volumes(volumes: &[f64], as_of: DateTime<Utc>) -> Vec<Session> {
  let n = volumes.len();
  volumes
    .iter()
    .enumerate()
    .map(|(i, volume)| {
      let days_ago = 2 * (n - 1 - i) as i64 + 1;
      session(i as i64, as_of - Duration::days(days_ago), *volume, volume / 15.0, None)
    })
    .collect()
}

/// One session every 3 days ending the day before `as_of`, three sets of 5
/// per session at RPE 7, top set starting at 80 kg and rising 2.5 kg each time
pub fn progressing_records(exercise: &str, sessions: usize, as_of: DateTime<Utc>, first_id: i64) -> Vec<SetRecord> {
  let mut records = Vec::new();
  let mut id = first_id;

  for i in 0..sessions {
    let days_ago = 3 * (sessions - 1 - i) as i64 + 1;
    let performed_at = as_of - Duration::days(days_ago);
    let top = 80.0 + 2.5 * i as f64;

    for (set, weight) in [top - 10.0, top - 5.0, top].into_iter().enumerate() {
      records.push(set_record(
        id,
        exercise,
        weight,
        5,
        Some(7.0),
        performed_at + Duration::minutes(5 * set as i64),
      ));
      id += 1;
    }
  }

  records
}

/// Trend with hand-picked metrics; sessions all carry `top_set` with
/// volume `top_set * 15`
pub fn trend_with_metrics(
  exercise: &str,
  metrics: TrendMetrics,
  top_set: f64,
  n_sessions: usize,
) -> ExerciseTrend {
  let as_of = fixed_as_of();
  let sessions = (0..n_sessions)
    .map(|i| {
      let days_ago = 3 * (n_sessions - 1 - i) as i64 + 1;
      session(i as i64, as_of - Duration::days(days_ago), top_set * 15.0, top_set, Some(7.0))
    })
    .collect();

  ExerciseTrend {
    exercise_name: exercise.to_string(),
    lookback_sessions: vec![4, 8, 12],
    sessions,
    metrics,
    rolling: Vec::new(),
    low_sample: false,
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('set_records', 'user_settings')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_history_returns_correct_count() {
    let pool = setup_test_db().await;

    let ids = seed_progressing_history(&pool, TEST_USER, "Bench Press", 4, fixed_as_of()).await;
    assert_eq!(ids.len(), 12);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM set_records")
      .fetch_one(&pool)
      .await
      .expect("Failed to count set records");
    assert_eq!(count, 12);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_sessions_from_volumes_end_before_as_of() {
    let sessions = sessions_from_volumes(&[100.0, 110.0, 120.0], fixed_as_of());
    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions[2].performed_at, fixed_as_of() - Duration::days(1));
    assert!(sessions.windows(2).all(|w| w[0].performed_at < w[1].performed_at));
  }
}

//! Tauri commands for set logging and load suggestions

use chrono::Utc;
use std::sync::Arc;
use tauri::State;

use super::{require, CoachError};
use crate::db::AppState;
use crate::history::{append_set_record, load_exercise_records, load_user_records, load_user_settings};
use crate::models::{AnalysisOutcome, EnrichedSuggestion, NewSetRecord};

/// ---------------------------------------------------------------------------
/// Suggestions
/// ---------------------------------------------------------------------------

/// Ranked suggestions for the exercises the user trains most
#[tauri::command]
pub async fn get_next_workout_suggestions(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  limit: Option<usize>,
) -> Result<Vec<EnrichedSuggestion>, CoachError> {
  let user_id = require("user_id", &user_id)?;
  let limit = limit.unwrap_or(state.service.config().default_limit);
  if limit == 0 {
    return Err(CoachError::InvalidRequest("limit must be at least 1".to_string()));
  }

  let records = load_user_records(&state.db, &user_id).await?;
  let settings = load_user_settings(&state.db, &user_id).await?;

  Ok(
    state
      .service
      .next_workout_suggestions(&user_id, limit, &records, &settings, Utc::now())
      .await,
  )
}

/// Trend and suggestion for one exercise; `no_data` when nothing usable is logged
#[tauri::command]
pub async fn analyze_exercise(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  exercise_name: String,
  lookback: Option<usize>,
) -> Result<AnalysisOutcome, CoachError> {
  let user_id = require("user_id", &user_id)?;
  let exercise_name = require("exercise_name", &exercise_name)?;
  if lookback == Some(0) {
    return Err(CoachError::InvalidRequest("lookback must be at least 1".to_string()));
  }

  let records = load_exercise_records(&state.db, &user_id, &exercise_name).await?;
  let settings = load_user_settings(&state.db, &user_id).await?;

  Ok(
    state
      .service
      .analyze_exercise(&user_id, &exercise_name, lookback, &records, &settings, Utc::now())
      .await,
  )
}

/// Exercise names with at least one valid session, most trained first
#[tauri::command]
pub async fn get_user_exercises(
  state: State<'_, Arc<AppState>>,
  user_id: String,
) -> Result<Vec<String>, CoachError> {
  let user_id = require("user_id", &user_id)?;
  let records = load_user_records(&state.db, &user_id).await?;
  Ok(state.service.user_exercises(&records, Utc::now()))
}

/// ---------------------------------------------------------------------------
/// Set Logging
/// ---------------------------------------------------------------------------

/// Append one performed set and drop cached analyses for that exercise
#[tauri::command]
pub async fn record_set(state: State<'_, Arc<AppState>>, record: NewSetRecord) -> Result<i64, CoachError> {
  let record = NewSetRecord {
    user_id: require("user_id", &record.user_id)?,
    exercise_name: require("exercise_name", &record.exercise_name)?,
    ..record
  };

  let id = append_set_record(&state.db, &record).await?;
  state.service.invalidate(&record.user_id, &record.exercise_name);

  tracing::info!(
    user = %record.user_id,
    exercise = %record.exercise_name,
    id,
    "Recorded set"
  );

  Ok(id)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

//! Tauri commands for per-user analysis settings

use std::sync::Arc;
use tauri::State;

use super::{require, CoachError};
use crate::analysis::UserSettings;
use crate::db::AppState;
use crate::history::{load_user_settings, save_user_settings};

#[tauri::command]
pub async fn get_user_settings(
  state: State<'_, Arc<AppState>>,
  user_id: String,
) -> Result<UserSettings, CoachError> {
  let user_id = require("user_id", &user_id)?;
  Ok(load_user_settings(&state.db, &user_id).await?)
}

/// Update the given fields, keeping the rest; returns the stored settings
#[tauri::command]
pub async fn update_user_settings(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  exercise_sessions_per_week: Option<f64>,
  load_increment_kg: Option<f64>,
) -> Result<UserSettings, CoachError> {
  let user_id = require("user_id", &user_id)?;
  positive("exercise_sessions_per_week", exercise_sessions_per_week)?;
  positive("load_increment_kg", load_increment_kg)?;

  let mut settings = load_user_settings(&state.db, &user_id).await?;
  if exercise_sessions_per_week.is_some() {
    settings.exercise_sessions_per_week = exercise_sessions_per_week;
  }
  if let Some(increment) = load_increment_kg {
    settings.load_increment_kg = increment;
  }

  save_user_settings(&state.db, &user_id, &settings).await?;
  state.service.invalidate_user(&user_id);
  tracing::info!(user = %user_id, ?settings, "Updated user settings");

  Ok(settings)
}

fn positive(field: &str, value: Option<f64>) -> Result<(), CoachError> {
  match value {
    Some(v) if !(v > 0.0 && v.is_finite()) => Err(CoachError::InvalidRequest(format!(
      "{} must be a positive number",
      field
    ))),
    _ => Ok(()),
  }
}

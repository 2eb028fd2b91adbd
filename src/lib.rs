mod analysis;
mod cache;
mod coaching;
mod commands;
mod config;
mod db;
mod exercises;
mod history;
mod llm;
mod models;
mod progression;
mod sessions;
mod suggestions;

#[cfg(test)]
mod test_utils;

use config::CoachConfig;
use db::AppState;
use std::sync::Arc;
use suggestions::SuggestionService;
use tauri::Manager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "overload_coach_lib=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  tauri::Builder::default()
    .setup(|app| {
      let config = CoachConfig::from_env()?;

      let app_handle = app.handle().clone();
      tauri::async_runtime::block_on(async move {
        match db::initialize_db(&app_handle).await {
          Ok(pool) => {
            let state = Arc::new(AppState {
              db: pool,
              service: SuggestionService::from_config(config),
            });
            app_handle.manage(state);
            tracing::info!("Database ready");
          }
          Err(e) => {
            tracing::error!(error = %e, "Failed to initialize database");
          }
        }
      });
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      commands::suggestions::get_next_workout_suggestions,
      commands::suggestions::analyze_exercise,
      commands::suggestions::get_user_exercises,
      commands::suggestions::record_set,
      commands::settings::get_user_settings,
      commands::settings::update_user_settings,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}

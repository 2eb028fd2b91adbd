pub mod settings;
pub mod suggestions;

use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Failures that cross the IPC boundary. Missing data is never one of them.
#[derive(Debug, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum CoachError {
  #[error("Invalid request: {0}")]
  InvalidRequest(String),

  #[error("Database error: {0}")]
  Database(String),
}

impl From<sqlx::Error> for CoachError {
  fn from(e: sqlx::Error) -> Self {
    CoachError::Database(e.to_string())
  }
}

/// Trimmed, non-empty identifier or an `InvalidRequest`
pub(crate) fn require(field: &str, value: &str) -> Result<String, CoachError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(CoachError::InvalidRequest(format!("{} must not be empty", field)));
  }
  Ok(trimmed.to_string())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One performed set, as stored in the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SetRecord {
  pub id: i64,
  pub user_id: String,
  pub exercise_name: String,
  /// Explicit training-bout identifier, when the caller supplies one
  pub workout_id: Option<String>,
  pub weight_kg: f64,
  pub reps: i64,
  pub rpe: Option<f64>,
  pub performed_at: DateTime<Utc>,
}

impl SetRecord {
  /// Records with non-positive (or NaN) weight or reps cannot be aggregated
  pub fn is_well_formed(&self) -> bool {
    self.weight_kg > 0.0 && self.weight_kg.is_finite() && self.reps > 0
  }

  pub fn volume(&self) -> f64 {
    self.weight_kg * self.reps as f64
  }

  /// RPE outside 1-10 is treated as not recorded
  pub fn valid_rpe(&self) -> Option<f64> {
    self.rpe.filter(|r| (1.0..=10.0).contains(r))
  }
}

/// For appending new set records (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSetRecord {
  pub user_id: String,
  pub exercise_name: String,
  pub workout_id: Option<String>,
  pub weight_kg: f64,
  pub reps: i64,
  pub rpe: Option<f64>,
  pub performed_at: DateTime<Utc>,
}

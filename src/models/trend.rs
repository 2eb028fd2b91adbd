use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All sets of one exercise performed within one training bout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub session_id: String,
  /// Start of the session (earliest set)
  pub performed_at: DateTime<Utc>,
  pub total_volume: f64,
  pub top_set_weight: f64,
  /// Reps of the top set, used for the tie-break on equal weight
  pub top_set_reps: i64,
  pub avg_rpe: Option<f64>,
  /// Rep counts in performance order, one per set
  pub reps_distribution: Vec<i64>,
}

/// Slope and consistency metrics over the lookback window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendMetrics {
  /// OLS slope of total volume per session index
  pub volume_slope: f64,
  /// OLS slope of top-set weight per session index
  pub top_set_slope: f64,
  /// OLS slope of average RPE per session index (sessions without RPE excluded)
  pub rpe_trend: f64,
  /// Achieved vs expected session frequency, 0.0 - 1.0
  pub consistency: f64,
}

/// Averages over the most recent `window_size` sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowSummary {
  pub window_size: usize,
  /// Sessions actually in the window (may be < window_size)
  pub occurrences: usize,
  pub avg_total_volume: f64,
  pub avg_top_set_weight: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avg_rpe: Option<f64>,
  /// Percent change of avg volume vs the preceding window of the same size
  #[serde(skip_serializing_if = "Option::is_none")]
  pub volume_pct_change: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub top_set_pct_change: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_performed_at: Option<DateTime<Utc>>,
}

/// Derived, read-only view of an exercise's recent trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTrend {
  pub exercise_name: String,
  /// Reporting window sizes, ascending (e.g. [4, 8, 12])
  pub lookback_sessions: Vec<usize>,
  /// Sessions within the lookback, ascending by time
  pub sessions: Vec<Session>,
  pub metrics: TrendMetrics,
  pub rolling: Vec<RollingWindowSummary>,
  /// Fewer than two sessions: metrics are neutral
  pub low_sample: bool,
}

impl ExerciseTrend {
  pub fn session_count(&self) -> usize {
    self.sessions.len()
  }

  /// Top-set weight of the most recent session
  pub fn current_top_set(&self) -> Option<f64> {
    self.sessions.last().map(|s| s.top_set_weight)
  }

  pub fn mean_volume(&self) -> f64 {
    if self.sessions.is_empty() {
      return 0.0;
    }
    self.sessions.iter().map(|s| s.total_volume).sum::<f64>() / self.sessions.len() as f64
  }
}

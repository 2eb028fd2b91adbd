//! Deterministic analysis layer for exercise trends
//!
//! This module computes trend metrics from aggregated sessions.
//! The rule engine and any cue generator interpret these pre-computed numbers
//! rather than doing math themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExerciseTrend, RollingWindowSummary, Session, TrendMetrics};

/// ---------------------------------------------------------------------------
/// User Settings (needed for metric calculations)
/// ---------------------------------------------------------------------------

pub const DEFAULT_LOAD_INCREMENT_KG: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
  /// Typical sessions per week for a given exercise; consistency baseline
  pub exercise_sessions_per_week: Option<f64>,
  /// Smallest practical load change (plate pair)
  pub load_increment_kg: f64,
}

impl Default for UserSettings {
  fn default() -> Self {
    Self {
      exercise_sessions_per_week: None,
      load_increment_kg: DEFAULT_LOAD_INCREMENT_KG,
    }
  }
}

impl UserSettings {
  /// Frequency baseline, ignoring non-positive values
  pub fn frequency_baseline(&self) -> Option<f64> {
    self.exercise_sessions_per_week.filter(|f| *f > 0.0 && f.is_finite())
  }

  /// Load increment, falling back to 2.5 kg if unset or invalid
  pub fn effective_increment(&self) -> f64 {
    if self.load_increment_kg > 0.0 && self.load_increment_kg.is_finite() {
      self.load_increment_kg
    } else {
      DEFAULT_LOAD_INCREMENT_KG
    }
  }
}

/// ---------------------------------------------------------------------------
/// Trend Window Parameters
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
  /// Most recent N sessions used for slopes and consistency
  pub lookback: usize,
  /// Reporting window sizes
  pub window_sizes: Vec<usize>,
}

impl TrendWindow {
  pub fn new(lookback: usize, window_sizes: &[usize]) -> Self {
    let mut window_sizes: Vec<usize> = window_sizes.iter().copied().filter(|w| *w > 0).collect();
    window_sizes.sort_unstable();
    window_sizes.dedup();
    Self {
      lookback: lookback.max(1),
      window_sizes,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Least Squares
/// ---------------------------------------------------------------------------

/// Ordinary least-squares slope of y over x; 0.0 for fewer than two points
/// or zero variance in x
pub fn ols_slope(points: &[(f64, f64)]) -> f64 {
  if points.len() < 2 {
    return 0.0;
  }

  let n = points.len() as f64;
  let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
  let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

  let mut covariance = 0.0;
  let mut x_variance = 0.0;
  for (x, y) in points {
    covariance += (x - x_mean) * (y - y_mean);
    x_variance += (x - x_mean).powi(2);
  }

  if x_variance == 0.0 {
    0.0
  } else {
    covariance / x_variance
  }
}

/// ---------------------------------------------------------------------------
/// Exercise Trend
/// ---------------------------------------------------------------------------

impl ExerciseTrend {
  /// Compute the trend for one exercise from its ascending session history
  ///
  /// Slopes use the ordinal session index as x, not wall-clock time.
  /// Fewer than two sessions in the lookback yields neutral metrics and
  /// `low_sample = true`.
  pub fn compute(
    exercise_name: &str,
    history: &[Session],
    window: &TrendWindow,
    settings: &UserSettings,
    as_of: DateTime<Utc>,
  ) -> Self {
    let start = history.len().saturating_sub(window.lookback);
    let sessions = history[start..].to_vec();
    let low_sample = sessions.len() < 2;

    let metrics = if low_sample {
      TrendMetrics::default()
    } else {
      TrendMetrics {
        volume_slope: index_slope(&sessions, |s| Some(s.total_volume)),
        top_set_slope: index_slope(&sessions, |s| Some(s.top_set_weight)),
        rpe_trend: index_slope(&sessions, |s| s.avg_rpe),
        consistency: compute_consistency(&sessions, window.lookback, settings.frequency_baseline(), as_of),
      }
    };

    let rolling = window
      .window_sizes
      .iter()
      .map(|size| RollingWindowSummary::compute(history, *size))
      .collect();

    Self {
      exercise_name: exercise_name.to_string(),
      lookback_sessions: window.window_sizes.clone(),
      sessions,
      metrics,
      rolling,
      low_sample,
    }
  }
}

/// Slope of `metric` against session index; sessions where it is absent are
/// left out but keep their index
fn index_slope<F>(sessions: &[Session], metric: F) -> f64
where
  F: Fn(&Session) -> Option<f64>,
{
  let points: Vec<(f64, f64)> = sessions
    .iter()
    .enumerate()
    .filter_map(|(i, s)| metric(s).map(|y| (i as f64, y)))
    .collect();
  ols_slope(&points)
}

/// Sessions performed vs sessions expected over the lookback's calendar span
///
/// With a frequency baseline, the span runs from the first session in the
/// window to `as_of` (at least one week). Without one, falls back to
/// `session_count / lookback`. Always within [0, 1].
pub fn compute_consistency(
  sessions: &[Session],
  lookback: usize,
  sessions_per_week: Option<f64>,
  as_of: DateTime<Utc>,
) -> f64 {
  let Some(first) = sessions.first() else {
    return 0.0;
  };
  let count = sessions.len() as f64;

  let ratio = match sessions_per_week {
    Some(per_week) => {
      let span_days = (as_of.date_naive() - first.performed_at.date_naive()).num_days() + 1;
      let expected = per_week * span_days.max(7) as f64 / 7.0;
      count / expected
    }
    None => count / lookback.max(1) as f64,
  };

  ratio.clamp(0.0, 1.0)
}

/// ---------------------------------------------------------------------------
/// Rolling Windows
/// ---------------------------------------------------------------------------

impl RollingWindowSummary {
  /// Summarize the most recent `window_size` sessions of `history`, compared
  /// with the `window_size` sessions immediately before them
  pub fn compute(history: &[Session], window_size: usize) -> Self {
    let n = history.len();
    let recent_start = n.saturating_sub(window_size);
    let previous_start = recent_start.saturating_sub(window_size);

    let recent = &history[recent_start..];
    let previous = &history[previous_start..recent_start];

    let avg_total_volume = mean(recent.iter().map(|s| s.total_volume));
    let avg_top_set_weight = mean(recent.iter().map(|s| s.top_set_weight));

    let volume_pct_change = pct_change(mean(previous.iter().map(|s| s.total_volume)), avg_total_volume, previous);
    let top_set_pct_change = pct_change(
      mean(previous.iter().map(|s| s.top_set_weight)),
      avg_top_set_weight,
      previous,
    );

    let rpes: Vec<f64> = recent.iter().filter_map(|s| s.avg_rpe).collect();
    let avg_rpe = if rpes.is_empty() {
      None
    } else {
      Some(mean(rpes.iter().copied()))
    };

    Self {
      window_size,
      occurrences: recent.len(),
      avg_total_volume,
      avg_top_set_weight,
      avg_rpe,
      volume_pct_change,
      top_set_pct_change,
      last_performed_at: recent.last().map(|s| s.performed_at),
    }
  }
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
  let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  if count == 0 {
    0.0
  } else {
    sum / count as f64
  }
}

fn pct_change(before: f64, after: f64, previous: &[Session]) -> Option<f64> {
  if previous.is_empty() || before <= 0.0 {
    return None;
  }
  Some(((after - before) / before) * 100.0)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{session, sessions_from_volumes};
  use chrono::{Duration, TimeZone};

  fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
  }

  #[test]
  fn test_ols_slope_exact_for_linear_volumes() {
    let points = [(0.0, 100.0), (1.0, 110.0), (2.0, 120.0), (3.0, 130.0)];
    assert_eq!(ols_slope(&points), 10.0);
  }

  #[test]
  fn test_ols_slope_degenerate_inputs() {
    assert_eq!(ols_slope(&[]), 0.0);
    assert_eq!(ols_slope(&[(0.0, 5.0)]), 0.0);
    assert_eq!(ols_slope(&[(1.0, 5.0), (1.0, 9.0)]), 0.0);
  }

  #[test]
  fn test_volume_slope_from_sessions() {
    let history = sessions_from_volumes(&[100.0, 110.0, 120.0, 130.0], as_of());
    let trend = ExerciseTrend::compute(
      "Bench Press",
      &history,
      &TrendWindow::new(12, &[4, 8, 12]),
      &UserSettings::default(),
      as_of(),
    );

    assert!(!trend.low_sample);
    assert_eq!(trend.metrics.volume_slope, 10.0);
    assert_eq!(trend.sessions.len(), 4);
  }

  #[test]
  fn test_lookback_keeps_most_recent_sessions() {
    let history = sessions_from_volumes(&[500.0, 400.0, 100.0, 110.0, 120.0, 130.0], as_of());
    let trend = ExerciseTrend::compute(
      "Bench Press",
      &history,
      &TrendWindow::new(4, &[4]),
      &UserSettings::default(),
      as_of(),
    );

    assert_eq!(trend.sessions.len(), 4);
    assert_eq!(trend.sessions[0].total_volume, 100.0);
    assert_eq!(trend.metrics.volume_slope, 10.0);
  }

  #[test]
  fn test_single_session_is_low_sample_with_neutral_metrics() {
    let history = sessions_from_volumes(&[900.0], as_of());
    let trend = ExerciseTrend::compute(
      "Squat",
      &history,
      &TrendWindow::new(12, &[4, 8, 12]),
      &UserSettings::default(),
      as_of(),
    );

    assert!(trend.low_sample);
    assert_eq!(trend.metrics, TrendMetrics::default());
  }

  #[test]
  fn test_rpe_trend_skips_sessions_without_rpe() {
    let base = as_of() - Duration::days(20);
    let history = vec![
      session(0, base, 1000.0, 80.0, Some(7.0)),
      session(1, base + Duration::days(3), 1000.0, 80.0, None),
      session(2, base + Duration::days(6), 1000.0, 80.0, Some(8.0)),
    ];

    let trend = ExerciseTrend::compute(
      "Bench Press",
      &history,
      &TrendWindow::new(12, &[4]),
      &UserSettings::default(),
      as_of(),
    );

    // Points (0, 7) and (2, 8): slope 0.5 per session
    assert_eq!(trend.metrics.rpe_trend, 0.5);
    assert_eq!(trend.metrics.volume_slope, 0.0);
  }

  #[test]
  fn test_consistency_bounds() {
    assert_eq!(compute_consistency(&[], 12, None, as_of()), 0.0);
    assert_eq!(compute_consistency(&[], 12, Some(3.0), as_of()), 0.0);

    // 12 sessions in about three weeks against a 1/week baseline: capped at 1
    let crowded = sessions_from_volumes(&[100.0; 12], as_of());
    let c = compute_consistency(&crowded, 12, Some(1.0), as_of());
    assert_eq!(c, 1.0);

    // Fallback: 6 of 12
    let half = sessions_from_volumes(&[100.0; 6], as_of());
    assert_eq!(compute_consistency(&half, 12, None, as_of()), 0.5);
  }

  #[test]
  fn test_consistency_with_frequency_baseline() {
    // 4 sessions spread over 28 days at an expected 2/week = 8 expected
    let start = as_of() - Duration::days(27);
    let history: Vec<Session> = (0..4)
      .map(|i| session(i, start + Duration::days(i * 7), 1000.0, 80.0, None))
      .collect();

    let c = compute_consistency(&history, 12, Some(2.0), as_of());
    assert!((c - 0.5).abs() < 1e-9);
  }

  #[test]
  fn test_rolling_window_pct_change() {
    let history = sessions_from_volumes(&[100.0, 100.0, 120.0, 120.0], as_of());
    let summary = RollingWindowSummary::compute(&history, 2);

    assert_eq!(summary.occurrences, 2);
    assert_eq!(summary.avg_total_volume, 120.0);
    assert_eq!(summary.volume_pct_change, Some(20.0));
  }

  #[test]
  fn test_rolling_window_larger_than_history() {
    let history = sessions_from_volumes(&[100.0, 200.0], as_of());
    let summary = RollingWindowSummary::compute(&history, 12);

    assert_eq!(summary.occurrences, 2);
    assert_eq!(summary.avg_total_volume, 150.0);
    assert_eq!(summary.volume_pct_change, None);
  }

  #[test]
  fn test_trend_is_deterministic() {
    let history = sessions_from_volumes(&[1000.0, 1040.0, 990.0, 1100.0, 1120.0], as_of());
    let window = TrendWindow::new(12, &[4, 8, 12]);
    let a = ExerciseTrend::compute("Deadlift", &history, &window, &UserSettings::default(), as_of());
    let b = ExerciseTrend::compute("Deadlift", &history, &window, &UserSettings::default(), as_of());
    assert_eq!(a, b);
    assert_eq!(a.metrics.volume_slope.to_bits(), b.metrics.volume_slope.to_bits());
  }

  #[test]
  fn test_window_sizes_are_normalized() {
    let window = TrendWindow::new(0, &[12, 4, 0, 8, 4]);
    assert_eq!(window.lookback, 1);
    assert_eq!(window.window_sizes, vec![4, 8, 12]);
  }
}

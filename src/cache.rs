//! Read-through memo of single-exercise analyses
//!
//! One slot per (user, exercise). A slot is served only when every input
//! behind it matches: record-log fingerprint, settings, lookback and day.
//! Storing a newer analysis replaces the slot, and `invalidate` drops slots
//! eagerly on append or settings change. A poisoned lock is treated as a miss.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::analysis::UserSettings;
use crate::exercises::normalize_name;
use crate::history::LogFingerprint;
use crate::models::ExerciseAnalysis;

/// Bit-exact copy of the settings an analysis was computed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingsFingerprint {
  sessions_per_week: Option<u64>,
  load_increment: u64,
}

impl SettingsFingerprint {
  pub fn of(settings: &UserSettings) -> Self {
    Self {
      sessions_per_week: settings.frequency_baseline().map(f64::to_bits),
      load_increment: settings.effective_increment().to_bits(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub user_id: String,
  /// Normalized exercise name
  pub exercise: String,
  pub fingerprint: LogFingerprint,
  pub settings: SettingsFingerprint,
  pub lookback: usize,
  pub as_of: NaiveDate,
}

impl CacheKey {
  pub fn new(
    user_id: &str,
    exercise_name: &str,
    fingerprint: LogFingerprint,
    settings: &UserSettings,
    lookback: usize,
    as_of: NaiveDate,
  ) -> Self {
    Self {
      user_id: user_id.to_string(),
      exercise: normalize_name(exercise_name),
      fingerprint,
      settings: SettingsFingerprint::of(settings),
      lookback,
      as_of,
    }
  }

  fn slot(&self) -> (String, String) {
    (self.user_id.clone(), self.exercise.clone())
  }
}

#[derive(Debug, Default)]
pub struct AnalysisCache {
  slots: RwLock<HashMap<(String, String), (CacheKey, ExerciseAnalysis)>>,
}

impl AnalysisCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &CacheKey) -> Option<ExerciseAnalysis> {
    let slots = self.slots.read().ok()?;
    let (stored, analysis) = slots.get(&key.slot())?;
    (stored == key).then(|| analysis.clone())
  }

  /// Store `analysis`, replacing whatever the (user, exercise) slot held
  pub fn insert(&self, key: CacheKey, analysis: ExerciseAnalysis) {
    if let Ok(mut slots) = self.slots.write() {
      slots.insert(key.slot(), (key, analysis));
    }
  }

  /// Drop the slot for (user, exercise)
  pub fn invalidate(&self, user_id: &str, exercise_name: &str) {
    let exercise = normalize_name(exercise_name);
    if let Ok(mut slots) = self.slots.write() {
      if slots.remove(&(user_id.to_string(), exercise.clone())).is_some() {
        tracing::debug!(user = user_id, exercise = %exercise, "Invalidated cached analysis");
      }
    }
  }

  /// Drop every slot belonging to `user_id`
  pub fn invalidate_user(&self, user_id: &str) {
    if let Ok(mut slots) = self.slots.write() {
      let before = slots.len();
      slots.retain(|(user, _), _| user != user_id);
      let dropped = before - slots.len();
      if dropped > 0 {
        tracing::debug!(user = user_id, dropped, "Invalidated cached analyses for user");
      }
    }
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.slots.read().map(|s| s.len()).unwrap_or(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{CueSource, EnrichedSuggestion, OverloadSuggestion, Recommendation, TrendMetrics};
  use crate::test_utils::{fixed_as_of, trend_with_metrics};
  use chrono::Duration;

  fn analysis() -> ExerciseAnalysis {
    let suggestion = OverloadSuggestion::new(Recommendation::Maintain, 0.0, "hold".to_string(), 0.5);
    ExerciseAnalysis {
      trend: trend_with_metrics("Squat", TrendMetrics::default(), 100.0, 3),
      suggestion: EnrichedSuggestion {
        exercise_name: "Squat".to_string(),
        suggestion_type: "Maintain".to_string(),
        action: suggestion.action(),
        is_recovery: false,
        cue_source: CueSource::Template,
        suggestion,
      },
      skipped_records: 0,
    }
  }

  fn fingerprint(count: usize) -> LogFingerprint {
    LogFingerprint {
      record_count: count,
      last_record_id: count as i64,
    }
  }

  fn key(user: &str, exercise: &str, count: usize) -> CacheKey {
    CacheKey::new(
      user,
      exercise,
      fingerprint(count),
      &UserSettings::default(),
      12,
      fixed_as_of().date_naive(),
    )
  }

  #[test]
  fn test_hit_requires_matching_fingerprint() {
    let cache = AnalysisCache::new();
    cache.insert(key("u1", "Squat", 3), analysis());

    assert!(cache.get(&key("u1", "squat", 3)).is_some());
    assert!(cache.get(&key("u1", "Squat", 4)).is_none());
    assert!(cache.get(&key("u2", "Squat", 3)).is_none());
  }

  #[test]
  fn test_hit_requires_matching_settings() {
    let cache = AnalysisCache::new();
    cache.insert(key("u1", "Squat", 3), analysis());

    let frequent = UserSettings {
      exercise_sessions_per_week: Some(7.0),
      load_increment_kg: 5.0,
    };
    let other = CacheKey::new("u1", "Squat", fingerprint(3), &frequent, 12, fixed_as_of().date_naive());

    assert!(cache.get(&other).is_none());
    assert!(cache.get(&key("u1", "Squat", 3)).is_some());
  }

  #[test]
  fn test_one_slot_per_exercise_across_days_and_lookbacks() {
    let cache = AnalysisCache::new();
    let start = fixed_as_of().date_naive();

    for day in 0..30 {
      for lookback in [4, 6, 8, 10, 12] {
        let as_of = start + Duration::days(day);
        let key = CacheKey::new("u1", "Squat", fingerprint(3), &UserSettings::default(), lookback, as_of);
        cache.insert(key, analysis());
      }
    }

    assert_eq!(cache.len(), 1);
    let latest = CacheKey::new(
      "u1",
      "Squat",
      fingerprint(3),
      &UserSettings::default(),
      12,
      start + Duration::days(29),
    );
    assert!(cache.get(&latest).is_some());
    assert!(cache.get(&key("u1", "Squat", 3)).is_none());
  }

  #[test]
  fn test_invalidate_is_scoped_to_user_and_exercise() {
    let cache = AnalysisCache::new();
    cache.insert(key("u1", "Squat", 3), analysis());
    cache.insert(key("u1", "Bench Press", 3), analysis());
    cache.insert(key("u2", "Squat", 3), analysis());

    cache.invalidate("u1", "SQUAT");

    assert_eq!(cache.len(), 2);
    assert!(cache.get(&key("u1", "Squat", 3)).is_none());
    assert!(cache.get(&key("u2", "Squat", 3)).is_some());
  }

  #[test]
  fn test_invalidate_user_keeps_other_users() {
    let cache = AnalysisCache::new();
    cache.insert(key("u1", "Squat", 3), analysis());
    cache.insert(key("u1", "Bench Press", 3), analysis());
    cache.insert(key("u2", "Squat", 3), analysis());

    cache.invalidate_user("u1");

    assert_eq!(cache.len(), 1);
    assert!(cache.get(&key("u2", "Squat", 3)).is_some());
  }
}

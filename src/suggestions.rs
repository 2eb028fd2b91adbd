//! Suggestion orchestration
//!
//! Runs aggregation -> trend -> rule engine -> enrichment for one exercise on
//! demand, or for a ranked batch of candidate exercises for the next workout.
//! Works on a record snapshot handed in by the caller and performs no writes.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;

use crate::analysis::{TrendWindow, UserSettings};
use crate::cache::{AnalysisCache, CacheKey};
use crate::coaching::{ClaudeCues, SuggestionEnricher};
use crate::config::{CoachConfig, CueBackend};
use crate::exercises::normalize_name;
use crate::history::{group_by_exercise, ExerciseLog, LogFingerprint};
use crate::llm::ClaudeClient;
use crate::models::{AnalysisOutcome, CueSource, EnrichedSuggestion, ExerciseAnalysis, ExerciseTrend, SetRecord};
use crate::progression::OverloadEngine;
use crate::sessions::aggregate_sessions;

/// ---------------------------------------------------------------------------
/// Candidate Selection
/// ---------------------------------------------------------------------------

/// An exercise eligible for the batch view
struct Candidate {
  log: ExerciseLog,
  /// Sessions inside the candidate window
  recent_sessions: usize,
  last_performed_at: DateTime<Utc>,
}

/// Most sessions in the window first, then most recently trained, then name
fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
  b.recent_sessions
    .cmp(&a.recent_sessions)
    .then_with(|| b.last_performed_at.cmp(&a.last_performed_at))
    .then_with(|| a.log.exercise_name.cmp(&b.log.exercise_name))
}

/// Highest confidence first; ties surface recovery and increases before deload and maintain
fn rank_order(a: &EnrichedSuggestion, b: &EnrichedSuggestion) -> Ordering {
  b.confidence()
    .total_cmp(&a.confidence())
    .then_with(|| a.recommendation().priority().cmp(&b.recommendation().priority()))
    .then_with(|| a.exercise_name.cmp(&b.exercise_name))
}

/// ---------------------------------------------------------------------------
/// Suggestion Service
/// ---------------------------------------------------------------------------

pub struct SuggestionService {
  config: CoachConfig,
  engine: OverloadEngine,
  enricher: SuggestionEnricher,
  cache: AnalysisCache,
}

impl SuggestionService {
  pub fn new(config: CoachConfig, enricher: SuggestionEnricher) -> Self {
    Self {
      engine: OverloadEngine::new(config.thresholds.clone()),
      config,
      enricher,
      cache: AnalysisCache::new(),
    }
  }

  /// Build the service with the cue backend named in `config`
  ///
  /// A Claude backend without an API key degrades to templates.
  pub fn from_config(config: CoachConfig) -> Self {
    let enricher = match config.cue_backend {
      CueBackend::Template => SuggestionEnricher::templates(),
      CueBackend::Claude => match ClaudeClient::from_env() {
        Ok(client) => SuggestionEnricher::with_provider(Arc::new(ClaudeCues::new(client)), config.enrichment_timeout),
        Err(e) => {
          tracing::warn!(error = %e, "Claude cue backend unavailable, using templates");
          SuggestionEnricher::templates()
        }
      },
    };

    tracing::info!(
      lookback = config.lookback_sessions,
      grouping = ?config.session_grouping,
      generative = enricher.is_generative(),
      "Suggestion service ready"
    );

    Self::new(config, enricher)
  }

  pub fn config(&self) -> &CoachConfig {
    &self.config
  }

  /// Drop cached analyses after new records land for (user, exercise)
  pub fn invalidate(&self, user_id: &str, exercise_name: &str) {
    self.cache.invalidate(user_id, exercise_name);
  }

  /// Drop every cached analysis for `user_id` after a settings change
  pub fn invalidate_user(&self, user_id: &str) {
    self.cache.invalidate_user(user_id);
  }

  /// Analyze exactly one exercise
  ///
  /// `records` may hold the user's whole log; only records whose normalized
  /// name matches `exercise_name` are used. No valid sessions yields
  /// `AnalysisOutcome::NoData`.
  pub async fn analyze_exercise(
    &self,
    user_id: &str,
    exercise_name: &str,
    lookback: Option<usize>,
    records: &[SetRecord],
    settings: &UserSettings,
    as_of: DateTime<Utc>,
  ) -> AnalysisOutcome {
    let key_name = normalize_name(exercise_name);
    let matching: Vec<SetRecord> = records
      .iter()
      .filter(|r| normalize_name(&r.exercise_name) == key_name)
      .cloned()
      .collect();

    let window = TrendWindow::new(lookback.unwrap_or(self.config.lookback_sessions), &self.config.window_sizes);
    let key = CacheKey::new(
      user_id,
      exercise_name,
      LogFingerprint::of(&matching),
      settings,
      window.lookback,
      as_of.date_naive(),
    );

    if let Some(cached) = self.cache.get(&key) {
      tracing::debug!(user = user_id, exercise = %key_name, "Analysis cache hit");
      return AnalysisOutcome::Analyzed(cached);
    }

    let aggregation = aggregate_sessions(&matching, self.config.session_grouping);
    if aggregation.sessions.is_empty() {
      tracing::info!(
        user = user_id,
        exercise = exercise_name,
        skipped_records = aggregation.skipped_records,
        "No sessions to analyze"
      );
      return AnalysisOutcome::NoData {
        exercise_name: exercise_name.trim().to_string(),
        skipped_records: aggregation.skipped_records,
      };
    }

    let display_name = matching
      .iter()
      .max_by(|a, b| a.performed_at.cmp(&b.performed_at).then_with(|| a.id.cmp(&b.id)))
      .map(|r| r.exercise_name.trim().to_string())
      .unwrap_or_else(|| exercise_name.trim().to_string());

    let trend = ExerciseTrend::compute(&display_name, &aggregation.sessions, &window, settings, as_of);
    let base = self.engine.suggest(&trend, settings);
    let suggestion = self.enricher.enrich(base, &trend).await;

    tracing::debug!(
      user = user_id,
      exercise = %display_name,
      recommendation = %suggestion.recommendation(),
      confidence = suggestion.confidence(),
      cue_source = ?suggestion.cue_source,
      "Analyzed exercise"
    );

    let analysis = ExerciseAnalysis {
      trend,
      suggestion,
      skipped_records: aggregation.skipped_records,
    };

    // A fallback means the generative source was down; retry it next time
    if analysis.suggestion.cue_source != CueSource::Fallback {
      self.cache.insert(key, analysis.clone());
    }

    AnalysisOutcome::Analyzed(analysis)
  }

  /// Ranked suggestions for up to `limit` candidate exercises
  pub async fn next_workout_suggestions(
    &self,
    user_id: &str,
    limit: usize,
    records: &[SetRecord],
    settings: &UserSettings,
    as_of: DateTime<Utc>,
  ) -> Vec<EnrichedSuggestion> {
    let candidates: Vec<Candidate> = self.candidates(records, as_of).into_iter().take(limit).collect();

    let analyses = join_all(candidates.iter().map(|c| {
      self.analyze_exercise(user_id, &c.log.exercise_name, None, &c.log.records, settings, as_of)
    }))
    .await;

    let mut suggestions: Vec<EnrichedSuggestion> = analyses
      .into_iter()
      .filter_map(|outcome| match outcome {
        AnalysisOutcome::Analyzed(analysis) => Some(analysis.suggestion),
        AnalysisOutcome::NoData { .. } => None,
      })
      .collect();
    suggestions.sort_by(rank_order);

    tracing::info!(
      user = user_id,
      candidates = candidates.len(),
      suggestions = suggestions.len(),
      "Built next workout suggestions"
    );

    suggestions
  }

  /// Exercise names with at least one valid session, in candidate order
  pub fn user_exercises(&self, records: &[SetRecord], as_of: DateTime<Utc>) -> Vec<String> {
    self
      .candidates(records, as_of)
      .into_iter()
      .map(|c| c.log.exercise_name)
      .collect()
  }

  /// Exercises with valid sessions, ordered for selection; exercises trained
  /// only before the candidate window rank after every recent one
  fn candidates(&self, records: &[SetRecord], as_of: DateTime<Utc>) -> Vec<Candidate> {
    let window_start = Duration::try_days(self.config.candidate_window_days)
      .and_then(|window| as_of.checked_sub_signed(window))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut candidates: Vec<Candidate> = group_by_exercise(records)
      .into_iter()
      .filter_map(|log| {
        let sessions = aggregate_sessions(&log.records, self.config.session_grouping).sessions;
        let last_performed_at = sessions.last()?.performed_at;
        let recent_sessions = sessions
          .iter()
          .filter(|s| s.performed_at >= window_start && s.performed_at <= as_of)
          .count();
        Some(Candidate {
          log,
          recent_sessions,
          last_performed_at,
        })
      })
      .collect();

    candidates.sort_by(candidate_order);
    candidates
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

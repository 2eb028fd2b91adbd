//! Suggestion enrichment: rationale and coaching cues
//!
//! Cue sources implement [`CueProvider`]. The enricher calls the configured
//! provider under a timeout and falls back to the static templates on any
//! failure, so the rule engine's recommendation, delta and confidence always
//! reach the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::llm::{ClaudeClient, LlmError};
use crate::models::{CueSource, EnrichedSuggestion, ExerciseTrend, OverloadSuggestion, Recommendation};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CueError {
  #[error("Cue source unavailable: {0}")]
  Unavailable(String),

  #[error("Cue source timed out after {0:?}")]
  Timeout(Duration),

  #[error(transparent)]
  Llm(#[from] LlmError),
}

/// ---------------------------------------------------------------------------
/// Cue Provider Capability
/// ---------------------------------------------------------------------------

/// Rationale plus ordered coaching cues for one suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct Coaching {
  pub rationale: String,
  pub coaching_cues: Vec<String>,
}

/// A source of rationale and cues for a decided suggestion
#[async_trait]
pub trait CueProvider: Send + Sync {
  async fn coaching(&self, suggestion: &OverloadSuggestion, trend: &ExerciseTrend) -> Result<Coaching, CueError>;
}

/// ---------------------------------------------------------------------------
/// Static Templates
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCues;

impl TemplateCues {
  pub fn cues_for(recommendation: Recommendation) -> Vec<String> {
    let cues: &[&str] = match recommendation {
      Recommendation::IncreaseLoad => &[
        "Brace your core before every rep",
        "Keep a controlled 2-second lowering tempo",
        "Own the new weight before chasing more reps",
      ],
      Recommendation::Maintain => &[
        "Repeat last session's numbers with cleaner reps",
        "Keep rest periods consistent between sets",
        "Show up for every planned session this week",
      ],
      Recommendation::Deload => &[
        "Cut working sets by about a third",
        "Leave two or three reps in reserve",
        "Use the lighter load to groove technique",
      ],
      Recommendation::Recovery => &[
        "Prioritize 7-9 hours of sleep",
        "Hydrate well before and after training",
        "Keep effort easy and focus on technique",
      ],
    };
    cues.iter().map(|c| c.to_string()).collect()
  }

  fn template_coaching(suggestion: &OverloadSuggestion) -> Coaching {
    Coaching {
      rationale: suggestion.rationale.clone(),
      coaching_cues: Self::cues_for(suggestion.recommendation),
    }
  }
}

#[async_trait]
impl CueProvider for TemplateCues {
  async fn coaching(&self, suggestion: &OverloadSuggestion, _trend: &ExerciseTrend) -> Result<Coaching, CueError> {
    Ok(Self::template_coaching(suggestion))
  }
}

/// ---------------------------------------------------------------------------
/// Claude-Generated Cues
/// ---------------------------------------------------------------------------

/// Context sent to Claude: the decided suggestion plus the numbers behind it
#[derive(Serialize)]
struct CueContext<'a> {
  exercise_name: &'a str,
  recommendation: Recommendation,
  suggested_delta_kg: f64,
  confidence: f64,
  rule_rationale: &'a str,
  metrics: &'a crate::models::TrendMetrics,
  session_count: usize,
  current_top_set_kg: Option<f64>,
}

pub struct ClaudeCues {
  client: ClaudeClient,
}

impl ClaudeCues {
  pub fn new(client: ClaudeClient) -> Self {
    Self { client }
  }
}

#[async_trait]
impl CueProvider for ClaudeCues {
  async fn coaching(&self, suggestion: &OverloadSuggestion, trend: &ExerciseTrend) -> Result<Coaching, CueError> {
    let context = CueContext {
      exercise_name: &trend.exercise_name,
      recommendation: suggestion.recommendation,
      suggested_delta_kg: suggestion.suggested_delta,
      confidence: suggestion.confidence,
      rule_rationale: &suggestion.rationale,
      metrics: &trend.metrics,
      session_count: trend.session_count(),
      current_top_set_kg: trend.current_top_set(),
    };
    let context_json =
      serde_json::to_string_pretty(&context).map_err(|e| CueError::Unavailable(e.to_string()))?;

    let (response, usage) = self.client.coaching_cues(&context_json).await?;
    tracing::debug!(
      exercise = %trend.exercise_name,
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      "Generated coaching cues"
    );

    let rationale = if response.rationale.trim().is_empty() {
      suggestion.rationale.clone()
    } else {
      response.rationale
    };

    Ok(Coaching {
      rationale,
      coaching_cues: response
        .coaching_cues
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Enricher
/// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SuggestionEnricher {
  provider: Arc<dyn CueProvider>,
  /// Source reported when the provider succeeds
  source: CueSource,
  timeout: Duration,
}

impl SuggestionEnricher {
  /// Static templates only
  pub fn templates() -> Self {
    Self {
      provider: Arc::new(TemplateCues),
      source: CueSource::Template,
      timeout: Duration::from_secs(1),
    }
  }

  /// Use a generative `provider` for cues, bounded by `timeout`, with template fallback
  pub fn with_provider(provider: Arc<dyn CueProvider>, timeout: Duration) -> Self {
    Self {
      provider,
      source: CueSource::Generative,
      timeout,
    }
  }

  pub fn is_generative(&self) -> bool {
    self.source == CueSource::Generative
  }

  /// Dress a base suggestion for display. Never fails.
  pub async fn enrich(&self, suggestion: OverloadSuggestion, trend: &ExerciseTrend) -> EnrichedSuggestion {
    let (coaching, cue_source) = match self.generate(&suggestion, trend).await {
      Ok(coaching) => (coaching, self.source),
      Err(e) => {
        tracing::warn!(
          exercise = %trend.exercise_name,
          error = %e,
          "Cue source failed, falling back to templates"
        );
        (TemplateCues::template_coaching(&suggestion), CueSource::Fallback)
      }
    };

    build_enriched(&trend.exercise_name, suggestion, coaching, cue_source)
  }

  /// Dropping the provider future on timeout cancels the in-flight call
  async fn generate(&self, suggestion: &OverloadSuggestion, trend: &ExerciseTrend) -> Result<Coaching, CueError> {
    let coaching = tokio::time::timeout(self.timeout, self.provider.coaching(suggestion, trend))
      .await
      .map_err(|_| CueError::Timeout(self.timeout))??;

    if coaching.coaching_cues.is_empty() {
      return Err(CueError::Unavailable("no coaching cues returned".to_string()));
    }
    Ok(coaching)
  }
}

fn build_enriched(
  exercise_name: &str,
  mut suggestion: OverloadSuggestion,
  coaching: Coaching,
  cue_source: CueSource,
) -> EnrichedSuggestion {
  suggestion.rationale = coaching.rationale;
  suggestion.coaching_cues = coaching.coaching_cues;

  EnrichedSuggestion {
    exercise_name: exercise_name.to_string(),
    suggestion_type: suggestion.recommendation.label().to_string(),
    action: suggestion.action(),
    is_recovery: suggestion.recommendation == Recommendation::Recovery,
    cue_source,
    suggestion,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

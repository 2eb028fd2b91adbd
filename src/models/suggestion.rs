use serde::{Deserialize, Serialize};

use super::trend::ExerciseTrend;

/// What to do with the load next session. Closed set: every trend maps to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
  IncreaseLoad,
  Maintain,
  Deload,
  Recovery,
}

impl Recommendation {
  /// Ranking priority for batch results (lower surfaces first)
  pub fn priority(&self) -> u8 {
    match self {
      Self::Recovery => 0,
      Self::IncreaseLoad => 1,
      Self::Deload => 2,
      Self::Maintain => 3,
    }
  }

  /// Display label for the suggestion card
  pub fn label(&self) -> &'static str {
    match self {
      Self::IncreaseLoad => "Increase load",
      Self::Maintain => "Maintain",
      Self::Deload => "Deload",
      Self::Recovery => "Recovery",
    }
  }
}

impl std::fmt::Display for Recommendation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::IncreaseLoad => write!(f, "increase_load"),
      Self::Maintain => write!(f, "maintain"),
      Self::Deload => write!(f, "deload"),
      Self::Recovery => write!(f, "recovery"),
    }
  }
}

/// Rule-engine output: recommendation, load delta and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadSuggestion {
  pub recommendation: Recommendation,
  /// Signed load change in kg; 0 unless increasing or deloading
  pub suggested_delta: f64,
  pub rationale: String,
  pub coaching_cues: Vec<String>,
  /// 0.0 - 1.0
  pub confidence: f64,
}

impl OverloadSuggestion {
  /// Build a suggestion, forcing the delta to zero where the recommendation carries none
  pub fn new(recommendation: Recommendation, suggested_delta: f64, rationale: String, confidence: f64) -> Self {
    let suggested_delta = match recommendation {
      Recommendation::IncreaseLoad | Recommendation::Deload => suggested_delta,
      Recommendation::Maintain | Recommendation::Recovery => 0.0,
    };

    Self {
      recommendation,
      suggested_delta,
      rationale,
      coaching_cues: Vec::new(),
      confidence: confidence.clamp(0.0, 1.0),
    }
  }

  /// Human-readable action, e.g. "+2.5 kg"
  pub fn action(&self) -> String {
    match self.recommendation {
      Recommendation::IncreaseLoad => format!("+{} kg", format_kg(self.suggested_delta)),
      Recommendation::Deload => format!("-{} kg", format_kg(self.suggested_delta.abs())),
      Recommendation::Maintain => "Hold load".to_string(),
      Recommendation::Recovery => "Prioritize recovery".to_string(),
    }
  }
}

fn format_kg(value: f64) -> String {
  if value.fract().abs() < 1e-9 {
    format!("{:.0}", value)
  } else {
    format!("{}", (value * 100.0).round() / 100.0)
  }
}

/// Where the rationale and coaching cues came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueSource {
  Template,
  Generative,
  /// Generative source requested but unavailable; templates used
  Fallback,
}

/// Suggestion dressed for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSuggestion {
  pub exercise_name: String,
  #[serde(flatten)]
  pub suggestion: OverloadSuggestion,
  pub suggestion_type: String,
  pub action: String,
  pub is_recovery: bool,
  pub cue_source: CueSource,
}

impl EnrichedSuggestion {
  pub fn recommendation(&self) -> Recommendation {
    self.suggestion.recommendation
  }

  pub fn confidence(&self) -> f64 {
    self.suggestion.confidence
  }
}

/// Result of a single-exercise analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAnalysis {
  pub trend: ExerciseTrend,
  pub suggestion: EnrichedSuggestion,
  /// Malformed set records skipped during aggregation
  pub skipped_records: usize,
}

/// Single-exercise response; "no data" is an outcome, not an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
  Analyzed(ExerciseAnalysis),
  NoData {
    exercise_name: String,
    skipped_records: usize,
  },
}

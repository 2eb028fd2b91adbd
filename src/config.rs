//! Process-wide analysis configuration, loaded from the environment
//!
//! Every key is optional; unset keys take the defaults below. Values that are
//! present but unparseable are rejected at startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progression::RuleThresholds;
use crate::sessions::SessionGrouping;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

pub const DEFAULT_LOOKBACK_SESSIONS: usize = 12;
pub const DEFAULT_WINDOW_SIZES: [usize; 3] = [4, 8, 12];
pub const DEFAULT_CANDIDATE_WINDOW_DAYS: i64 = 28;
pub const MAX_CANDIDATE_WINDOW_DAYS: i64 = 3650;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 4000;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  InvalidValue { key: String, value: String },

  #[error("{0} must be greater than zero")]
  NotPositive(String),

  #[error("{key} must be at most {max}")]
  TooLarge { key: String, max: i64 },
}

/// ---------------------------------------------------------------------------
/// Cue Source Selection
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CueBackend {
  /// Static coaching templates only
  #[default]
  Template,
  /// Claude-generated cues with template fallback
  Claude,
}

impl FromStr for CueBackend {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "template" => Ok(Self::Template),
      "claude" => Ok(Self::Claude),
      other => Err(format!("Unknown cue source: {}", other)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Coach Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
  /// Most recent N sessions used for trend metrics
  pub lookback_sessions: usize,
  /// Reporting windows, ascending and deduplicated
  pub window_sizes: Vec<usize>,
  /// Calendar window used to pick batch candidates
  pub candidate_window_days: i64,
  pub default_limit: usize,
  pub session_grouping: SessionGrouping,
  pub cue_backend: CueBackend,
  pub enrichment_timeout: Duration,
  pub thresholds: RuleThresholds,
}

impl Default for CoachConfig {
  fn default() -> Self {
    Self {
      lookback_sessions: DEFAULT_LOOKBACK_SESSIONS,
      window_sizes: DEFAULT_WINDOW_SIZES.to_vec(),
      candidate_window_days: DEFAULT_CANDIDATE_WINDOW_DAYS,
      default_limit: DEFAULT_SUGGESTION_LIMIT,
      session_grouping: SessionGrouping::default(),
      cue_backend: CueBackend::default(),
      enrichment_timeout: Duration::from_millis(DEFAULT_ENRICHMENT_TIMEOUT_MS),
      thresholds: RuleThresholds::default(),
    }
  }
}

impl CoachConfig {
  /// Load configuration from `OVERLOAD_*` environment variables
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let lookback_sessions = positive("OVERLOAD_LOOKBACK_SESSIONS", defaults.lookback_sessions)?;
    let candidate_window_days = at_most(
      "OVERLOAD_CANDIDATE_WINDOW_DAYS",
      positive("OVERLOAD_CANDIDATE_WINDOW_DAYS", defaults.candidate_window_days)?,
      MAX_CANDIDATE_WINDOW_DAYS,
    )?;
    let default_limit = positive("OVERLOAD_DEFAULT_LIMIT", defaults.default_limit)?;
    let timeout_ms = positive("OVERLOAD_ENRICHMENT_TIMEOUT_MS", DEFAULT_ENRICHMENT_TIMEOUT_MS)?;

    let window_sizes = match env::var("OVERLOAD_WINDOW_SIZES") {
      Ok(raw) => parse_window_sizes(&raw)?,
      Err(_) => defaults.window_sizes,
    };

    Ok(Self {
      lookback_sessions,
      window_sizes,
      candidate_window_days,
      default_limit,
      session_grouping: parsed("OVERLOAD_SESSION_GROUPING", defaults.session_grouping)?,
      cue_backend: parsed("OVERLOAD_CUE_SOURCE", defaults.cue_backend)?,
      enrichment_timeout: Duration::from_millis(timeout_ms),
      thresholds: defaults.thresholds,
    })
  }
}

/// Parse "4,8,12" into sorted, deduplicated, non-zero window sizes
pub fn parse_window_sizes(raw: &str) -> Result<Vec<usize>, ConfigError> {
  let mut sizes = Vec::new();
  for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
    let size: usize = part.parse().map_err(|_| ConfigError::InvalidValue {
      key: "OVERLOAD_WINDOW_SIZES".to_string(),
      value: raw.to_string(),
    })?;
    if size == 0 {
      return Err(ConfigError::NotPositive("OVERLOAD_WINDOW_SIZES".to_string()));
    }
    sizes.push(size);
  }

  if sizes.is_empty() {
    return Err(ConfigError::InvalidValue {
      key: "OVERLOAD_WINDOW_SIZES".to_string(),
      value: raw.to_string(),
    });
  }

  sizes.sort_unstable();
  sizes.dedup();
  Ok(sizes)
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
  match env::var(key) {
    Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
      key: key.to_string(),
      value: raw,
    }),
    Err(_) => Ok(default),
  }
}

fn positive<T>(key: &str, default: T) -> Result<T, ConfigError>
where
  T: FromStr + PartialOrd + Default,
{
  let value = parsed(key, default)?;
  if value <= T::default() {
    return Err(ConfigError::NotPositive(key.to_string()));
  }
  Ok(value)
}

fn at_most(key: &str, value: i64, max: i64) -> Result<i64, ConfigError> {
  if value > max {
    return Err(ConfigError::TooLarge {
      key: key.to_string(),
      max,
    });
  }
  Ok(value)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

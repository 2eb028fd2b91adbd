//! Session aggregation: raw set records -> per-bout session summaries
//!
//! Grouping policy:
//! - `CalendarDay` (default): sets of one exercise on the same UTC date form a session
//! - `WorkoutBout`: sets sharing a caller-supplied `workout_id` form a session;
//!   records without one fall back to their UTC date
//!
//! Malformed records (non-positive weight or reps) are skipped and counted.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Session, SetRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionGrouping {
  #[default]
  CalendarDay,
  WorkoutBout,
}

impl FromStr for SessionGrouping {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "calendar_day" | "day" => Ok(Self::CalendarDay),
      "workout" | "workout_bout" => Ok(Self::WorkoutBout),
      other => Err(format!("Unknown session grouping: {}", other)),
    }
  }
}

/// Aggregated sessions plus the number of records that were skipped
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
  /// Ascending by session start
  pub sessions: Vec<Session>,
  pub skipped_records: usize,
}

/// Group one exercise's set records into sessions
///
/// Input order does not matter; sets inside a session are ordered by
/// `performed_at`, then by record id.
pub fn aggregate_sessions(records: &[SetRecord], grouping: SessionGrouping) -> Aggregation {
  let mut skipped_records = 0;
  let mut groups: BTreeMap<String, Vec<&SetRecord>> = BTreeMap::new();

  for record in records {
    if !record.is_well_formed() {
      skipped_records += 1;
      continue;
    }
    groups.entry(group_key(record, grouping)).or_default().push(record);
  }

  let mut sessions: Vec<Session> = groups
    .into_iter()
    .filter_map(|(key, sets)| summarize(key, sets))
    .collect();

  sessions.sort_by(|a, b| {
    a.performed_at
      .cmp(&b.performed_at)
      .then_with(|| a.session_id.cmp(&b.session_id))
  });

  if skipped_records > 0 {
    tracing::warn!(skipped_records, "Skipped malformed set records during aggregation");
  }

  Aggregation {
    sessions,
    skipped_records,
  }
}

fn group_key(record: &SetRecord, grouping: SessionGrouping) -> String {
  let day_key = format!("day:{}", record.performed_at.date_naive());
  match grouping {
    SessionGrouping::CalendarDay => day_key,
    SessionGrouping::WorkoutBout => record
      .workout_id
      .as_ref()
      .filter(|id| !id.trim().is_empty())
      .map(|id| format!("workout:{}", id))
      .unwrap_or(day_key),
  }
}

/// Summary statistics for one group; `None` for an empty group
fn summarize(session_id: String, mut sets: Vec<&SetRecord>) -> Option<Session> {
  sets.sort_by(|a, b| a.performed_at.cmp(&b.performed_at).then_with(|| a.id.cmp(&b.id)));
  let first = sets.first()?;

  let total_volume = sets.iter().map(|s| s.volume()).sum();

  // Heaviest set; equal weights break toward more reps
  let top = sets.iter().copied().max_by(|a, b| {
    a.weight_kg
      .total_cmp(&b.weight_kg)
      .then_with(|| a.reps.cmp(&b.reps))
  })?;

  let rpes: Vec<f64> = sets.iter().filter_map(|s| s.valid_rpe()).collect();
  let avg_rpe = if rpes.is_empty() {
    None
  } else {
    Some(rpes.iter().sum::<f64>() / rpes.len() as f64)
  };

  Some(Session {
    session_id,
    performed_at: first.performed_at,
    total_volume,
    top_set_weight: top.weight_kg,
    top_set_reps: top.reps,
    avg_rpe,
    reps_distribution: sets.iter().map(|s| s.reps).collect(),
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

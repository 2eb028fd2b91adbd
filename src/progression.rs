//! Progressive Overload Rule Engine
//!
//! Deterministic decision table from trend metrics to one of four
//! recommendations:
//! - recovery: effort rising faster than the fatigue threshold while volume is flat or falling
//! - increase_load: volume up, top set holding, effort stable, consistency >= 0.7
//! - deload: volume falling or consistency < 0.4
//! - maintain: everything else, and any low-sample trend
//!
//! Branches are checked in that order, so the mapping is total and each trend
//! lands in exactly one branch.

use serde::{Deserialize, Serialize};

use crate::analysis::UserSettings;
use crate::exercises::{classify, BodyRegion};
use crate::models::{ExerciseTrend, OverloadSuggestion, Recommendation, TrendMetrics};

// ---------------------------------------------------------------------------
/// Thresholds: fixed per process
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleThresholds {
    /// RPE slope per session above which effort counts as rising
    pub fatigue_rpe_slope: f64,
    /// Volume slope at or below this fraction of mean session volume is "flat"
    pub volume_flat_fraction: f64,
    /// Minimum consistency to add load
    pub increase_min_consistency: f64,
    /// Consistency below this triggers a deload
    pub deload_below_consistency: f64,
    pub upper_body_increase_pct: f64,
    pub lower_body_increase_pct: f64,
    pub deload_pct: f64,
    /// Session count at which the sample-size part of confidence saturates
    pub full_confidence_sessions: usize,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            fatigue_rpe_slope: 0.3,
            volume_flat_fraction: 0.01,
            increase_min_consistency: 0.7,
            deload_below_consistency: 0.4,
            upper_body_increase_pct: 0.025,
            lower_body_increase_pct: 0.05,
            deload_pct: 0.10,
            full_confidence_sessions: 8,
        }
    }
}

/// Upper bound on confidence when fewer than two sessions exist
pub const LOW_SAMPLE_CONFIDENCE: f64 = 0.1;

// ---------------------------------------------------------------------------
/// Overload Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OverloadEngine {
    thresholds: RuleThresholds,
}

impl OverloadEngine {
    pub fn new(thresholds: RuleThresholds) -> Self {
        Self { thresholds }
    }

    /// Map a trend to exactly one recommendation with delta and confidence
    pub fn suggest(&self, trend: &ExerciseTrend, settings: &UserSettings) -> OverloadSuggestion {
        let confidence = self.confidence(trend.session_count(), trend.metrics.consistency);

        if trend.low_sample {
            let rationale = format!(
                "Only {} session(s) logged; hold the current load until a trend emerges.",
                trend.session_count()
            );
            return OverloadSuggestion::new(Recommendation::Maintain, 0.0, rationale, confidence);
        }

        let m = &trend.metrics;
        let t = &self.thresholds;
        let top_set = trend.current_top_set().unwrap_or(0.0);
        let increment = settings.effective_increment();
        let flat_tolerance = t.volume_flat_fraction * trend.mean_volume();

        let rpe_rising = m.rpe_trend > t.fatigue_rpe_slope;
        let volume_flat_or_falling = m.volume_slope <= flat_tolerance;

        let (recommendation, delta, rationale) = if rpe_rising && volume_flat_or_falling {
            (Recommendation::Recovery, 0.0, recovery_rationale(m))
        } else if m.volume_slope > 0.0
            && m.top_set_slope >= 0.0
            && !rpe_rising
            && m.consistency >= t.increase_min_consistency
        {
            let delta = self.increase_delta(top_set, classify(&trend.exercise_name), increment);
            (Recommendation::IncreaseLoad, delta, increase_rationale(m))
        } else if m.volume_slope < 0.0 || m.consistency < t.deload_below_consistency {
            let delta = self.deload_delta(top_set, increment);
            (Recommendation::Deload, delta, deload_rationale(m, t))
        } else {
            (Recommendation::Maintain, 0.0, maintain_rationale(m, t))
        };

        OverloadSuggestion::new(recommendation, delta, rationale, confidence)
    }

    /// Confidence grows with session count and consistency; <= 0.1 below two sessions
    pub fn confidence(&self, session_count: usize, consistency: f64) -> f64 {
        if session_count < 2 {
            return LOW_SAMPLE_CONFIDENCE * session_count as f64;
        }

        let full = self.thresholds.full_confidence_sessions.max(2);
        let sample = ((session_count - 1) as f64 / (full - 1) as f64).min(1.0);
        let consistency = consistency.clamp(0.0, 1.0);

        (0.2 + 0.4 * sample + 0.4 * consistency).clamp(0.0, 1.0)
    }

    /// Percentage of the top set by body region, at least one increment
    pub fn increase_delta(&self, top_set: f64, region: BodyRegion, increment: f64) -> f64 {
        let pct = match region {
            BodyRegion::Upper => self.thresholds.upper_body_increase_pct,
            BodyRegion::Lower => self.thresholds.lower_body_increase_pct,
        };
        round_to_increment(top_set * pct, increment).max(increment)
    }

    /// Negative percentage of the top set, at least one increment, never below zero load
    pub fn deload_delta(&self, top_set: f64, increment: f64) -> f64 {
        let reduction = round_to_increment(top_set * self.thresholds.deload_pct, increment).max(increment);
        -reduction.min(top_set.max(0.0))
    }
}

fn round_to_increment(value: f64, increment: f64) -> f64 {
    (value / increment).round() * increment
}

// ---------------------------------------------------------------------------
// Rationale Templates
// ---------------------------------------------------------------------------

fn recovery_rationale(m: &TrendMetrics) -> String {
    format!(
        "Rising effort with flat volume: RPE climbing {:+.2} per session while volume moved {:+.1} kg per session.",
        m.rpe_trend, m.volume_slope
    )
}

fn increase_rationale(m: &TrendMetrics) -> String {
    format!(
        "Volume trending up ({:+.1} kg per session) with the top set holding ({:+.2} kg per session), stable effort and {:.0}% consistency.",
        m.volume_slope,
        m.top_set_slope,
        m.consistency * 100.0
    )
}

fn deload_rationale(m: &TrendMetrics, t: &RuleThresholds) -> String {
    let mut reasons = Vec::new();
    if m.volume_slope < 0.0 {
        reasons.push(format!("volume trending down ({:+.1} kg per session)", m.volume_slope));
    }
    if m.consistency < t.deload_below_consistency {
        reasons.push(format!(
            "low consistency ({:.0}% of expected sessions)",
            m.consistency * 100.0
        ));
    }
    format!("Deload recommended: {}.", reasons.join(" and "))
}

fn maintain_rationale(m: &TrendMetrics, t: &RuleThresholds) -> String {
    let mut reasons = Vec::new();
    if m.volume_slope <= 0.0 {
        reasons.push("volume flat".to_string());
    }
    if m.top_set_slope < 0.0 {
        reasons.push(format!("top set slipping ({:+.2} kg per session)", m.top_set_slope));
    }
    if m.rpe_trend > t.fatigue_rpe_slope {
        reasons.push(format!("effort rising ({:+.2} RPE per session)", m.rpe_trend));
    }
    if m.consistency < t.increase_min_consistency {
        reasons.push(format!(
            "consistency {:.0}% below {:.0}%",
            m.consistency * 100.0,
            t.increase_min_consistency * 100.0
        ));
    }

    if reasons.is_empty() {
        "Holding load: no clear signal to progress or back off.".to_string()
    } else {
        format!("Holding load: {}.", reasons.join(", "))
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

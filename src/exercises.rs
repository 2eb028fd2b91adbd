//! Exercise naming and body-region classification

use serde::{Deserialize, Serialize};

/// Which progression increment applies to an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyRegion {
    Upper,
    Lower,
}

/// Name fragments that mark a lift as lower-body
const LOWER_BODY_KEYWORDS: &[&str] = &[
    "squat",
    "deadlift",
    "lunge",
    "leg press",
    "leg extension",
    "leg curl",
    "hamstring",
    "hip thrust",
    "glute",
    "calf",
    "step-up",
    "step up",
    "good morning",
    "hack",
];

/// Canonical key for matching exercise names: lowercase, underscores as spaces,
/// single spaces
pub fn normalize_name(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn classify(name: &str) -> BodyRegion {
    let key = normalize_name(name);
    if LOWER_BODY_KEYWORDS.iter().any(|kw| key.contains(kw)) {
        BodyRegion::Lower
    } else {
        BodyRegion::Upper
    }
}

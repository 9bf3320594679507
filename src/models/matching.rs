// src/models/matching.rs
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    AutoMerge,
    StewardReview,
    Manual,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::AutoMerge => "AUTO_MERGE",
            Recommendation::StewardReview => "STEWARD_REVIEW",
            Recommendation::Manual => "MANUAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTO_MERGE" => Some(Recommendation::AutoMerge),
            "STEWARD_REVIEW" => Some(Recommendation::StewardReview),
            "MANUAL" => Some(Recommendation::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric values behind a confidence score, stored as the queue rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub jaro_winkler: f64,
    pub edit_ratio: f64,
    pub prefix_weight: f64,
    pub edit_weight: f64,
}

/// An unordered pair in canonical form: `left_id < right_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidatePair {
    pub left_id: i64,
    pub right_id: i64,
}

impl CandidatePair {
    /// Returns `None` for a self-pair.
    pub fn new(a: i64, b: i64) -> Option<Self> {
        if a == b {
            return None;
        }
        let (left_id, right_id) = if a < b { (a, b) } else { (b, a) };
        Some(Self { left_id, right_id })
    }
}

/// Entity projection used by candidate generation and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntity {
    pub id: i64,
    pub raw_value: Option<String>,
    pub normalized: String,
    pub block_key: String,
}

impl NormalizedEntity {
    pub fn is_comparable(&self) -> bool {
        !self.normalized.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub pair: CandidatePair,
    pub confidence: f64,
    pub breakdown: ScoreBreakdown,
}

/// Queue rationale: the score breakdown plus the raw values compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRationale {
    pub left_value: Option<String>,
    pub right_value: Option<String>,
    pub left_normalized: String,
    pub right_normalized: String,
    #[serde(flatten)]
    pub breakdown: ScoreBreakdown,
    pub run_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_pair_is_canonical() {
        let a = CandidatePair::new(9, 5).unwrap();
        let b = CandidatePair::new(5, 9).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.left_id, 5);
        assert_eq!(a.right_id, 9);
        assert!(CandidatePair::new(3, 3).is_none());
    }

    #[test]
    fn test_recommendation_round_trips_through_str() {
        for rec in [
            Recommendation::AutoMerge,
            Recommendation::StewardReview,
            Recommendation::Manual,
        ] {
            assert_eq!(Recommendation::parse(rec.as_str()), Some(rec));
        }
        assert_eq!(Recommendation::parse("auto_merge"), None);
    }
}

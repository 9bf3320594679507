// src/models/queue.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::matching::{CandidatePair, Recommendation};

/// Review queue status. `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Open,
    Merged,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Open => "OPEN",
            ReviewStatus::Merged => "MERGED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(ReviewStatus::Open),
            "MERGED" => Some(ReviewStatus::Merged),
            "REJECTED" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Open)
    }

    /// OPEN -> MERGED and OPEN -> REJECTED are the only legal moves.
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Open, ReviewStatus::Merged) | (ReviewStatus::Open, ReviewStatus::Rejected)
        )
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insert payload for `enqueue_candidate`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReviewCandidate {
    pub pair: CandidatePair,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub rationale: serde_json::Value,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub review_id: i64,
    pub left_id: i64,
    pub right_id: i64,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub rationale: serde_json::Value,
    pub status: ReviewStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decision_notes: Option<String>,
}

impl ReviewQueueEntry {
    pub fn pair(&self) -> CandidatePair {
        CandidatePair {
            left_id: self.left_id.min(self.right_id),
            right_id: self.left_id.max(self.right_id),
        }
    }
}

/// Filter for `list_open_candidates`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenCandidateFilter {
    pub recommendation: Option<Recommendation>,
    pub min_confidence: Option<f64>,
    pub limit: Option<usize>,
}

impl OpenCandidateFilter {
    pub fn auto_merge(min_confidence: f64) -> Self {
        Self {
            recommendation: Some(Recommendation::AutoMerge),
            min_confidence: Some(min_confidence),
            limit: None,
        }
    }

    pub fn matches(&self, entry: &ReviewQueueEntry) -> bool {
        entry.status == ReviewStatus::Open
            && self
                .recommendation
                .map_or(true, |rec| entry.recommendation == rec)
            && self
                .min_confidence
                .map_or(true, |min| entry.confidence >= min)
    }
}

/// Payload for `transition_candidate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTransition {
    pub new_status: ReviewStatus,
    pub reviewer: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_open_transitions_are_legal() {
        assert!(ReviewStatus::Open.can_transition_to(ReviewStatus::Merged));
        assert!(ReviewStatus::Open.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Open.can_transition_to(ReviewStatus::Open));
        assert!(!ReviewStatus::Merged.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::Merged));
        assert!(ReviewStatus::Merged.is_terminal());
        assert!(!ReviewStatus::Open.is_terminal());
    }
}

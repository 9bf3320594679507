// src/models/stats_models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FailureKind;

/// Counters for one candidate generation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub dimension: String,
    pub total_entities: usize,
    /// Entities already DEPRECATED by an earlier merge; never paired.
    pub retired_excluded: usize,
    pub non_comparable_entities: usize,
    pub blocks: usize,
    pub pairs_considered: usize,
    pub auto_merge: usize,
    pub steward_review: usize,
    pub discarded: usize,
    pub enqueued: usize,
    pub duplicates_skipped: usize,
    pub dry_run: bool,
    pub scoring_time_secs: f64,
    pub total_time_secs: f64,
}

impl GenerationReport {
    pub fn queue_worthy(&self) -> usize {
        self.auto_merge + self.steward_review
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeOutcomeStatus {
    Merged {
        survivor_id: i64,
        retiree_id: i64,
        survivor_version: i64,
    },
    Skipped {
        reason: String,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub review_id: i64,
    pub attempts: usize,
    #[serde(flatten)]
    pub status: MergeOutcomeStatus,
}

impl MergeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, MergeOutcomeStatus::Failed { .. })
    }
}

/// Per-entry results of a merge-application pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRunReport {
    pub dimension: String,
    pub outcomes: Vec<MergeOutcome>,
}

impl MergeRunReport {
    pub fn merged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, MergeOutcomeStatus::Merged { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, MergeOutcomeStatus::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// A run with any failed entry exits non-zero even though it made progress.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(MergeOutcome::is_failure)
    }

    pub fn failures_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            if let MergeOutcomeStatus::Failed { kind, .. } = &outcome.status {
                *counts.entry(kind.as_str().to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Entity counts per lifecycle state; entities without a record count as `UNKNOWN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleProfile {
    pub dimension: String,
    pub total_entities: usize,
    pub blank_match_values: usize,
    pub by_state: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_and_failure_flag() {
        let report = MergeRunReport {
            dimension: "vendor".to_string(),
            outcomes: vec![
                MergeOutcome {
                    review_id: 1,
                    attempts: 1,
                    status: MergeOutcomeStatus::Merged {
                        survivor_id: 5,
                        retiree_id: 9,
                        survivor_version: 2,
                    },
                },
                MergeOutcome {
                    review_id: 2,
                    attempts: 0,
                    status: MergeOutcomeStatus::Skipped {
                        reason: "already merged".to_string(),
                    },
                },
                MergeOutcome {
                    review_id: 3,
                    attempts: 1,
                    status: MergeOutcomeStatus::Failed {
                        kind: FailureKind::NotFound,
                        message: "entity 11".to_string(),
                    },
                },
            ],
        };

        assert_eq!(report.merged(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failures_by_kind().get("NOT_FOUND"), Some(&1));
    }
}

// src/merge/executor.rs - Applies queue decisions to the entity dimension
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use super::policy::{AttributeMergeRule, LongestNonEmptyWins, SmallerIdSurvives, SurvivorPolicy};
use crate::config::MergeConfig;
use crate::error::{ResolutionError, Result};
use crate::models::{
    AuditEvent, AuditStamp, Entity, MergeOutcome, MergeOutcomeStatus,
    MergeRunReport, OpenCandidateFilter, ReviewQueueEntry, ReviewStatus, ReviewTransition,
};
use crate::store::{MergePlan, ResolutionStore};
use crate::utils::progress_bars::logging::ResolutionLogger;
use crate::utils::progress_bars::progress_config::ProgressConfig;

pub const ACTION_AUTO_MERGE: &str = "AUTO_MERGE";
pub const ACTION_STEWARD_APPROVE: &str = "STEWARD_APPROVE";
pub const ACTION_STEWARD_REJECT: &str = "STEWARD_REJECT";

/// Who is merging and how the write is stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub action: &'static str,
    pub updated_by: String,
    pub approved_by: String,
    pub notes: Option<String>,
}

impl Approval {
    pub fn automatic(config: &MergeConfig) -> Self {
        Self {
            action: ACTION_AUTO_MERGE,
            updated_by: config.actor.clone(),
            approved_by: config.approved_by.clone(),
            notes: None,
        }
    }

    pub fn steward(reviewer: &str, notes: Option<String>) -> Self {
        Self {
            action: ACTION_STEWARD_APPROVE,
            updated_by: reviewer.to_string(),
            approved_by: reviewer.to_string(),
            notes,
        }
    }
}

pub struct MergeExecutor {
    store: Arc<dyn ResolutionStore>,
    survivor_policy: Box<dyn SurvivorPolicy>,
    merge_rule: Box<dyn AttributeMergeRule>,
    config: MergeConfig,
    progress: ProgressConfig,
}

impl MergeExecutor {
    pub fn new(store: Arc<dyn ResolutionStore>, config: MergeConfig) -> Self {
        Self {
            store,
            survivor_policy: Box::new(SmallerIdSurvives),
            merge_rule: Box::new(LongestNonEmptyWins),
            config,
            progress: ProgressConfig::disabled(),
        }
    }

    pub fn with_survivor_policy(mut self, policy: Box<dyn SurvivorPolicy>) -> Self {
        self.survivor_policy = policy;
        self
    }

    pub fn with_merge_rule(mut self, rule: Box<dyn AttributeMergeRule>) -> Self {
        self.merge_rule = rule;
        self
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    /// Reads both entities and computes the writes for one merge. Nothing
    /// is written here.
    pub async fn plan_merge(
        &self,
        entry: &ReviewQueueEntry,
        approval: &Approval,
    ) -> Result<MergePlan> {
        let dimension = self.store.dimension();
        let left = self.store.fetch_entity(entry.left_id).await?;
        let right = self.store.fetch_entity(entry.right_id).await?;

        let (survivor_id, retiree_id) = self.survivor_policy.select(&left, &right);
        let (survivor, retiree): (&Entity, &Entity) = if survivor_id == left.id {
            (&left, &right)
        } else {
            (&right, &left)
        };
        let merged_attributes = self.merge_rule.merge(dimension, survivor, retiree);

        let lifecycle_reason = match approval.action {
            ACTION_AUTO_MERGE => format!(
                "Auto-merged into {}={} (conf={})",
                dimension.id_column, survivor_id, entry.confidence
            ),
            _ => format!(
                "Merged into {}={} by {} (conf={})",
                dimension.id_column, survivor_id, approval.approved_by, entry.confidence
            ),
        };
        let decision_notes = match &approval.notes {
            Some(notes) if !notes.trim().is_empty() => format!(
                "Survivor={}, Deprecated={}; {}",
                survivor_id,
                retiree_id,
                notes.trim()
            ),
            _ => format!("Survivor={}, Deprecated={}", survivor_id, retiree_id),
        };

        let stamp = AuditStamp::now(&approval.updated_by, &approval.approved_by);
        let audit = AuditEvent {
            dimension: dimension.name.clone(),
            review_id: entry.review_id,
            action: approval.action.to_string(),
            survivor_id: Some(survivor_id),
            retiree_id: Some(retiree_id),
            confidence: entry.confidence,
            details: json!({
                "before": {
                    "survivor": survivor.attributes,
                    "retiree": retiree.attributes,
                },
                "after": merged_attributes,
                "survivor_version": survivor.version + 1,
                "survivor_policy": self.survivor_policy.name(),
                "merge_rule": self.merge_rule.name(),
                "decision_notes": decision_notes,
            }),
            actor: approval.approved_by.clone(),
            recorded_at: stamp.at,
        };

        Ok(MergePlan {
            review_id: entry.review_id,
            survivor_id,
            retiree_id,
            survivor_version_expected: survivor.version,
            merged_attributes,
            lifecycle_reason,
            decision_notes,
            stamp,
            audit,
        })
    }

    /// One merge attempt: fresh read, then the atomic write.
    pub async fn execute(&self, entry: &ReviewQueueEntry, approval: &Approval) -> Result<Entity> {
        let plan = self.plan_merge(entry, approval).await?;
        self.store.apply_merge(&plan).await
    }

    /// Merges one entry, retrying retryable failures with a fresh read up
    /// to the configured limit. Never errors; the outcome says what happened.
    pub async fn merge_entry(&self, entry: &ReviewQueueEntry, approval: &Approval) -> MergeOutcome {
        if entry.status != ReviewStatus::Open {
            return MergeOutcome {
                review_id: entry.review_id,
                attempts: 0,
                status: MergeOutcomeStatus::Skipped {
                    reason: format!("entry is already {}", entry.status),
                },
            };
        }
        let max_attempts = self.config.retry_limit + 1;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.execute(entry, approval).await {
                Ok(survivor) => {
                    let retiree_id = if survivor.id == entry.left_id {
                        entry.right_id
                    } else {
                        entry.left_id
                    };
                    return MergeOutcome {
                        review_id: entry.review_id,
                        attempts,
                        status: MergeOutcomeStatus::Merged {
                            survivor_id: survivor.id,
                            retiree_id,
                            survivor_version: survivor.version,
                        },
                    };
                }
                Err(ResolutionError::InvalidTransition { from, .. }) if from.is_terminal() => {
                    return MergeOutcome {
                        review_id: entry.review_id,
                        attempts,
                        status: MergeOutcomeStatus::Skipped {
                            reason: format!("entry is already {}", from),
                        },
                    };
                }
                // Left OPEN for a steward.
                Err(ResolutionError::EntityRetired { entity_id }) => {
                    return MergeOutcome {
                        review_id: entry.review_id,
                        attempts,
                        status: MergeOutcomeStatus::Skipped {
                            reason: format!("entity {} is already DEPRECATED", entity_id),
                        },
                    };
                }
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    warn!(
                        "Review {} attempt {}/{} failed ({}); retrying with a fresh read",
                        entry.review_id, attempts, max_attempts, e
                    );
                }
                Err(e) => {
                    return MergeOutcome {
                        review_id: entry.review_id,
                        attempts,
                        status: MergeOutcomeStatus::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                    };
                }
            }
        }
    }

    /// Applies every OPEN `AUTO_MERGE` entry at or above `threshold`,
    /// highest confidence first. Failures are recorded per entry and do
    /// not stop the run.
    pub async fn run_auto_merges(&self, threshold: f64) -> Result<MergeRunReport> {
        let dimension = self.store.dimension().name.clone();
        let logger = ResolutionLogger::new(&dimension, "merge");
        logger.log_phase("Loading auto-merge candidates", None);

        let entries = self
            .store
            .list_open_candidates(&OpenCandidateFilter::auto_merge(threshold))
            .await?;
        logger.log_phase(
            "Applying merges",
            Some(&format!("{} OPEN entries with confidence >= {}", entries.len(), threshold)),
        );

        let approval = Approval::automatic(&self.config);
        let pb = self.progress.bar(entries.len() as u64, "Applying merges...");
        let mut report = MergeRunReport {
            dimension,
            outcomes: Vec::with_capacity(entries.len()),
        };

        for entry in &entries {
            let outcome = self.merge_entry(entry, &approval).await;
            match &outcome.status {
                MergeOutcomeStatus::Merged {
                    survivor_id,
                    retiree_id,
                    ..
                } => info!(
                    "Merged review {}: survivor={} deprecated={} (conf={:.4})",
                    entry.review_id, survivor_id, retiree_id, entry.confidence
                ),
                MergeOutcomeStatus::Skipped { reason } => {
                    logger.log_debug(&format!("Skipped review {}: {}", entry.review_id, reason))
                }
                MergeOutcomeStatus::Failed { kind, message } => logger.log_error(&format!(
                    "Review {} failed after {} attempt(s) [{}]: {}",
                    entry.review_id, outcome.attempts, kind, message
                )),
            }
            report.outcomes.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        logger.log_merge_summary(&report);
        Ok(report)
    }

    /// Steward approval: merges an OPEN entry of any recommendation with the
    /// steward recorded as approver.
    pub async fn approve(
        &self,
        review_id: i64,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<MergeOutcome> {
        let entry = self.store.get_candidate(review_id).await?;
        if entry.status != ReviewStatus::Open {
            return Err(ResolutionError::InvalidTransition {
                review_id,
                from: entry.status,
                to: ReviewStatus::Merged,
            });
        }
        let outcome = self
            .merge_entry(&entry, &Approval::steward(reviewer, notes))
            .await;
        info!("Steward {} approved review {}: {:?}", reviewer, review_id, outcome.status);
        Ok(outcome)
    }

    /// Steward rejection: OPEN -> REJECTED plus an audit event, written
    /// together. Entities are untouched.
    pub async fn reject(
        &self,
        review_id: i64,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ReviewQueueEntry> {
        let entry = self.store.get_candidate(review_id).await?;
        let event = AuditEvent {
            dimension: self.store.dimension().name.clone(),
            review_id,
            action: ACTION_STEWARD_REJECT.to_string(),
            survivor_id: None,
            retiree_id: None,
            confidence: entry.confidence,
            details: json!({
                "left_id": entry.left_id,
                "right_id": entry.right_id,
                "recommendation": entry.recommendation,
                "notes": notes,
            }),
            actor: reviewer.to_string(),
            recorded_at: chrono::Utc::now(),
        };
        let entry = self
            .store
            .reject_candidate(
                review_id,
                &ReviewTransition {
                    new_status: ReviewStatus::Rejected,
                    reviewer: reviewer.to_string(),
                    notes,
                },
                &event,
            )
            .await?;
        info!("Steward {} rejected review {}", reviewer, review_id);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::models::{
        CandidatePair, Dimension, LifecycleState, NewReviewCandidate, Recommendation,
    };
    use crate::store::InMemoryStore;

    fn abc_store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::with_entities(
            Dimension::vendor(),
            vec![
                Entity::named(5, "vendor_name", "ABC Cab Co"),
                Entity::named(9, "vendor_name", "ABC Cab Company").with_version(3),
            ],
        ))
    }

    async fn enqueue(
        store: &InMemoryStore,
        a: i64,
        b: i64,
        confidence: f64,
        recommendation: Recommendation,
    ) -> i64 {
        store
            .enqueue_candidate(&NewReviewCandidate {
                pair: CandidatePair::new(a, b).unwrap(),
                confidence,
                recommendation,
                rationale: json!({}),
                created_by: "data_engineer".to_string(),
            })
            .await
            .unwrap()
    }

    fn executor(store: Arc<InMemoryStore>) -> MergeExecutor {
        MergeExecutor::new(store, MergeConfig::default())
    }

    #[tokio::test]
    async fn test_auto_merge_rewrites_survivor_and_deprecates_retiree() {
        let store = abc_store();
        let review_id = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;

        let report = executor(store.clone()).run_auto_merges(0.95).await.unwrap();
        assert_eq!(report.merged(), 1);
        assert!(!report.has_failures());

        let survivor = store.fetch_entity(5).await.unwrap();
        assert_eq!(survivor.attribute("vendor_name"), Some("ABC Cab Company"));
        assert_eq!(survivor.version, 2);
        assert_eq!(survivor.audit.updated_by.as_deref(), Some("auto_merge"));
        assert_eq!(survivor.audit.approved_by.as_deref(), Some("auto_merge_bot"));

        let retiree = store.fetch_lifecycle(9).await.unwrap().unwrap();
        assert_eq!(retiree.state, LifecycleState::Deprecated);
        assert!(retiree.reason.contains("vendor_id=5"));
        assert!(retiree.reason.contains("0.97"));

        // The retiree row itself is never rewritten.
        let retired_entity = store.fetch_entity(9).await.unwrap();
        assert_eq!(retired_entity.version, 3);

        let entry = store.get_candidate(review_id).await.unwrap();
        assert_eq!(entry.status, ReviewStatus::Merged);
        assert_eq!(entry.decision_notes.as_deref(), Some("Survivor=5, Deprecated=9"));
        assert_eq!(entry.reviewed_by.as_deref(), Some("auto_merge_bot"));

        let trail = store.audit_trail(9).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, ACTION_AUTO_MERGE);
        assert_eq!(trail[0].details["before"]["survivor"]["vendor_name"], "ABC Cab Co");
    }

    #[tokio::test]
    async fn test_version_conflict_leaves_no_partial_writes() {
        let store = abc_store();
        let review_id = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;
        let exec = executor(store.clone());
        let entry = store.get_candidate(review_id).await.unwrap();

        let plan = exec
            .plan_merge(&entry, &Approval::automatic(&MergeConfig::default()))
            .await
            .unwrap();
        assert_eq!(plan.survivor_version_expected, 1);

        // An external writer bumps the survivor after the plan was read.
        store
            .put_entity(Entity::named(5, "vendor_name", "ABC Cab Co").with_version(2))
            .unwrap();

        let err = store.apply_merge(&plan).await.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::VersionConflict {
                entity_id: 5,
                expected: 1,
                found: 2
            }
        ));
        assert_eq!(store.fetch_entity(5).await.unwrap().version, 2);
        assert!(store.fetch_lifecycle(9).await.unwrap().is_none());
        assert_eq!(
            store.get_candidate(review_id).await.unwrap().status,
            ReviewStatus::Open
        );
        assert!(store.audit_events().unwrap().is_empty());

        // A fresh read picks up the new version and succeeds.
        let outcome = exec
            .merge_entry(&entry, &Approval::automatic(&MergeConfig::default()))
            .await;
        assert_eq!(
            outcome.status,
            MergeOutcomeStatus::Merged {
                survivor_id: 5,
                retiree_id: 9,
                survivor_version: 3
            }
        );
    }

    #[tokio::test]
    async fn test_missing_retiree_rolls_back_survivor_update() {
        let store = Arc::new(InMemoryStore::with_entities(
            Dimension::vendor(),
            vec![Entity::named(5, "vendor_name", "ABC Cab Co")],
        ));
        store
            .put_entity(Entity::named(9, "vendor_name", "ABC Cab Company"))
            .unwrap();
        let review_id = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;
        let exec = executor(store.clone());
        let entry = store.get_candidate(review_id).await.unwrap();
        let mut plan = exec
            .plan_merge(&entry, &Approval::automatic(&MergeConfig::default()))
            .await
            .unwrap();
        plan.retiree_id = 404;

        let err = store.apply_merge(&plan).await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound(_)));
        let survivor = store.fetch_entity(5).await.unwrap();
        assert_eq!(survivor.version, 1);
        assert_eq!(survivor.attribute("vendor_name"), Some("ABC Cab Co"));
        assert_eq!(
            store.get_candidate(review_id).await.unwrap().status,
            ReviewStatus::Open
        );
    }

    #[tokio::test]
    async fn test_run_reports_failures_and_keeps_going() {
        let store = abc_store();
        store
            .put_entity(Entity::named(20, "vendor_name", "Creative Mobile Tech"))
            .unwrap();
        store
            .put_entity(Entity::named(21, "vendor_name", "Creative Mobile Technologies"))
            .unwrap();

        // 404 was never loaded, so this entry cannot be applied.
        let broken = enqueue(&store, 20, 404, 0.99, Recommendation::AutoMerge).await;
        let good = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;
        let stale = enqueue(&store, 9, 21, 0.96, Recommendation::AutoMerge).await;
        enqueue(&store, 20, 21, 0.90, Recommendation::AutoMerge).await;
        enqueue(&store, 5, 20, 0.99, Recommendation::StewardReview).await;

        let report = executor(store.clone()).run_auto_merges(0.95).await.unwrap();
        let order: Vec<i64> = report.outcomes.iter().map(|o| o.review_id).collect();
        assert_eq!(order, vec![broken, good, stale]);

        assert_eq!(report.merged(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failures_by_kind().get("NOT_FOUND"), Some(&1));
        assert_eq!(
            report.outcomes[0].status,
            MergeOutcomeStatus::Failed {
                kind: FailureKind::NotFound,
                message: "Not found: entity 404".to_string(),
            }
        );

        // Failed and skipped entries stay OPEN for a re-run or a steward.
        assert_eq!(store.get_candidate(broken).await.unwrap().status, ReviewStatus::Open);
        assert_eq!(store.get_candidate(stale).await.unwrap().status, ReviewStatus::Open);

        // A second run is idempotent for what already merged.
        let rerun = executor(store.clone()).run_auto_merges(0.95).await.unwrap();
        assert_eq!(rerun.merged(), 0);
        assert_eq!(store.fetch_entity(5).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_steward_approve_and_reject() {
        let store = abc_store();
        store
            .put_entity(Entity::named(20, "vendor_name", "Creative Mobile Tech"))
            .unwrap();
        store
            .put_entity(Entity::named(21, "vendor_name", "Creative Mobile Technologies"))
            .unwrap();
        let approve_id = enqueue(&store, 20, 21, 0.88, Recommendation::StewardReview).await;
        let reject_id = enqueue(&store, 5, 9, 0.86, Recommendation::StewardReview).await;
        let exec = executor(store.clone());

        let outcome = exec
            .approve(approve_id, "alice", Some("same TPEP provider".to_string()))
            .await
            .unwrap();
        assert!(matches!(outcome.status, MergeOutcomeStatus::Merged { survivor_id: 20, .. }));
        let survivor = store.fetch_entity(20).await.unwrap();
        assert_eq!(survivor.attribute("vendor_name"), Some("Creative Mobile Technologies"));
        assert_eq!(survivor.audit.approved_by.as_deref(), Some("alice"));
        let entry = store.get_candidate(approve_id).await.unwrap();
        assert_eq!(
            entry.decision_notes.as_deref(),
            Some("Survivor=20, Deprecated=21; same TPEP provider")
        );

        let rejected = exec
            .reject(reject_id, "bob", Some("different fleets".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert_eq!(rejected.reviewed_by.as_deref(), Some("bob"));
        assert_eq!(store.fetch_entity(5).await.unwrap().version, 1);
        assert!(store.fetch_lifecycle(9).await.unwrap().is_none());

        let events = store.audit_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, ACTION_STEWARD_REJECT);

        let err = exec.approve(reject_id, "alice", None).await.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::InvalidTransition {
                from: ReviewStatus::Rejected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_plan_against_retired_survivor_is_refused_under_lock() {
        let store = abc_store();
        store
            .put_entity(Entity::named(21, "vendor_name", "ABC Cab Corp"))
            .unwrap();
        let first = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;
        let second = enqueue(&store, 9, 21, 0.96, Recommendation::AutoMerge).await;
        let exec = executor(store.clone());
        let approval = Approval::automatic(&MergeConfig::default());

        // Both plans are read before either merge lands.
        let entry_b = store.get_candidate(second).await.unwrap();
        let plan_b = exec.plan_merge(&entry_b, &approval).await.unwrap();
        assert_eq!(plan_b.survivor_id, 9);

        let entry_a = store.get_candidate(first).await.unwrap();
        exec.execute(&entry_a, &approval).await.unwrap();

        let err = store.apply_merge(&plan_b).await.unwrap_err();
        assert!(matches!(err, ResolutionError::EntityRetired { entity_id: 9 }));
        assert_eq!(err.kind(), FailureKind::EntityRetired);
        assert!(!err.is_retryable());

        assert_eq!(store.fetch_entity(9).await.unwrap().version, 3);
        assert!(store.fetch_lifecycle(21).await.unwrap().is_none());
        assert_eq!(store.get_candidate(second).await.unwrap().status, ReviewStatus::Open);
        assert_eq!(store.audit_events().unwrap().len(), 1);

        let outcome = exec.merge_entry(&entry_b, &approval).await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.status,
            MergeOutcomeStatus::Skipped {
                reason: "entity 9 is already DEPRECATED".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_reject_of_closed_entry_writes_nothing() {
        let store = abc_store();
        let review_id = enqueue(&store, 5, 9, 0.86, Recommendation::StewardReview).await;
        let exec = executor(store.clone());

        exec.reject(review_id, "bob", None).await.unwrap();
        assert_eq!(store.audit_events().unwrap().len(), 1);

        let err = exec
            .reject(review_id, "carol", Some("second look".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::InvalidTransition {
                from: ReviewStatus::Rejected,
                to: ReviewStatus::Rejected,
                ..
            }
        ));
        assert_eq!(store.audit_events().unwrap().len(), 1);
        let entry = store.get_candidate(review_id).await.unwrap();
        assert_eq!(entry.reviewed_by.as_deref(), Some("bob"));
    }

    struct KeepSurvivorValue;

    impl AttributeMergeRule for KeepSurvivorValue {
        fn name(&self) -> &'static str {
            "keep_survivor"
        }

        fn merge_value<'a>(
            &self,
            survivor: Option<&'a str>,
            retiree: Option<&'a str>,
        ) -> Option<&'a str> {
            survivor.or(retiree)
        }
    }

    #[tokio::test]
    async fn test_custom_merge_rule_is_used() {
        let store = abc_store();
        let review_id = enqueue(&store, 5, 9, 0.97, Recommendation::AutoMerge).await;
        let exec = executor(store.clone()).with_merge_rule(Box::new(KeepSurvivorValue));

        let entry = store.get_candidate(review_id).await.unwrap();
        let plan = exec
            .plan_merge(&entry, &Approval::automatic(&MergeConfig::default()))
            .await
            .unwrap();
        assert_eq!(plan.merged_attributes["vendor_name"], "ABC Cab Co");

        let report = exec.run_auto_merges(0.95).await.unwrap();
        assert_eq!(report.merged(), 1);
        let survivor = store.fetch_entity(5).await.unwrap();
        assert_eq!(survivor.attribute("vendor_name"), Some("ABC Cab Co"));
        assert_eq!(survivor.version, 2);
        assert_eq!(
            store.fetch_lifecycle(9).await.unwrap().unwrap().state,
            LifecycleState::Deprecated
        );
    }
}

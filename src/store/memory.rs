// src/store/memory.rs - In-process store used by tests and dry runs
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{MergePlan, ResolutionStore};
use crate::error::{ResolutionError, Result};
use crate::models::{
    AuditEvent, AuditFields, AuditStamp, Dimension, Entity, LifecycleRecord, LifecycleState,
    NewReviewCandidate, OpenCandidateFilter, ReviewQueueEntry, ReviewStatus, ReviewTransition,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entities: BTreeMap<i64, Entity>,
    lifecycle: BTreeMap<i64, LifecycleRecord>,
    queue: BTreeMap<i64, ReviewQueueEntry>,
    audit: Vec<AuditEvent>,
    next_review_id: i64,
}

impl MemoryState {
    fn entity(&self, entity_id: i64) -> Result<&Entity> {
        self.entities
            .get(&entity_id)
            .ok_or_else(|| ResolutionError::NotFound(format!("entity {}", entity_id)))
    }

    fn entry_mut(&mut self, review_id: i64) -> Result<&mut ReviewQueueEntry> {
        self.queue
            .get_mut(&review_id)
            .ok_or_else(|| ResolutionError::NotFound(format!("review entry {}", review_id)))
    }

    fn update_entity(
        &mut self,
        entity_id: i64,
        attributes: &BTreeMap<String, String>,
        version_expected: i64,
        stamp: &AuditStamp,
    ) -> Result<Entity> {
        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or_else(|| ResolutionError::NotFound(format!("entity {}", entity_id)))?;
        if entity.version != version_expected {
            return Err(ResolutionError::VersionConflict {
                entity_id,
                expected: version_expected,
                found: entity.version,
            });
        }
        entity.attributes = attributes.clone();
        entity.version += 1;
        entity.audit.updated_by = Some(stamp.updated_by.clone());
        entity.audit.updated_at = Some(stamp.at);
        entity.audit.approved_by = Some(stamp.approved_by.clone());
        entity.audit.approved_at = Some(stamp.at);
        Ok(entity.clone())
    }

    fn upsert_lifecycle(
        &mut self,
        entity_id: i64,
        state: LifecycleState,
        reason: &str,
        stamp: &AuditStamp,
    ) -> Result<LifecycleRecord> {
        self.entity(entity_id)?;
        let record = self
            .lifecycle
            .entry(entity_id)
            .or_insert_with(|| LifecycleRecord {
                entity_id,
                state,
                reason: String::new(),
                audit: AuditFields {
                    created_by: Some(stamp.updated_by.clone()),
                    ..AuditFields::default()
                },
            });
        record.state = state;
        record.reason = reason.to_string();
        record.audit.updated_by = Some(stamp.updated_by.clone());
        record.audit.updated_at = Some(stamp.at);
        record.audit.approved_by = Some(stamp.approved_by.clone());
        record.audit.approved_at = Some(stamp.at);
        Ok(record.clone())
    }

    fn ensure_active(&self, entity_id: i64) -> Result<()> {
        match self.lifecycle.get(&entity_id) {
            Some(record) if record.state == LifecycleState::Deprecated => {
                Err(ResolutionError::EntityRetired { entity_id })
            }
            _ => Ok(()),
        }
    }

    fn transition(
        &mut self,
        review_id: i64,
        transition: &ReviewTransition,
    ) -> Result<ReviewQueueEntry> {
        let entry = self.entry_mut(review_id)?;
        if !entry.status.can_transition_to(transition.new_status) {
            return Err(ResolutionError::InvalidTransition {
                review_id,
                from: entry.status,
                to: transition.new_status,
            });
        }
        entry.status = transition.new_status;
        entry.reviewed_by = Some(transition.reviewer.clone());
        entry.reviewed_at = Some(Utc::now());
        entry.decision_notes = transition.notes.clone();
        Ok(entry.clone())
    }
}

/// Single-dimension store held in memory.
///
/// Writes run against a copy of the state that replaces the original only
/// when every step succeeded, so a failed merge leaves nothing behind.
#[derive(Debug)]
pub struct InMemoryStore {
    dimension: Dimension,
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            state: Mutex::new(MemoryState {
                next_review_id: 1,
                ..MemoryState::default()
            }),
        }
    }

    pub fn with_entities(dimension: Dimension, entities: Vec<Entity>) -> Self {
        let store = Self::new(dimension);
        if let Ok(mut state) = store.state.lock() {
            for entity in entities {
                state.entities.insert(entity.id, entity);
            }
        }
        store
    }

    /// Inserts or replaces an entity as an upstream load would.
    pub fn put_entity(&self, entity: Entity) -> Result<()> {
        self.lock()?.entities.insert(entity.id, entity);
        Ok(())
    }

    /// Every audit event, oldest first.
    pub fn audit_events(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.lock()?.audit.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| ResolutionError::Persistence("in-memory store lock poisoned".to_string()))
    }

    fn transact<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }
}

#[async_trait]
impl ResolutionStore for InMemoryStore {
    fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    async fn fetch_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.lock()?.entities.values().cloned().collect())
    }

    async fn fetch_entity(&self, entity_id: i64) -> Result<Entity> {
        self.lock()?.entity(entity_id).cloned()
    }

    async fn enqueue_candidate(&self, candidate: &NewReviewCandidate) -> Result<i64> {
        self.transact(|state| {
            let pair = candidate.pair;
            if let Some(existing) = state
                .queue
                .values()
                .find(|e| e.status == ReviewStatus::Open && e.pair() == pair)
            {
                return Err(ResolutionError::DuplicateCandidate {
                    left_id: pair.left_id,
                    right_id: pair.right_id,
                    existing_review_id: existing.review_id,
                });
            }
            let review_id = state.next_review_id;
            state.next_review_id += 1;
            state.queue.insert(
                review_id,
                ReviewQueueEntry {
                    review_id,
                    left_id: pair.left_id,
                    right_id: pair.right_id,
                    confidence: candidate.confidence,
                    recommendation: candidate.recommendation,
                    rationale: candidate.rationale.clone(),
                    status: ReviewStatus::Open,
                    created_by: candidate.created_by.clone(),
                    created_at: Utc::now(),
                    reviewed_by: None,
                    reviewed_at: None,
                    decision_notes: None,
                },
            );
            Ok(review_id)
        })
    }

    async fn list_open_candidates(
        &self,
        filter: &OpenCandidateFilter,
    ) -> Result<Vec<ReviewQueueEntry>> {
        let state = self.lock()?;
        let mut open: Vec<ReviewQueueEntry> = state
            .queue
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.review_id.cmp(&b.review_id))
        });
        if let Some(limit) = filter.limit {
            open.truncate(limit);
        }
        Ok(open)
    }

    async fn get_candidate(&self, review_id: i64) -> Result<ReviewQueueEntry> {
        self.lock()?
            .queue
            .get(&review_id)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound(format!("review entry {}", review_id)))
    }

    async fn transition_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
    ) -> Result<ReviewQueueEntry> {
        self.transact(|state| state.transition(review_id, transition))
    }

    async fn update_entity(
        &self,
        entity_id: i64,
        attributes: &BTreeMap<String, String>,
        version_expected: i64,
        stamp: &AuditStamp,
    ) -> Result<Entity> {
        self.transact(|state| state.update_entity(entity_id, attributes, version_expected, stamp))
    }

    async fn upsert_lifecycle(
        &self,
        entity_id: i64,
        state: LifecycleState,
        reason: &str,
        stamp: &AuditStamp,
    ) -> Result<LifecycleRecord> {
        self.transact(|s| s.upsert_lifecycle(entity_id, state, reason, stamp))
    }

    async fn fetch_lifecycle(&self, entity_id: i64) -> Result<Option<LifecycleRecord>> {
        Ok(self.lock()?.lifecycle.get(&entity_id).cloned())
    }

    async fn apply_merge(&self, plan: &MergePlan) -> Result<Entity> {
        self.transact(|state| {
            let entry = state.entry_mut(plan.review_id)?;
            if entry.status != ReviewStatus::Open {
                return Err(ResolutionError::InvalidTransition {
                    review_id: plan.review_id,
                    from: entry.status,
                    to: ReviewStatus::Merged,
                });
            }
            state.ensure_active(plan.survivor_id)?;
            state.ensure_active(plan.retiree_id)?;
            let survivor = state.update_entity(
                plan.survivor_id,
                &plan.merged_attributes,
                plan.survivor_version_expected,
                &plan.stamp,
            )?;
            state.upsert_lifecycle(
                plan.retiree_id,
                LifecycleState::Deprecated,
                &plan.lifecycle_reason,
                &plan.stamp,
            )?;
            state.transition(
                plan.review_id,
                &ReviewTransition {
                    new_status: ReviewStatus::Merged,
                    reviewer: plan.stamp.approved_by.clone(),
                    notes: Some(plan.decision_notes.clone()),
                },
            )?;
            state.audit.push(plan.audit.clone());
            Ok(survivor)
        })
    }

    async fn reject_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
        event: &AuditEvent,
    ) -> Result<ReviewQueueEntry> {
        self.transact(|state| {
            let entry = state.transition(review_id, transition)?;
            state.audit.push(event.clone());
            Ok(entry)
        })
    }

    async fn deprecated_entity_ids(&self) -> Result<BTreeSet<i64>> {
        Ok(self
            .lock()?
            .lifecycle
            .values()
            .filter(|r| r.state == LifecycleState::Deprecated)
            .map(|r| r.entity_id)
            .collect())
    }

    async fn seed_lifecycle(&self, created_by: &str) -> Result<usize> {
        self.transact(|state| {
            let now = Utc::now();
            let missing: Vec<i64> = state
                .entities
                .keys()
                .filter(|id| !state.lifecycle.contains_key(*id))
                .copied()
                .collect();
            for id in &missing {
                state.lifecycle.insert(
                    *id,
                    LifecycleRecord {
                        entity_id: *id,
                        state: LifecycleState::Active,
                        reason: "seeded".to_string(),
                        audit: AuditFields {
                            created_by: Some(created_by.to_string()),
                            updated_by: Some(created_by.to_string()),
                            updated_at: Some(now),
                            ..AuditFields::default()
                        },
                    },
                );
            }
            Ok(missing.len())
        })
    }

    async fn lifecycle_distribution(&self) -> Result<BTreeMap<String, usize>> {
        let state = self.lock()?;
        let mut counts = BTreeMap::new();
        for id in state.entities.keys() {
            let label = state
                .lifecycle
                .get(id)
                .map_or("UNKNOWN", |r| r.state.as_str());
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn audit_trail(&self, entity_id: i64) -> Result<Vec<AuditEvent>> {
        Ok(self
            .lock()?
            .audit
            .iter()
            .filter(|e| e.touches(entity_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidatePair, Recommendation};
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::with_entities(
            Dimension::vendor(),
            vec![
                Entity::named(5, "vendor_name", "ABC Cab Co"),
                Entity::named(9, "vendor_name", "ABC Cab Company").with_version(3),
            ],
        )
    }

    fn candidate(a: i64, b: i64, confidence: f64) -> NewReviewCandidate {
        NewReviewCandidate {
            pair: CandidatePair::new(a, b).unwrap(),
            confidence,
            recommendation: Recommendation::AutoMerge,
            rationale: json!({"jaro_winkler": 0.98}),
            created_by: "data_engineer".to_string(),
        }
    }

    fn merged_by(reviewer: &str) -> ReviewTransition {
        ReviewTransition {
            new_status: ReviewStatus::Merged,
            reviewer: reviewer.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_open_pair_is_rejected_until_resolved() {
        let store = store();
        let first = store.enqueue_candidate(&candidate(5, 9, 0.97)).await.unwrap();

        let err = store
            .enqueue_candidate(&candidate(9, 5, 0.97))
            .await
            .unwrap_err();
        match err {
            ResolutionError::DuplicateCandidate {
                left_id,
                right_id,
                existing_review_id,
            } => {
                assert_eq!((left_id, right_id), (5, 9));
                assert_eq!(existing_review_id, first);
            }
            other => panic!("expected DuplicateCandidate, got {:?}", other),
        }

        store
            .transition_candidate(first, &merged_by("steward"))
            .await
            .unwrap();
        let second = store.enqueue_candidate(&candidate(5, 9, 0.97)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_terminal_entries_cannot_transition() {
        let store = store();
        let id = store.enqueue_candidate(&candidate(5, 9, 0.9)).await.unwrap();
        store
            .transition_candidate(
                id,
                &ReviewTransition {
                    new_status: ReviewStatus::Rejected,
                    reviewer: "steward".to_string(),
                    notes: Some("different companies".to_string()),
                },
            )
            .await
            .unwrap();

        let err = store
            .transition_candidate(id, &merged_by("steward"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::InvalidTransition {
                from: ReviewStatus::Rejected,
                to: ReviewStatus::Merged,
                ..
            }
        ));

        let missing = store
            .transition_candidate(999, &merged_by("steward"))
            .await
            .unwrap_err();
        assert!(matches!(missing, ResolutionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_open_orders_by_confidence_and_filters() {
        let store = InMemoryStore::with_entities(
            Dimension::vendor(),
            (1..=4)
                .map(|id| Entity::named(id, "vendor_name", "x"))
                .collect(),
        );
        store.enqueue_candidate(&candidate(1, 2, 0.85)).await.unwrap();
        store.enqueue_candidate(&candidate(1, 3, 0.99)).await.unwrap();
        let mut review = candidate(2, 4, 0.90);
        review.recommendation = Recommendation::StewardReview;
        store.enqueue_candidate(&review).await.unwrap();

        let all = store
            .list_open_candidates(&OpenCandidateFilter::default())
            .await
            .unwrap();
        let confidences: Vec<f64> = all.iter().map(|e| e.confidence).collect();
        assert_eq!(confidences, vec![0.99, 0.90, 0.85]);

        let auto = store
            .list_open_candidates(&OpenCandidateFilter::auto_merge(0.95))
            .await
            .unwrap();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].pair(), CandidatePair::new(1, 3).unwrap());
    }

    #[tokio::test]
    async fn test_update_entity_checks_version() {
        let store = store();
        let stamp = AuditStamp::now("auto_merge", "auto_merge_bot");
        let mut attrs = BTreeMap::new();
        attrs.insert("vendor_name".to_string(), "ABC Cab Company".to_string());

        let err = store.update_entity(9, &attrs, 1, &stamp).await.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::VersionConflict {
                entity_id: 9,
                expected: 1,
                found: 3
            }
        ));

        let updated = store.update_entity(9, &attrs, 3, &stamp).await.unwrap();
        assert_eq!(updated.version, 4);
        assert_eq!(updated.audit.updated_by.as_deref(), Some("auto_merge"));
    }

    #[tokio::test]
    async fn test_upsert_lifecycle_never_duplicates() {
        let store = store();
        let stamp = AuditStamp::now("auto_merge", "auto_merge_bot");
        store
            .upsert_lifecycle(9, LifecycleState::Active, "seeded", &stamp)
            .await
            .unwrap();
        let record = store
            .upsert_lifecycle(9, LifecycleState::Deprecated, "merged", &stamp)
            .await
            .unwrap();
        assert_eq!(record.state, LifecycleState::Deprecated);
        assert_eq!(record.reason, "merged");

        let dist = store.lifecycle_distribution().await.unwrap();
        assert_eq!(dist.get("DEPRECATED"), Some(&1));
        assert_eq!(dist.get("UNKNOWN"), Some(&1));

        let err = store
            .upsert_lifecycle(404, LifecycleState::Deprecated, "merged", &stamp)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_seed_lifecycle_does_nothing_on_existing_rows() {
        let store = store();
        let stamp = AuditStamp::now("auto_merge", "auto_merge_bot");
        store
            .upsert_lifecycle(9, LifecycleState::Deprecated, "merged", &stamp)
            .await
            .unwrap();

        assert_eq!(store.seed_lifecycle("data_engineer").await.unwrap(), 1);
        assert_eq!(store.seed_lifecycle("data_engineer").await.unwrap(), 0);

        let retired = store.fetch_lifecycle(9).await.unwrap().unwrap();
        assert_eq!(retired.state, LifecycleState::Deprecated);
        let seeded = store.fetch_lifecycle(5).await.unwrap().unwrap();
        assert_eq!(seeded.state, LifecycleState::Active);
    }
}

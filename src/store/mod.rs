// src/store/mod.rs - Persistence port for the resolution engine
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::models::{
    AuditEvent, AuditStamp, Dimension, Entity, LifecycleRecord, LifecycleState,
    NewReviewCandidate, OpenCandidateFilter, ReviewQueueEntry, ReviewTransition,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Everything one merge writes, computed before the transaction starts.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub review_id: i64,
    pub survivor_id: i64,
    pub retiree_id: i64,
    /// Version read when the plan was built; the survivor update is checked against it.
    pub survivor_version_expected: i64,
    pub merged_attributes: BTreeMap<String, String>,
    pub lifecycle_reason: String,
    pub decision_notes: String,
    pub stamp: AuditStamp,
    pub audit: AuditEvent,
}

/// Storage contract for one dimension.
///
/// Every method that writes more than one row does so atomically. Reads of
/// the review queue return entries ordered by descending confidence.
#[async_trait]
pub trait ResolutionStore: Send + Sync {
    fn dimension(&self) -> &Dimension;

    /// All entities, ordered by id.
    async fn fetch_entities(&self) -> Result<Vec<Entity>>;

    async fn fetch_entity(&self, entity_id: i64) -> Result<Entity>;

    /// Creates an OPEN entry and returns its review id. Fails with
    /// `DuplicateCandidate` while an OPEN entry exists for the same pair.
    async fn enqueue_candidate(&self, candidate: &NewReviewCandidate) -> Result<i64>;

    async fn list_open_candidates(
        &self,
        filter: &OpenCandidateFilter,
    ) -> Result<Vec<ReviewQueueEntry>>;

    async fn get_candidate(&self, review_id: i64) -> Result<ReviewQueueEntry>;

    /// OPEN -> MERGED | REJECTED; anything else is `InvalidTransition`.
    async fn transition_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
    ) -> Result<ReviewQueueEntry>;

    /// Version-checked write. Bumps the version by one and stamps audit fields.
    async fn update_entity(
        &self,
        entity_id: i64,
        attributes: &BTreeMap<String, String>,
        version_expected: i64,
        stamp: &AuditStamp,
    ) -> Result<Entity>;

    async fn upsert_lifecycle(
        &self,
        entity_id: i64,
        state: LifecycleState,
        reason: &str,
        stamp: &AuditStamp,
    ) -> Result<LifecycleRecord>;

    async fn fetch_lifecycle(&self, entity_id: i64) -> Result<Option<LifecycleRecord>>;

    /// Survivor update, retiree deprecation, queue transition and audit
    /// append as one unit. Fails with `EntityRetired` if either side is
    /// already DEPRECATED when the write starts. On error nothing is
    /// written. Returns the updated survivor.
    async fn apply_merge(&self, plan: &MergePlan) -> Result<Entity>;

    /// OPEN -> REJECTED plus the audit append, as one unit.
    async fn reject_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
        event: &AuditEvent,
    ) -> Result<ReviewQueueEntry>;

    /// Ids whose lifecycle record is DEPRECATED.
    async fn deprecated_entity_ids(&self) -> Result<BTreeSet<i64>>;

    /// Gives every entity without a lifecycle record an ACTIVE one.
    /// Returns the number of records created.
    async fn seed_lifecycle(&self, created_by: &str) -> Result<usize>;

    /// Entity counts per lifecycle state; entities without a record count as `UNKNOWN`.
    async fn lifecycle_distribution(&self) -> Result<BTreeMap<String, usize>>;

    async fn audit_trail(&self, entity_id: i64) -> Result<Vec<AuditEvent>>;
}

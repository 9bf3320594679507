// src/engine.rs - Facade over generation, review and merge for one dimension
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::matching::manager::run_candidate_generation;
use crate::matching::normalize::Normalizer;
use crate::matching::zone_report::{build_duplicate_report, DuplicateReport};
use crate::merge::{MergeExecutor, SurvivorPolicy};
use crate::models::{
    Dimension, GenerationReport, LifecycleProfile, MergeOutcome, MergeRunReport,
    OpenCandidateFilter, ReviewQueueEntry,
};
use crate::store::ResolutionStore;

/// Built from one validated configuration object. Construction is the only
/// place configuration errors surface.
pub struct ResolutionEngine {
    config: EngineConfig,
    store: Arc<dyn ResolutionStore>,
    executor: MergeExecutor,
}

impl ResolutionEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn ResolutionStore>) -> Result<Self> {
        config.validate_for(store.dimension())?;
        let executor = MergeExecutor::new(Arc::clone(&store), config.merge.clone())
            .with_progress(config.progress.clone());
        Ok(Self {
            config,
            store,
            executor,
        })
    }

    pub fn with_survivor_policy(mut self, policy: Box<dyn SurvivorPolicy>) -> Self {
        self.executor = self.executor.with_survivor_policy(policy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dimension(&self) -> &Dimension {
        self.store.dimension()
    }

    pub fn executor(&self) -> &MergeExecutor {
        &self.executor
    }

    pub async fn generate(&self, dry_run: bool) -> Result<GenerationReport> {
        run_candidate_generation(self.store.as_ref(), &self.config, dry_run).await
    }

    /// Auto-merge pass at the configured auto-merge threshold.
    pub async fn apply_auto_merges(&self) -> Result<MergeRunReport> {
        self.executor
            .run_auto_merges(self.config.thresholds.auto_merge)
            .await
    }

    pub async fn list_open(&self, filter: &OpenCandidateFilter) -> Result<Vec<ReviewQueueEntry>> {
        self.store.list_open_candidates(filter).await
    }

    pub async fn approve(
        &self,
        review_id: i64,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<MergeOutcome> {
        self.executor.approve(review_id, reviewer, notes).await
    }

    pub async fn reject(
        &self,
        review_id: i64,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<ReviewQueueEntry> {
        self.executor.reject(review_id, reviewer, notes).await
    }

    pub async fn seed_lifecycle(&self) -> Result<usize> {
        self.store.seed_lifecycle(&self.config.created_by).await
    }

    pub async fn profile(&self) -> Result<LifecycleProfile> {
        let dimension = self.store.dimension();
        let normalizer = Normalizer::new(self.config.normalization);
        let entities = self.store.fetch_entities().await?;
        let blank_match_values = entities
            .iter()
            .filter(|e| {
                normalizer
                    .normalize(e.attribute(&dimension.match_attribute))
                    .is_empty()
            })
            .count();
        Ok(LifecycleProfile {
            dimension: dimension.name.clone(),
            total_entities: entities.len(),
            blank_match_values,
            by_state: self.store.lifecycle_distribution().await?,
        })
    }

    pub async fn duplicate_report(&self, threshold: f64) -> Result<DuplicateReport> {
        let entities = self.store.fetch_entities().await?;
        Ok(build_duplicate_report(
            &entities,
            self.store.dimension(),
            &self.config,
            threshold,
        ))
    }
}

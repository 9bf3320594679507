// src/matching/manager.rs - Candidate generation run: fetch, score, classify, enqueue
use log::{debug, warn};
use std::time::Instant;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ResolutionError, Result};
use crate::matching::candidates::{generate_candidates, CandidateSet};
use crate::matching::classify::Classifier;
use crate::matching::normalize::Normalizer;
use crate::matching::scoring::SimilarityScorer;
use crate::models::{
    GenerationReport, MatchRationale, NewReviewCandidate, Recommendation, ScoredPair,
};
use crate::store::ResolutionStore;
use crate::utils::progress_bars::logging::ResolutionLogger;

/// Runs one generation pass over the store's dimension.
///
/// Scores are computed for every candidate pair; pairs at or above the
/// steward-review threshold are enqueued as OPEN entries unless `dry_run`
/// is set. An OPEN entry for the same pair from an earlier run is counted
/// as a skipped duplicate, not an error. DEPRECATED entities never pair.
pub async fn run_candidate_generation(
    store: &dyn ResolutionStore,
    config: &EngineConfig,
    dry_run: bool,
) -> Result<GenerationReport> {
    let start = Instant::now();
    let dimension = store.dimension().clone();
    config.validate_for(&dimension)?;

    let run_id = Uuid::new_v4().to_string();
    let logger = ResolutionLogger::new(&dimension.name, "generate");
    logger.log_start(&run_id, dry_run);

    let normalizer = Normalizer::new(config.normalization);
    let scorer = SimilarityScorer::new(config.weights);
    let classifier = Classifier::new(config.thresholds)?;
    let strategy = config.blocking_for(&dimension);

    logger.log_phase("Loading entities", Some(&dimension.entity_table));
    let mut entities = store.fetch_entities().await?;
    let total_entities = entities.len();
    let retired = store.deprecated_entity_ids().await?;
    entities.retain(|e| !retired.contains(&e.id));
    let retired_excluded = total_entities - entities.len();

    logger.log_phase("Generating candidate pairs", Some(&format!("{:?}", strategy)));
    let candidates = generate_candidates(&entities, &dimension, &normalizer, &strategy);
    logger.log_data_loaded(entities.len(), candidates.non_comparable);
    logger.log_pair_generation(candidates.len(), candidates.blocks);

    let mut report = GenerationReport {
        run_id: run_id.clone(),
        dimension: dimension.name.clone(),
        total_entities,
        retired_excluded,
        non_comparable_entities: candidates.non_comparable,
        blocks: candidates.blocks,
        pairs_considered: candidates.len(),
        dry_run,
        ..GenerationReport::default()
    };

    logger.log_batch_processing_start(candidates.len(), config.scoring_batch_size);
    let scoring_start = Instant::now();
    let pb = config
        .progress
        .bar(candidates.len() as u64, "Scoring candidate pairs...");
    let scored = scorer
        .score_candidates(
            &candidates,
            config.scoring_batch_size,
            config.scoring_parallelism,
            &pb,
        )
        .await;
    pb.finish_and_clear();
    report.scoring_time_secs = scoring_start.elapsed().as_secs_f64();

    logger.log_phase("Classifying and enqueueing", None);
    for scored_pair in &scored {
        let recommendation = classifier.classify(scored_pair.confidence);
        match recommendation {
            Recommendation::AutoMerge => report.auto_merge += 1,
            Recommendation::StewardReview => report.steward_review += 1,
            Recommendation::Manual => report.discarded += 1,
        }
        if !classifier.should_enqueue(scored_pair.confidence) || dry_run {
            continue;
        }

        let candidate = NewReviewCandidate {
            pair: scored_pair.pair,
            confidence: scored_pair.confidence,
            recommendation,
            rationale: rationale_for(&candidates, scored_pair, &run_id)?,
            created_by: config.created_by.clone(),
        };
        match store.enqueue_candidate(&candidate).await {
            Ok(review_id) => {
                report.enqueued += 1;
                debug!(
                    "Enqueued review {} for ({}, {}) as {} (conf={:.4})",
                    review_id,
                    scored_pair.pair.left_id,
                    scored_pair.pair.right_id,
                    recommendation,
                    scored_pair.confidence
                );
            }
            Err(ResolutionError::DuplicateCandidate {
                left_id,
                right_id,
                existing_review_id,
            }) => {
                report.duplicates_skipped += 1;
                debug!(
                    "Pair ({}, {}) already OPEN as review {}; skipped",
                    left_id, right_id, existing_review_id
                );
            }
            Err(e) => {
                logger.log_error(&format!(
                    "Enqueue failed for ({}, {}) after {} entries: {}",
                    scored_pair.pair.left_id, scored_pair.pair.right_id, report.enqueued, e
                ));
                return Err(e);
            }
        }
    }

    if dry_run && report.queue_worthy() > 0 {
        logger.log_warning(&format!(
            "Dry run: {} queue-worthy pairs were not enqueued",
            report.queue_worthy()
        ));
    }

    report.total_time_secs = start.elapsed().as_secs_f64();
    logger.log_generation_summary(&report);
    Ok(report)
}

fn rationale_for(
    candidates: &CandidateSet,
    scored: &ScoredPair,
    run_id: &str,
) -> Result<serde_json::Value> {
    let left = candidates.entity(scored.pair.left_id);
    let right = candidates.entity(scored.pair.right_id);
    if left.is_none() || right.is_none() {
        warn!(
            "Rationale for ({}, {}) is missing a projection",
            scored.pair.left_id, scored.pair.right_id
        );
    }
    let rationale = MatchRationale {
        left_value: left.and_then(|e| e.raw_value.clone()),
        right_value: right.and_then(|e| e.raw_value.clone()),
        left_normalized: left.map(|e| e.normalized.clone()).unwrap_or_default(),
        right_normalized: right.map(|e| e.normalized.clone()).unwrap_or_default(),
        breakdown: scored.breakdown.clone(),
        run_id: run_id.to_string(),
    };
    Ok(serde_json::to_value(rationale)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlockingStrategy, MergeConfig};
    use crate::merge::MergeExecutor;
    use crate::models::{Dimension, Entity, OpenCandidateFilter};
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn vendor_store() -> InMemoryStore {
        InMemoryStore::with_entities(
            Dimension::vendor(),
            vec![
                Entity::named(1, "vendor_name", "Creative Mobile Technologies, LLC"),
                Entity::named(2, "vendor_name", "Creative Mobile Technologies LLC"),
                Entity::named(3, "vendor_name", "VeriFone Inc."),
                Entity::named(4, "vendor_name", "VeriFone Inc"),
                Entity::named(5, "vendor_name", "Curb Mobility"),
                Entity::named(6, "vendor_name", ""),
            ],
        )
    }

    #[tokio::test]
    async fn test_generation_enqueues_and_is_rerunnable() {
        let store = vendor_store();
        let config = EngineConfig::default();

        let first = run_candidate_generation(&store, &config, false).await.unwrap();
        assert_eq!(first.total_entities, 6);
        assert_eq!(first.non_comparable_entities, 1);
        assert_eq!(first.pairs_considered, 10);
        assert_eq!(first.auto_merge, 2);
        assert_eq!(first.enqueued, first.queue_worthy());
        assert_eq!(
            first.auto_merge + first.steward_review + first.discarded,
            first.pairs_considered
        );

        let open = store
            .list_open_candidates(&OpenCandidateFilter::auto_merge(0.95))
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|e| e.confidence == 1.0));
        assert_eq!(open[0].rationale["run_id"], first.run_id.as_str());
        assert_eq!(open[0].rationale["jaro_winkler"], 1.0);

        let second = run_candidate_generation(&store, &config, false).await.unwrap();
        assert_eq!(second.enqueued, 0);
        assert_eq!(second.duplicates_skipped, first.enqueued);
        assert_ne!(second.run_id, first.run_id);
    }

    #[tokio::test]
    async fn test_merged_retiree_is_not_paired_again() {
        let store = Arc::new(InMemoryStore::with_entities(
            Dimension::vendor(),
            vec![
                Entity::named(5, "vendor_name", "ABC Cab Co"),
                Entity::named(9, "vendor_name", "ABC Cab Co."),
            ],
        ));
        let config = EngineConfig::default();

        let first = run_candidate_generation(store.as_ref(), &config, false)
            .await
            .unwrap();
        assert_eq!(first.auto_merge, 1);
        assert_eq!(first.enqueued, 1);

        let merges = MergeExecutor::new(store.clone(), MergeConfig::default())
            .run_auto_merges(0.95)
            .await
            .unwrap();
        assert_eq!(merges.merged(), 1);

        let second = run_candidate_generation(store.as_ref(), &config, false)
            .await
            .unwrap();
        assert_eq!(second.total_entities, 2);
        assert_eq!(second.retired_excluded, 1);
        assert_eq!(second.pairs_considered, 0);
        assert_eq!(second.enqueued, 0);
        assert!(store
            .list_open_candidates(&OpenCandidateFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = vendor_store();
        let report = run_candidate_generation(&store, &EngineConfig::default(), true)
            .await
            .unwrap();
        assert!(report.dry_run);
        assert!(report.queue_worthy() > 0);
        assert_eq!(report.enqueued, 0);
        assert!(store
            .list_open_candidates(&OpenCandidateFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_reading() {
        let store = vendor_store();
        let config = EngineConfig {
            blocking: Some(BlockingStrategy::Attributes {
                columns: vec!["borough".to_string()],
            }),
            ..EngineConfig::default()
        };
        let err = run_candidate_generation(&store, &config, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Configuration(_)));
    }
}

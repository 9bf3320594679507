// src/matching/zone_report.rs - Exact and fuzzy duplicate report for a dimension
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::matching::candidates::generate_candidates;
use crate::matching::normalize::Normalizer;
use crate::matching::scoring::SimilarityScorer;
use crate::models::{Dimension, Entity};

pub const DEFAULT_REPORT_THRESHOLD: f64 = 0.92;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactDuplicateGroup {
    /// Normalized attribute values joined with `|`, in dimension order.
    pub composite_key: String,
    pub entity_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyDuplicate {
    pub left_id: i64,
    pub right_id: i64,
    pub left_value: Option<String>,
    pub right_value: Option<String>,
    pub block_key: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub entities: usize,
    pub exact_groups: usize,
    pub exact_entities: usize,
    pub fuzzy_pairs: usize,
}

/// Read-only duplicate survey. Nothing is enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub generated_utc: DateTime<Utc>,
    pub dimension: String,
    pub threshold: f64,
    pub exact_candidates: Vec<ExactDuplicateGroup>,
    pub fuzzy_candidates: Vec<FuzzyDuplicate>,
    pub counts: ReportCounts,
}

fn composite_key(entity: &Entity, dimension: &Dimension, normalizer: &Normalizer) -> String {
    dimension
        .attributes
        .iter()
        .map(|c| normalizer.normalize(entity.attribute(c)))
        .collect::<Vec<_>>()
        .join("|")
}

/// Exact duplicates share every normalized attribute. Fuzzy duplicates are
/// within-block pairs whose normalized match values differ but score at or
/// above `threshold`, highest similarity first.
pub fn build_duplicate_report(
    entities: &[Entity],
    dimension: &Dimension,
    config: &EngineConfig,
    threshold: f64,
) -> DuplicateReport {
    let normalizer = Normalizer::new(config.normalization);
    let scorer = SimilarityScorer::new(config.weights);

    let mut by_key: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for entity in entities {
        by_key
            .entry(composite_key(entity, dimension, &normalizer))
            .or_default()
            .push(entity.id);
    }
    let exact_candidates: Vec<ExactDuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(composite_key, mut entity_ids)| {
            entity_ids.sort_unstable();
            entity_ids.dedup();
            ExactDuplicateGroup {
                composite_key,
                entity_ids,
            }
        })
        .filter(|g| g.entity_ids.len() > 1)
        .collect();

    let strategy = config.blocking_for(dimension);
    let candidates = generate_candidates(entities, dimension, &normalizer, &strategy);
    let mut fuzzy_candidates = Vec::new();
    for pair in &candidates.pairs {
        let (left, right) = match (
            candidates.entity(pair.left_id),
            candidates.entity(pair.right_id),
        ) {
            (Some(l), Some(r)) => (l, r),
            _ => continue,
        };
        if left.normalized == right.normalized {
            continue;
        }
        let (similarity, _) = scorer.score(&left.normalized, &right.normalized);
        if similarity >= threshold {
            fuzzy_candidates.push(FuzzyDuplicate {
                left_id: pair.left_id,
                right_id: pair.right_id,
                left_value: left.raw_value.clone(),
                right_value: right.raw_value.clone(),
                block_key: left.block_key.clone(),
                similarity,
            });
        }
    }
    fuzzy_candidates.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then((a.left_id, a.right_id).cmp(&(b.left_id, b.right_id)))
    });

    let counts = ReportCounts {
        entities: entities.len(),
        exact_groups: exact_candidates.len(),
        exact_entities: exact_candidates.iter().map(|g| g.entity_ids.len()).sum(),
        fuzzy_pairs: fuzzy_candidates.len(),
    };

    DuplicateReport {
        generated_utc: Utc::now(),
        dimension: dimension.name.clone(),
        threshold,
        exact_candidates,
        fuzzy_candidates,
        counts,
    }
}

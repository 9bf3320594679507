// src/matching/candidates.rs - Candidate pair generation (exhaustive or blocked)
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::BlockingStrategy;
use crate::matching::normalize::Normalizer;
use crate::models::{CandidatePair, Dimension, Entity, NormalizedEntity};

/// Deduplicated pairs plus the normalized projections they refer to.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub pairs: BTreeSet<CandidatePair>,
    pub blocks: usize,
    pub non_comparable: usize,
    entities: HashMap<i64, NormalizedEntity>,
}

impl CandidateSet {
    pub fn entity(&self, id: i64) -> Option<&NormalizedEntity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Normalizes the match attribute and computes the block key for one entity.
pub fn project_entity(
    entity: &Entity,
    dimension: &Dimension,
    normalizer: &Normalizer,
    strategy: &BlockingStrategy,
) -> NormalizedEntity {
    let raw_value = entity
        .attribute(&dimension.match_attribute)
        .map(|s| s.to_string());
    let normalized = normalizer.normalize(raw_value.as_deref());
    let block_key = match strategy {
        BlockingStrategy::Exhaustive => String::new(),
        BlockingStrategy::Attributes { columns } => columns
            .iter()
            .map(|c| normalizer.normalize(entity.attribute(c)))
            .collect::<Vec<_>>()
            .join("|"),
        BlockingStrategy::NamePrefix { length } => normalized.chars().take(*length).collect(),
        BlockingStrategy::FirstToken => normalized
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    NormalizedEntity {
        id: entity.id,
        raw_value,
        normalized,
        block_key,
    }
}

/// Produces every within-block unordered pair of comparable entities.
///
/// Entities whose normalized match value is empty never appear in a pair.
/// Pairs across blocks are never generated, and a block of one yields
/// nothing. Duplicate ids in the input keep their first occurrence.
pub fn generate_candidates(
    entities: &[Entity],
    dimension: &Dimension,
    normalizer: &Normalizer,
    strategy: &BlockingStrategy,
) -> CandidateSet {
    let mut seen_ids = HashSet::new();
    let mut non_comparable = 0;
    let mut blocks: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    let mut projected = HashMap::new();

    for entity in entities {
        if !seen_ids.insert(entity.id) {
            debug!("Ignoring repeated entity id {}", entity.id);
            continue;
        }
        let ne = project_entity(entity, dimension, normalizer, strategy);
        if !ne.is_comparable() {
            non_comparable += 1;
            continue;
        }
        blocks.entry(ne.block_key.clone()).or_default().push(ne.id);
        projected.insert(ne.id, ne);
    }

    let mut pairs = BTreeSet::new();
    for members in blocks.values() {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if let Some(pair) = CandidatePair::new(a, b) {
                    pairs.insert(pair);
                }
            }
        }
    }

    debug!(
        "Generated {} candidate pairs from {} blocks ({} non-comparable entities)",
        pairs.len(),
        blocks.len(),
        non_comparable
    );

    CandidateSet {
        pairs,
        blocks: blocks.len(),
        non_comparable,
        entities: projected,
    }
}

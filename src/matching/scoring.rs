// src/matching/scoring.rs - Pairwise similarity scoring
use indicatif::ProgressBar;
use log::{debug, warn};
use std::sync::Arc;
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::config::ScorerWeights;
use crate::matching::candidates::CandidateSet;
use crate::models::{CandidatePair, ScoreBreakdown, ScoredPair};

/// Weighted blend of a prefix-weighted metric (Jaro-Winkler) and an edit
/// ratio (normalized Levenshtein). Pure, so it can run on any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    weights: ScorerWeights,
}

impl SimilarityScorer {
    pub fn new(weights: ScorerWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScorerWeights {
        &self.weights
    }

    /// Confidence in [0, 1] plus the metric values behind it.
    ///
    /// Inputs are put in a fixed order first, so `score(a, b)` and
    /// `score(b, a)` are bit-identical.
    pub fn score(&self, a: &str, b: &str) -> (f64, ScoreBreakdown) {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let (jw, edit) = if first == second {
            (1.0, 1.0)
        } else {
            (
                clamp_unit(jaro_winkler(first, second)),
                clamp_unit(normalized_levenshtein(first, second)),
            )
        };

        let confidence = if first == second {
            1.0
        } else {
            clamp_unit(self.weights.prefix_weighted * jw + self.weights.edit_ratio * edit)
        };

        (
            confidence,
            ScoreBreakdown {
                jaro_winkler: jw,
                edit_ratio: edit,
                prefix_weight: self.weights.prefix_weighted,
                edit_weight: self.weights.edit_ratio,
            },
        )
    }

    pub fn score_pair(&self, pair: CandidatePair, a: &str, b: &str) -> ScoredPair {
        let (confidence, breakdown) = self.score(a, b);
        ScoredPair {
            pair,
            confidence,
            breakdown,
        }
    }

    fn score_batch(&self, batch: &[(CandidatePair, String, String)]) -> Vec<ScoredPair> {
        batch
            .iter()
            .map(|(pair, a, b)| self.score_pair(*pair, a, b))
            .collect()
    }

    /// Scores every pair in the set on the blocking pool, `parallelism`
    /// batches at a time. The result is ordered by pair regardless of which
    /// batch finished first.
    pub async fn score_candidates(
        &self,
        candidates: &CandidateSet,
        batch_size: usize,
        parallelism: usize,
        progress: &ProgressBar,
    ) -> Vec<ScoredPair> {
        let work: Vec<(CandidatePair, String, String)> = candidates
            .pairs
            .iter()
            .filter_map(|pair| {
                let left = candidates.entity(pair.left_id)?;
                let right = candidates.entity(pair.right_id)?;
                Some((*pair, left.normalized.clone(), right.normalized.clone()))
            })
            .collect();

        let batch_size = batch_size.max(1);
        let parallelism = parallelism.max(1);
        let mut scored = Vec::with_capacity(work.len());

        for (chunk_idx, chunk) in work.chunks(batch_size * parallelism).enumerate() {
            let batches: Vec<Arc<Vec<(CandidatePair, String, String)>>> = chunk
                .chunks(batch_size)
                .map(|b| Arc::new(b.to_vec()))
                .collect();

            let handles = batches.iter().map(|batch| {
                let scorer = *self;
                let task_batch = Arc::clone(batch);
                tokio::task::spawn_blocking(move || scorer.score_batch(&task_batch))
            });
            let results = futures::future::join_all(handles).await;

            for (batch, result) in batches.iter().zip(results) {
                match result {
                    Ok(batch_scores) => scored.extend(batch_scores),
                    Err(e) => {
                        warn!(
                            "Scoring task in chunk {} failed ({}); rescoring {} pairs inline",
                            chunk_idx,
                            e,
                            batch.len()
                        );
                        scored.extend(self.score_batch(batch));
                    }
                }
                progress.inc(batch.len() as u64);
            }
            debug!("Scored chunk {} ({} pairs so far)", chunk_idx + 1, scored.len());
        }

        scored.sort_by(|a, b| a.pair.cmp(&b.pair));
        scored
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockingStrategy;
    use crate::matching::candidates::generate_candidates;
    use crate::matching::normalize::Normalizer;
    use crate::models::{Dimension, Entity};

    #[test]
    fn test_identical_strings_score_one() {
        let scorer = SimilarityScorer::default();
        let (score, breakdown) = scorer.score("abc cab company", "abc cab company");
        assert_eq!(score, 1.0);
        assert_eq!(breakdown.jaro_winkler, 1.0);
        assert_eq!(breakdown.edit_ratio, 1.0);
    }

    #[test]
    fn test_score_is_symmetric_and_bounded() {
        let scorer = SimilarityScorer::default();
        let (ab, _) = scorer.score("nyc taxi co", "nyc taxi company");
        let (ba, _) = scorer.score("nyc taxi company", "nyc taxi co");
        assert_eq!(ab.to_bits(), ba.to_bits());
        assert!(ab > 0.8 && ab < 1.0);

        let (far, _) = scorer.score("verifone", "creative mobile technologies");
        assert!((0.0..0.8).contains(&far));
    }

    #[test]
    fn test_weights_shift_the_blend() {
        let prefix_only = SimilarityScorer::new(ScorerWeights {
            prefix_weighted: 1.0,
            edit_ratio: 0.0,
        });
        let (score, breakdown) = prefix_only.score("abc cab co", "abc cab company");
        assert!((score - breakdown.jaro_winkler).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_parallel_scoring_matches_sequential() {
        let names = [
            "ABC Cab Co",
            "ABC Cab Company",
            "Creative Mobile Technologies",
            "Creative Mobile Tech",
            "VeriFone Inc",
            "Verifone",
        ];
        let entities: Vec<Entity> = names
            .iter()
            .enumerate()
            .map(|(i, n)| Entity::named(i as i64 + 1, "vendor_name", n))
            .collect();
        let set = generate_candidates(
            &entities,
            &Dimension::vendor(),
            &Normalizer::default(),
            &BlockingStrategy::Exhaustive,
        );
        let scorer = SimilarityScorer::default();

        let parallel = scorer
            .score_candidates(&set, 2, 3, &ProgressBar::hidden())
            .await;
        assert_eq!(parallel.len(), 15);

        for scored in &parallel {
            let left = set.entity(scored.pair.left_id).unwrap();
            let right = set.entity(scored.pair.right_id).unwrap();
            let (expected, _) = scorer.score(&left.normalized, &right.normalized);
            assert_eq!(scored.confidence.to_bits(), expected.to_bits());
        }
        assert!(parallel.windows(2).all(|w| w[0].pair < w[1].pair));
    }
}

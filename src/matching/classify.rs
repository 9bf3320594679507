// src/matching/classify.rs
use crate::config::Thresholds;
use crate::error::Result;
use crate::models::Recommendation;

/// Maps a confidence score to a recommendation using two validated thresholds.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    /// Fails with a configuration error unless both thresholds lie in [0, 1]
    /// and `auto_merge > steward_review`.
    pub fn new(thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn classify(&self, score: f64) -> Recommendation {
        if score >= self.thresholds.auto_merge {
            Recommendation::AutoMerge
        } else if score >= self.thresholds.steward_review {
            Recommendation::StewardReview
        } else {
            Recommendation::Manual
        }
    }

    /// Only pairs at or above the review threshold reach the queue.
    pub fn should_enqueue(&self, score: f64) -> bool {
        score >= self.thresholds.steward_review
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;

    fn classifier() -> Classifier {
        Classifier::new(Thresholds {
            auto_merge: 0.95,
            steward_review: 0.80,
        })
        .unwrap()
    }

    #[test]
    fn test_three_bands() {
        let c = classifier();
        assert_eq!(c.classify(0.97), Recommendation::AutoMerge);
        assert_eq!(c.classify(0.85), Recommendation::StewardReview);
        assert_eq!(c.classify(0.50), Recommendation::Manual);
        assert!(c.should_enqueue(0.97));
        assert!(c.should_enqueue(0.85));
        assert!(!c.should_enqueue(0.50));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let c = classifier();
        assert_eq!(c.classify(0.95), Recommendation::AutoMerge);
        assert_eq!(c.classify(0.80), Recommendation::StewardReview);
        assert!(c.should_enqueue(0.80));
        assert_eq!(c.classify(0.7999), Recommendation::Manual);
    }

    #[test]
    fn test_invalid_thresholds_refuse_construction() {
        let err = Classifier::new(Thresholds {
            auto_merge: 0.7,
            steward_review: 0.9,
        })
        .unwrap_err();
        assert!(matches!(err, ResolutionError::Configuration(_)));
    }
}

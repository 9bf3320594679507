pub mod core;
pub mod matching;
pub mod queue;
pub mod stats_models;

pub use self::core::{
    AuditEvent, AuditFields, AuditStamp, Dimension, Entity, LifecycleRecord, LifecycleState,
};
pub use matching::{
    CandidatePair, MatchRationale, NormalizedEntity, Recommendation, ScoreBreakdown, ScoredPair,
};
pub use queue::{
    NewReviewCandidate, OpenCandidateFilter, ReviewQueueEntry, ReviewStatus, ReviewTransition,
};
pub use stats_models::{
    GenerationReport, LifecycleProfile, MergeOutcome, MergeOutcomeStatus, MergeRunReport,
};

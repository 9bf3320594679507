// src/error.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::queue::ReviewStatus;

/// Typed failures surfaced by the resolution engine.
///
/// Normalization, scoring and classification never fail; everything that
/// touches the store returns one of these so a batch runner can decide
/// retry-vs-abort per kind.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate candidate: an OPEN review entry ({existing_review_id}) already exists for pair ({left_id}, {right_id})")]
    DuplicateCandidate {
        left_id: i64,
        right_id: i64,
        existing_review_id: i64,
    },

    #[error("Invalid transition for review {review_id}: {from} -> {to}")]
    InvalidTransition {
        review_id: i64,
        from: ReviewStatus,
        to: ReviewStatus,
    },

    #[error("Version conflict on entity {entity_id}: expected version {expected}, found {found}")]
    VersionConflict {
        entity_id: i64,
        expected: i64,
        found: i64,
    },

    #[error("Entity {entity_id} is already DEPRECATED")]
    EntityRetired { entity_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<tokio_postgres::Error> for ResolutionError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<bb8::RunError<tokio_postgres::Error>> for ResolutionError {
    fn from(err: bb8::RunError<tokio_postgres::Error>) -> Self {
        Self::Persistence(format!("connection pool: {}", err))
    }
}

impl From<serde_json::Error> for ResolutionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("serialization: {}", err))
    }
}

impl ResolutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolutionError::Configuration(_) => FailureKind::Configuration,
            ResolutionError::DuplicateCandidate { .. } => FailureKind::DuplicateCandidate,
            ResolutionError::InvalidTransition { .. } => FailureKind::InvalidTransition,
            ResolutionError::VersionConflict { .. } => FailureKind::VersionConflict,
            ResolutionError::EntityRetired { .. } => FailureKind::EntityRetired,
            ResolutionError::NotFound(_) => FailureKind::NotFound,
            ResolutionError::Persistence(_) => FailureKind::Persistence,
        }
    }

    /// Version conflicts can be retried after a fresh read; store failures
    /// are safe to retry because the transaction was rolled back.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolutionError::VersionConflict { .. } | ResolutionError::Persistence(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    Configuration,
    DuplicateCandidate,
    InvalidTransition,
    VersionConflict,
    EntityRetired,
    NotFound,
    Persistence,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "CONFIGURATION",
            FailureKind::DuplicateCandidate => "DUPLICATE_CANDIDATE",
            FailureKind::InvalidTransition => "INVALID_TRANSITION",
            FailureKind::VersionConflict => "VERSION_CONFLICT",
            FailureKind::EntityRetired => "ENTITY_RETIRED",
            FailureKind::NotFound => "NOT_FOUND",
            FailureKind::Persistence => "PERSISTENCE",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let conflict = ResolutionError::VersionConflict {
            entity_id: 5,
            expected: 1,
            found: 2,
        };
        assert!(conflict.is_retryable());
        assert_eq!(conflict.kind(), FailureKind::VersionConflict);

        let transition = ResolutionError::InvalidTransition {
            review_id: 1,
            from: ReviewStatus::Merged,
            to: ReviewStatus::Rejected,
        };
        assert!(!transition.is_retryable());
        assert_eq!(
            transition.to_string(),
            "Invalid transition for review 1: MERGED -> REJECTED"
        );
    }
}

// src/config.rs - Engine configuration: defaults, TOML rules file, environment overrides
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{ResolutionError, Result};
use crate::models::Dimension;
use crate::utils::progress_bars::progress_config::ProgressConfig;

pub const DEFAULT_AUTO_MERGE_THRESHOLD: f64 = 0.95;
pub const DEFAULT_STEWARD_REVIEW_THRESHOLD: f64 = 0.80;
pub const DEFAULT_PREFIX_WEIGHT: f64 = 0.55;
pub const DEFAULT_EDIT_WEIGHT: f64 = 0.45;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub auto_merge: f64,
    pub steward_review: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_merge: DEFAULT_AUTO_MERGE_THRESHOLD,
            steward_review: DEFAULT_STEWARD_REVIEW_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("thresholds.auto_merge", self.auto_merge),
            ("thresholds.steward_review", self.steward_review),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ResolutionError::Configuration(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.auto_merge <= self.steward_review {
            return Err(ResolutionError::Configuration(format!(
                "thresholds.auto_merge ({}) must be strictly greater than thresholds.steward_review ({})",
                self.auto_merge, self.steward_review
            )));
        }
        Ok(())
    }
}

/// Normalization toggles. Steps always run in the order
/// lowercase, strip punctuation, collapse whitespace, trim, strip legal suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub collapse_whitespace: bool,
    pub trim: bool,
    pub strip_legal_suffixes: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            collapse_whitespace: true,
            trim: true,
            strip_legal_suffixes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScorerWeights {
    /// Jaro-Winkler weight.
    pub prefix_weighted: f64,
    /// Normalized Levenshtein weight.
    pub edit_ratio: f64,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            prefix_weighted: DEFAULT_PREFIX_WEIGHT,
            edit_ratio: DEFAULT_EDIT_WEIGHT,
        }
    }
}

impl ScorerWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weights.prefix_weighted", self.prefix_weighted),
            ("weights.edit_ratio", self.edit_ratio),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ResolutionError::Configuration(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        let sum = self.prefix_weighted + self.edit_ratio;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ResolutionError::Configuration(format!(
                "scorer weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

/// How candidate pairs are generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case", deny_unknown_fields)]
pub enum BlockingStrategy {
    /// Every unordered pair. Fine for dimensions in the low hundreds.
    Exhaustive,
    /// Bucket by the normalized values of these columns.
    Attributes { columns: Vec<String> },
    /// Bucket by the first `length` characters of the normalized match value.
    NamePrefix { length: usize },
    /// Bucket by the first token of the normalized match value.
    FirstToken,
}

impl Default for BlockingStrategy {
    fn default() -> Self {
        BlockingStrategy::Exhaustive
    }
}

impl BlockingStrategy {
    /// Default blocking for a dimension: zones block on borough + service zone.
    pub fn default_for(dimension: &Dimension) -> Self {
        if dimension.has_attribute("borough") && dimension.has_attribute("service_zone") {
            BlockingStrategy::Attributes {
                columns: vec!["borough".to_string(), "service_zone".to_string()],
            }
        } else {
            BlockingStrategy::Exhaustive
        }
    }

    pub fn validate_for(&self, dimension: &Dimension) -> Result<()> {
        match self {
            BlockingStrategy::Exhaustive | BlockingStrategy::FirstToken => Ok(()),
            BlockingStrategy::NamePrefix { length } => {
                if *length == 0 {
                    return Err(ResolutionError::Configuration(
                        "blocking.length must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            BlockingStrategy::Attributes { columns } => {
                if columns.is_empty() {
                    return Err(ResolutionError::Configuration(
                        "blocking.columns must be non-empty".to_string(),
                    ));
                }
                if let Some(unknown) = columns.iter().find(|c| !dimension.has_attribute(c)) {
                    return Err(ResolutionError::Configuration(format!(
                        "blocking column '{}' is not an attribute of dimension '{}'",
                        unknown, dimension.name
                    )));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub actor: String,
    pub approved_by: String,
    /// Extra attempts after a version conflict, each with a fresh read.
    pub retry_limit: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            actor: "auto_merge".to_string(),
            approved_by: "auto_merge_bot".to_string(),
            retry_limit: 2,
        }
    }
}

/// Single configuration object handed to the engine at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub normalization: NormalizationConfig,
    pub weights: ScorerWeights,
    /// `None` picks the dimension default.
    pub blocking: Option<BlockingStrategy>,
    pub scoring_parallelism: usize,
    pub scoring_batch_size: usize,
    pub created_by: String,
    pub merge: MergeConfig,
    #[serde(skip)]
    pub progress: ProgressConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            normalization: NormalizationConfig::default(),
            weights: ScorerWeights::default(),
            blocking: None,
            scoring_parallelism: num_cpus::get().max(1),
            scoring_batch_size: 2_000,
            created_by: "data_engineer".to_string(),
            merge: MergeConfig::default(),
            progress: ProgressConfig::disabled(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML rules file. Missing sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| ResolutionError::Configuration(format!("invalid rules file: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ResolutionError::Configuration(format!(
                "failed to read rules file {}: {}",
                path.display(),
                e
            ))
        })?;
        let cfg = Self::from_toml_str(&raw)?;
        info!("Loaded match rules from {}", path.display());
        Ok(cfg)
    }

    /// Defaults, then the rules file (explicit path or `MATCH_RULES`), then
    /// environment overrides.
    pub fn resolve(rules_path: Option<&Path>) -> Result<Self> {
        let env_rules = env::var("MATCH_RULES").ok().filter(|s| !s.trim().is_empty());
        let mut cfg = match (rules_path, env_rules.as_deref()) {
            (Some(path), _) => Self::load(path)?,
            (None, Some(path)) => Self::load(Path::new(path))?,
            (None, None) => Self::default(),
        };
        cfg.apply_env_overrides()?;
        cfg.progress = ProgressConfig::from_env();
        Ok(cfg)
    }

    /// Applies `AUTO_THRESHOLD`, `STEWARD_REVIEW_THRESHOLD`, `MERGE_ACTOR`,
    /// `APPROVED_BY`, `CREATED_BY` and `SCORING_PARALLELISM`. Unparseable
    /// values are configuration errors, not silent fallbacks.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_f64("AUTO_THRESHOLD")? {
            self.thresholds.auto_merge = v;
        }
        if let Some(v) = env_f64("STEWARD_REVIEW_THRESHOLD")? {
            self.thresholds.steward_review = v;
        }
        if let Some(v) = env_string("MERGE_ACTOR") {
            self.merge.actor = v;
        }
        if let Some(v) = env_string("APPROVED_BY") {
            self.merge.approved_by = v;
        }
        if let Some(v) = env_string("CREATED_BY") {
            self.created_by = v;
        }
        if let Some(raw) = env_string("SCORING_PARALLELISM") {
            self.scoring_parallelism = raw.parse().map_err(|_| {
                ResolutionError::Configuration(format!(
                    "SCORING_PARALLELISM must be a positive integer, got '{}'",
                    raw
                ))
            })?;
        }
        debug!("Engine config after env overrides: {:?}", self);
        Ok(())
    }

    pub fn blocking_for(&self, dimension: &Dimension) -> BlockingStrategy {
        self.blocking
            .clone()
            .unwrap_or_else(|| BlockingStrategy::default_for(dimension))
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.weights.validate()?;
        if self.scoring_parallelism == 0 {
            return Err(ResolutionError::Configuration(
                "scoring_parallelism must be greater than zero".to_string(),
            ));
        }
        if self.scoring_batch_size == 0 {
            return Err(ResolutionError::Configuration(
                "scoring_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.merge.actor.trim().is_empty() || self.merge.approved_by.trim().is_empty() {
            return Err(ResolutionError::Configuration(
                "merge.actor and merge.approved_by must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_for(&self, dimension: &Dimension) -> Result<()> {
        self.validate()?;
        if !dimension.has_attribute(&dimension.match_attribute) {
            return Err(ResolutionError::Configuration(format!(
                "match attribute '{}' is not an attribute of dimension '{}'",
                dimension.match_attribute, dimension.name
            )));
        }
        self.blocking_for(dimension).validate_for(dimension)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
            ResolutionError::Configuration(format!("{} must be a number, got '{}'", key, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_for(&Dimension::vendor()).is_ok());
        assert!(cfg.validate_for(&Dimension::zone()).is_ok());
    }

    #[test]
    fn test_threshold_ordering_is_enforced() {
        let thresholds = Thresholds {
            auto_merge: 0.80,
            steward_review: 0.80,
        };
        assert!(matches!(
            thresholds.validate(),
            Err(ResolutionError::Configuration(_))
        ));

        let out_of_range = Thresholds {
            auto_merge: 1.2,
            steward_review: 0.8,
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = ScorerWeights {
            prefix_weighted: 0.6,
            edit_ratio: 0.6,
        };
        assert!(weights.validate().is_err());

        let weights = ScorerWeights {
            prefix_weighted: 0.7,
            edit_ratio: 0.3,
        };
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_rules_file_parsing() {
        let raw = r#"
            created_by = "mdm_bot"

            [thresholds]
            auto_merge = 0.97
            steward_review = 0.85

            [normalization]
            strip_punctuation = false

            [blocking]
            strategy = "name_prefix"
            length = 3
        "#;
        let cfg = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(cfg.thresholds.auto_merge, 0.97);
        assert_eq!(cfg.thresholds.steward_review, 0.85);
        assert!(!cfg.normalization.strip_punctuation);
        assert!(cfg.normalization.lowercase);
        assert_eq!(cfg.weights, ScorerWeights::default());
        assert_eq!(cfg.blocking, Some(BlockingStrategy::NamePrefix { length: 3 }));
        assert_eq!(cfg.created_by, "mdm_bot");
    }

    #[test]
    fn test_unknown_blocking_column_rejected() {
        let cfg = EngineConfig {
            blocking: Some(BlockingStrategy::Attributes {
                columns: vec!["borough".to_string()],
            }),
            ..EngineConfig::default()
        };
        assert!(cfg.validate_for(&Dimension::zone()).is_ok());
        assert!(cfg.validate_for(&Dimension::vendor()).is_err());
    }

    #[test]
    fn test_misspelled_rules_keys_are_rejected() {
        let err = EngineConfig::from_toml_str(
            "[thresholds]\nauto_merge_threshold = 0.99\nsteward_reviw = 0.9",
        )
        .unwrap_err();
        assert!(matches!(err, ResolutionError::Configuration(_)));

        assert!(EngineConfig::from_toml_str("scoring_paralelism = 4").is_err());
        assert!(EngineConfig::from_toml_str("[merge]\nretry_limt = 5").is_err());
        assert!(EngineConfig::from_toml_str("[weights]\nprefix = 0.5").is_err());
        assert!(EngineConfig::from_toml_str("[normalization]\nstrip_suffixes = true").is_err());
        assert!(EngineConfig::from_toml_str(
            "[blocking]\nstrategy = \"attributes\"\ncolumns = [\"borough\"]\ncolumn = \"zone\""
        )
        .is_err());
    }

    #[test]
    fn test_zone_dimension_blocks_by_default() {
        let cfg = EngineConfig::default();
        assert_eq!(
            cfg.blocking_for(&Dimension::zone()),
            BlockingStrategy::Attributes {
                columns: vec!["borough".to_string(), "service_zone".to_string()],
            }
        );
        assert_eq!(cfg.blocking_for(&Dimension::vendor()), BlockingStrategy::Exhaustive);
    }
}

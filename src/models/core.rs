// src/models/core.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A master dimension the engine resolves duplicates in, plus the tables it
/// reads and writes for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub entity_table: String,
    pub id_column: String,
    /// Descriptive columns, in display order. The merge rule runs over all of them.
    pub attributes: Vec<String>,
    /// Column compared by the scorer.
    pub match_attribute: String,
    pub lifecycle_table: String,
    pub review_queue_table: String,
    /// Queue columns holding the smaller and larger id of a pair.
    pub queue_left_column: String,
    pub queue_right_column: String,
}

impl Dimension {
    pub fn vendor() -> Self {
        Self {
            name: "vendor".to_string(),
            entity_table: "mdm.dim_vendor".to_string(),
            id_column: "vendor_id".to_string(),
            attributes: vec!["vendor_name".to_string()],
            match_attribute: "vendor_name".to_string(),
            lifecycle_table: "mdm.vendor_lifecycle".to_string(),
            review_queue_table: "mdm.vendor_review_queue".to_string(),
            queue_left_column: "left_vendor_id".to_string(),
            queue_right_column: "right_vendor_id".to_string(),
        }
    }

    pub fn zone() -> Self {
        Self {
            name: "zone".to_string(),
            entity_table: "mdm.dim_zone".to_string(),
            id_column: "location_id".to_string(),
            attributes: vec![
                "borough".to_string(),
                "zone".to_string(),
                "service_zone".to_string(),
            ],
            match_attribute: "zone".to_string(),
            lifecycle_table: "mdm.zone_lifecycle".to_string(),
            review_queue_table: "mdm.zone_review_queue".to_string(),
            queue_left_column: "left_location_id".to_string(),
            queue_right_column: "right_location_id".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "vendor" => Some(Self::vendor()),
            "zone" => Some(Self::zone()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, column: &str) -> bool {
        self.attributes.iter().any(|a| a == column)
    }
}

/// Who did what, and when, to an entity or lifecycle row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_by: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Actor stamp applied by a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub updated_by: String,
    pub approved_by: String,
    pub at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn now(updated_by: &str, approved_by: &str) -> Self {
        Self {
            updated_by: updated_by.to_string(),
            approved_by: approved_by.to_string(),
            at: Utc::now(),
        }
    }
}

/// A record in a master dimension. Identifiers are immutable and the version
/// only ever increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub attributes: BTreeMap<String, String>,
    pub version: i64,
    pub audit: AuditFields,
}

impl Entity {
    pub fn new(id: i64, attributes: BTreeMap<String, String>) -> Self {
        Self {
            id,
            attributes,
            version: 1,
            audit: AuditFields::default(),
        }
    }

    /// Convenience constructor for single-attribute dimensions.
    pub fn named(id: i64, column: &str, value: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(column.to_string(), value.to_string());
        Self::new(id, attributes)
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(|s| s.as_str())
    }

    /// Number of non-blank attributes, used by completeness-based survivor policies.
    pub fn populated_attribute_count(&self) -> usize {
        self.attributes
            .values()
            .filter(|v| !v.trim().is_empty())
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    Deprecated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Deprecated => "DEPRECATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(LifecycleState::Active),
            "DEPRECATED" => Some(LifecycleState::Deprecated),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-to-one with an entity identifier; upserted, never duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub entity_id: i64,
    pub state: LifecycleState,
    pub reason: String,
    pub audit: AuditFields,
}

/// Append-only record of a resolution decision applied to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub dimension: String,
    pub review_id: i64,
    pub action: String,
    pub survivor_id: Option<i64>,
    pub retiree_id: Option<i64>,
    pub confidence: f64,
    pub details: serde_json::Value,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn touches(&self, entity_id: i64) -> bool {
        self.survivor_id == Some(entity_id) || self.retiree_id == Some(entity_id)
    }
}

// src/merge/policy.rs - Survivor selection and attribute merge strategies
use std::collections::BTreeMap;

use crate::models::{Dimension, Entity};

/// Picks which of two entities survives a merge. Must be deterministic and
/// independent of argument order.
pub trait SurvivorPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `(survivor_id, retiree_id)`.
    fn select(&self, a: &Entity, b: &Entity) -> (i64, i64);
}

/// Combines survivor and retiree attribute values.
pub trait AttributeMergeRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn merge_value<'a>(&self, survivor: Option<&'a str>, retiree: Option<&'a str>)
        -> Option<&'a str>;

    /// Applies `merge_value` to every attribute of the dimension.
    fn merge(
        &self,
        dimension: &Dimension,
        survivor: &Entity,
        retiree: &Entity,
    ) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for column in &dimension.attributes {
            if let Some(value) =
                self.merge_value(survivor.attribute(column), retiree.attribute(column))
            {
                merged.insert(column.clone(), value.to_string());
            }
        }
        merged
    }
}

/// The numerically smaller identifier survives.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallerIdSurvives;

impl SurvivorPolicy for SmallerIdSurvives {
    fn name(&self) -> &'static str {
        "smaller_id"
    }

    fn select(&self, a: &Entity, b: &Entity) -> (i64, i64) {
        (a.id.min(b.id), a.id.max(b.id))
    }
}

/// The entity with more populated attributes survives; ties fall back to
/// the smaller identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostCompleteSurvives;

impl SurvivorPolicy for MostCompleteSurvives {
    fn name(&self) -> &'static str {
        "most_complete"
    }

    fn select(&self, a: &Entity, b: &Entity) -> (i64, i64) {
        let (ca, cb) = (a.populated_attribute_count(), b.populated_attribute_count());
        if ca > cb {
            (a.id, b.id)
        } else if cb > ca {
            (b.id, a.id)
        } else {
            SmallerIdSurvives.select(a, b)
        }
    }
}

/// Longest non-blank value wins, measured in characters. Equal lengths keep
/// the survivor's value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestNonEmptyWins;

impl AttributeMergeRule for LongestNonEmptyWins {
    fn name(&self) -> &'static str {
        "longest_non_empty"
    }

    fn merge_value<'a>(
        &self,
        survivor: Option<&'a str>,
        retiree: Option<&'a str>,
    ) -> Option<&'a str> {
        let survivor_value = survivor.filter(|s| !s.trim().is_empty());
        let retiree_value = retiree.filter(|s| !s.trim().is_empty());
        match (survivor_value, retiree_value) {
            (Some(s), Some(r)) => {
                if r.chars().count() > s.chars().count() {
                    Some(r)
                } else {
                    Some(s)
                }
            }
            (Some(s), None) => Some(s),
            (None, Some(r)) => Some(r),
            // Nothing better on either side: leave the survivor as it was.
            (None, None) => survivor,
        }
    }
}

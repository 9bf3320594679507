// src/store/postgres.rs - tokio-postgres implementation of the store port
use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, Row};

use super::{MergePlan, ResolutionStore};
use crate::error::{ResolutionError, Result};
use crate::models::{
    AuditEvent, AuditFields, AuditStamp, Dimension, Entity, LifecycleRecord, LifecycleState,
    NewReviewCandidate, OpenCandidateFilter, Recommendation, ReviewQueueEntry, ReviewStatus,
    ReviewTransition,
};
use crate::utils::db_connect::PgPool;

const SCHEMA_TEMPLATE: &str = include_str!("../../sql/schema.sql");

static SAFE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)?$").expect("identifier pattern is valid")
});

/// Schema DDL with the dimension's table and column names filled in.
pub fn render_schema(dimension: &Dimension) -> String {
    let queue_index = dimension
        .review_queue_table
        .rsplit('.')
        .next()
        .unwrap_or(&dimension.review_queue_table);
    SCHEMA_TEMPLATE
        .replace("{entity_table}", &dimension.entity_table)
        .replace("{id_column}", &dimension.id_column)
        .replace("{lifecycle_table}", &dimension.lifecycle_table)
        .replace("{review_queue_table}", &dimension.review_queue_table)
        .replace("{review_queue_index}", queue_index)
        .replace("{queue_left_column}", &dimension.queue_left_column)
        .replace("{queue_right_column}", &dimension.queue_right_column)
}

/// Store backed by the `mdm` schema. Table and column names come from the
/// dimension and are checked once at construction, since they are spliced
/// into SQL text.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    dimension: Dimension,
}

impl PgStore {
    pub fn new(pool: PgPool, dimension: Dimension) -> Result<Self> {
        let mut identifiers = vec![
            &dimension.entity_table,
            &dimension.id_column,
            &dimension.lifecycle_table,
            &dimension.review_queue_table,
            &dimension.match_attribute,
            &dimension.queue_left_column,
            &dimension.queue_right_column,
        ];
        identifiers.extend(dimension.attributes.iter());
        if let Some(bad) = identifiers.iter().find(|s| !SAFE_IDENTIFIER.is_match(s)) {
            return Err(ResolutionError::Configuration(format!(
                "'{}' is not a valid table or column name for dimension '{}'",
                bad, dimension.name
            )));
        }
        Ok(Self { pool, dimension })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates lifecycle, review queue and audit tables for this dimension
    /// and adds the version/audit columns to the entity table if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(&render_schema(&self.dimension)).await?;
        info!(
            "Schema ready for dimension '{}' ({}, {})",
            self.dimension.name, self.dimension.lifecycle_table, self.dimension.review_queue_table
        );
        Ok(())
    }

    /// Queue columns under the names `queue_entry_from_row` reads.
    fn queue_columns(&self) -> String {
        format!(
            "review_id::bigint AS review_id, {l}::bigint AS left_entity_id, \
             {r}::bigint AS right_entity_id, confidence::float8 AS confidence, recommendation, \
             rationale::jsonb AS rationale, status, created_by, created_at::timestamptz AS created_at, \
             reviewed_by, reviewed_at::timestamptz AS reviewed_at, decision_notes",
            l = self.dimension.queue_left_column,
            r = self.dimension.queue_right_column
        )
    }

    fn lifecycle_columns(&self) -> String {
        format!(
            "{id}::bigint AS entity_id, lifecycle_state, COALESCE(state_reason, '') AS reason, \
             created_by, approved_by, approved_at::timestamptz AS approved_at, updated_by, \
             updated_at::timestamptz AS updated_at",
            id = self.dimension.id_column
        )
    }

    fn entity_select(&self) -> String {
        let attrs = self
            .dimension
            .attributes
            .iter()
            .map(|a| format!("{a}::text AS {a}", a = a))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {id}::bigint AS entity_id, {attrs}, COALESCE(version, 1)::bigint AS version, \
             created_by, approved_by, approved_at::timestamptz AS approved_at, \
             updated_by, updated_at::timestamptz AS updated_at \
             FROM {table}",
            id = self.dimension.id_column,
            attrs = attrs,
            table = self.dimension.entity_table
        )
    }

    fn entity_from_row(&self, row: &Row) -> Result<Entity> {
        let mut attributes = BTreeMap::new();
        for column in &self.dimension.attributes {
            let value: Option<String> = row.try_get(column.as_str())?;
            if let Some(v) = value {
                attributes.insert(column.clone(), v);
            }
        }
        Ok(Entity {
            id: row.try_get("entity_id")?,
            attributes,
            version: row.try_get("version")?,
            audit: AuditFields {
                created_by: row.try_get("created_by")?,
                approved_by: row.try_get("approved_by")?,
                approved_at: row.try_get("approved_at")?,
                updated_by: row.try_get("updated_by")?,
                updated_at: row.try_get("updated_at")?,
            },
        })
    }

    async fn load_entity<C: GenericClient>(&self, client: &C, entity_id: i64) -> Result<Entity> {
        let sql = format!(
            "{} WHERE {} = $1::bigint",
            self.entity_select(),
            self.dimension.id_column
        );
        let row = client
            .query_opt(sql.as_str(), &[&entity_id])
            .await?
            .ok_or_else(|| ResolutionError::NotFound(format!("entity {}", entity_id)))?;
        self.entity_from_row(&row)
    }

    async fn update_entity_with<C: GenericClient>(
        &self,
        client: &C,
        entity_id: i64,
        attributes: &BTreeMap<String, String>,
        version_expected: i64,
        stamp: &AuditStamp,
    ) -> Result<Entity> {
        let values: Vec<Option<String>> = self
            .dimension
            .attributes
            .iter()
            .map(|c| attributes.get(c).cloned())
            .collect();
        let n = values.len();
        let assignments = self
            .dimension
            .attributes
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} SET {assignments}, version = version + 1, \
             updated_by = ${ub}, updated_at = now(), approved_by = ${ab}, approved_at = now() \
             WHERE {id} = ${idp}::bigint AND version = ${vp}::bigint",
            table = self.dimension.entity_table,
            assignments = assignments,
            ub = n + 1,
            ab = n + 2,
            id = self.dimension.id_column,
            idp = n + 3,
            vp = n + 4,
        );

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(n + 4);
        for v in &values {
            params.push(v);
        }
        params.push(&stamp.updated_by);
        params.push(&stamp.approved_by);
        params.push(&entity_id);
        params.push(&version_expected);

        let updated = client.execute(sql.as_str(), &params).await?;
        if updated == 0 {
            // Tell a missing row apart from a stale version.
            let current = self.load_entity(client, entity_id).await?;
            return Err(ResolutionError::VersionConflict {
                entity_id,
                expected: version_expected,
                found: current.version,
            });
        }
        debug!(
            "Updated {} {} to version {}",
            self.dimension.name,
            entity_id,
            version_expected + 1
        );
        self.load_entity(client, entity_id).await
    }

    async fn upsert_lifecycle_with<C: GenericClient>(
        &self,
        client: &C,
        entity_id: i64,
        state: LifecycleState,
        reason: &str,
        stamp: &AuditStamp,
    ) -> Result<LifecycleRecord> {
        let sql = format!(
            "INSERT INTO {lc} ({id}, lifecycle_state, state_reason, created_by, approved_by, approved_at, updated_by, updated_at) \
             VALUES ($1::bigint, $2, $3, $4, $5, now(), $4, now()) \
             ON CONFLICT ({id}) DO UPDATE SET \
                 lifecycle_state = EXCLUDED.lifecycle_state, \
                 state_reason = EXCLUDED.state_reason, \
                 approved_by = EXCLUDED.approved_by, \
                 approved_at = EXCLUDED.approved_at, \
                 updated_by = EXCLUDED.updated_by, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {cols}",
            lc = self.dimension.lifecycle_table,
            id = self.dimension.id_column,
            cols = self.lifecycle_columns(),
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &entity_id,
                    &state.as_str(),
                    &reason,
                    &stamp.updated_by,
                    &stamp.approved_by,
                ],
            )
            .await?;
        lifecycle_from_row(&row)
    }

    async fn transition_with<C: GenericClient>(
        &self,
        client: &C,
        review_id: i64,
        transition: &ReviewTransition,
    ) -> Result<ReviewQueueEntry> {
        if transition.new_status == ReviewStatus::Open {
            let current = self.candidate_with(client, review_id).await?;
            return Err(ResolutionError::InvalidTransition {
                review_id,
                from: current.status,
                to: ReviewStatus::Open,
            });
        }
        let sql = format!(
            "UPDATE {q} SET status = $2, reviewed_by = $3, reviewed_at = now(), decision_notes = $4 \
             WHERE review_id = $1::bigint AND status = 'OPEN' RETURNING {cols}",
            q = self.dimension.review_queue_table,
            cols = self.queue_columns(),
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[
                    &review_id,
                    &transition.new_status.as_str(),
                    &transition.reviewer,
                    &transition.notes,
                ],
            )
            .await?;
        match row {
            Some(row) => queue_entry_from_row(&row),
            None => {
                let current = self.candidate_with(client, review_id).await?;
                Err(ResolutionError::InvalidTransition {
                    review_id,
                    from: current.status,
                    to: transition.new_status,
                })
            }
        }
    }

    async fn candidate_with<C: GenericClient>(
        &self,
        client: &C,
        review_id: i64,
    ) -> Result<ReviewQueueEntry> {
        let sql = format!(
            "SELECT {cols} FROM {q} WHERE review_id = $1::bigint",
            cols = self.queue_columns(),
            q = self.dimension.review_queue_table
        );
        let row = client
            .query_opt(sql.as_str(), &[&review_id])
            .await?
            .ok_or_else(|| ResolutionError::NotFound(format!("review entry {}", review_id)))?;
        queue_entry_from_row(&row)
    }

    async fn insert_audit<C: GenericClient>(&self, client: &C, event: &AuditEvent) -> Result<()> {
        client
            .execute(
                "INSERT INTO mdm.resolution_audit \
                 (dimension, review_id, action, survivor_id, retiree_id, confidence, details, actor, recorded_at) \
                 VALUES ($1, $2::bigint, $3, $4::bigint, $5::bigint, $6::float8, $7, $8, $9)",
                &[
                    &event.dimension,
                    &event.review_id,
                    &event.action,
                    &event.survivor_id,
                    &event.retiree_id,
                    &event.confidence,
                    &event.details,
                    &event.actor,
                    &event.recorded_at,
                ],
            )
            .await?;
        Ok(())
    }
}

fn lifecycle_from_row(row: &Row) -> Result<LifecycleRecord> {
    let raw_state: String = row.try_get("lifecycle_state")?;
    let state = LifecycleState::parse(&raw_state).ok_or_else(|| {
        ResolutionError::Persistence(format!("unknown lifecycle state '{}'", raw_state))
    })?;
    Ok(LifecycleRecord {
        entity_id: row.try_get("entity_id")?,
        state,
        reason: row.try_get("reason")?,
        audit: AuditFields {
            created_by: row.try_get("created_by")?,
            approved_by: row.try_get("approved_by")?,
            approved_at: row.try_get("approved_at")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
        },
    })
}

fn queue_entry_from_row(row: &Row) -> Result<ReviewQueueEntry> {
    let raw_rec: String = row.try_get("recommendation")?;
    let raw_status: String = row.try_get("status")?;
    Ok(ReviewQueueEntry {
        review_id: row.try_get("review_id")?,
        left_id: row.try_get("left_entity_id")?,
        right_id: row.try_get("right_entity_id")?,
        confidence: row.try_get("confidence")?,
        recommendation: Recommendation::parse(&raw_rec).ok_or_else(|| {
            ResolutionError::Persistence(format!("unknown recommendation '{}'", raw_rec))
        })?,
        rationale: row.try_get("rationale")?,
        status: ReviewStatus::parse(&raw_status).ok_or_else(|| {
            ResolutionError::Persistence(format!("unknown review status '{}'", raw_status))
        })?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: row.try_get("reviewed_at")?,
        decision_notes: row.try_get("decision_notes")?,
    })
}

fn audit_from_row(row: &Row) -> Result<AuditEvent> {
    Ok(AuditEvent {
        dimension: row.try_get("dimension")?,
        review_id: row.try_get("review_id")?,
        action: row.try_get("action")?,
        survivor_id: row.try_get("survivor_id")?,
        retiree_id: row.try_get("retiree_id")?,
        confidence: row.try_get("confidence")?,
        details: row.try_get("details")?,
        actor: row.try_get("actor")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

#[async_trait]
impl ResolutionStore for PgStore {
    fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    async fn fetch_entities(&self) -> Result<Vec<Entity>> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "{} ORDER BY {}",
            self.entity_select(),
            self.dimension.id_column
        );
        let rows = conn.query(sql.as_str(), &[]).await?;
        let entities = rows
            .iter()
            .map(|row| self.entity_from_row(row))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Fetched {} rows from {}",
            entities.len(),
            self.dimension.entity_table
        );
        Ok(entities)
    }

    async fn fetch_entity(&self, entity_id: i64) -> Result<Entity> {
        let conn = self.pool.get().await?;
        self.load_entity(&*conn, entity_id).await
    }

    async fn enqueue_candidate(&self, candidate: &NewReviewCandidate) -> Result<i64> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO {q} ({l}, {r}, confidence, recommendation, rationale, status, created_by) \
             VALUES ($1::bigint, $2::bigint, $3::float8, $4, $5, 'OPEN', $6) \
             RETURNING review_id::bigint AS review_id",
            q = self.dimension.review_queue_table,
            l = self.dimension.queue_left_column,
            r = self.dimension.queue_right_column
        );
        let result = conn
            .query_one(
                sql.as_str(),
                &[
                    &candidate.pair.left_id,
                    &candidate.pair.right_id,
                    &candidate.confidence,
                    &candidate.recommendation.as_str(),
                    &candidate.rationale,
                    &candidate.created_by,
                ],
            )
            .await;

        match result {
            Ok(row) => Ok(row.try_get("review_id")?),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                let existing = conn
                    .query_opt(
                        format!(
                            "SELECT review_id::bigint AS review_id FROM {q} WHERE {l} = $1::bigint \
                             AND {r} = $2::bigint AND status = 'OPEN'",
                            q = self.dimension.review_queue_table,
                            l = self.dimension.queue_left_column,
                            r = self.dimension.queue_right_column
                        )
                        .as_str(),
                        &[&candidate.pair.left_id, &candidate.pair.right_id],
                    )
                    .await?;
                Err(ResolutionError::DuplicateCandidate {
                    left_id: candidate.pair.left_id,
                    right_id: candidate.pair.right_id,
                    existing_review_id: match existing {
                        Some(row) => row.try_get("review_id")?,
                        None => -1,
                    },
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_open_candidates(
        &self,
        filter: &OpenCandidateFilter,
    ) -> Result<Vec<ReviewQueueEntry>> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "SELECT {cols} FROM {q} \
             WHERE status = 'OPEN' \
               AND ($1::text IS NULL OR recommendation = $1::text) \
               AND ($2::float8 IS NULL OR confidence >= $2::float8) \
             ORDER BY confidence DESC, review_id ASC \
             LIMIT $3::bigint",
            cols = self.queue_columns(),
            q = self.dimension.review_queue_table
        );
        let recommendation = filter.recommendation.map(|r| r.as_str().to_string());
        let limit = filter.limit.map(|l| l as i64);
        let rows = conn
            .query(
                sql.as_str(),
                &[&recommendation, &filter.min_confidence, &limit],
            )
            .await?;
        rows.iter().map(queue_entry_from_row).collect()
    }

    async fn get_candidate(&self, review_id: i64) -> Result<ReviewQueueEntry> {
        let conn = self.pool.get().await?;
        self.candidate_with(&*conn, review_id).await
    }

    async fn transition_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
    ) -> Result<ReviewQueueEntry> {
        let conn = self.pool.get().await?;
        self.transition_with(&*conn, review_id, transition).await
    }

    async fn update_entity(
        &self,
        entity_id: i64,
        attributes: &BTreeMap<String, String>,
        version_expected: i64,
        stamp: &AuditStamp,
    ) -> Result<Entity> {
        let conn = self.pool.get().await?;
        self.update_entity_with(&*conn, entity_id, attributes, version_expected, stamp)
            .await
    }

    async fn upsert_lifecycle(
        &self,
        entity_id: i64,
        state: LifecycleState,
        reason: &str,
        stamp: &AuditStamp,
    ) -> Result<LifecycleRecord> {
        let mut conn = self.pool.get().await?;
        let tx = conn.transaction().await?;
        self.load_entity(&tx, entity_id).await?;
        let record = self
            .upsert_lifecycle_with(&tx, entity_id, state, reason, stamp)
            .await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn fetch_lifecycle(&self, entity_id: i64) -> Result<Option<LifecycleRecord>> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "SELECT {cols} FROM {lc} WHERE {id} = $1::bigint",
            cols = self.lifecycle_columns(),
            id = self.dimension.id_column,
            lc = self.dimension.lifecycle_table
        );
        match conn.query_opt(sql.as_str(), &[&entity_id]).await? {
            Some(row) => Ok(Some(lifecycle_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn apply_merge(&self, plan: &MergePlan) -> Result<Entity> {
        let mut conn = self.pool.get().await?;
        let tx = conn.transaction().await?;

        // Queue row first, then entity rows in ascending id order, so two
        // merges touching the same entities always lock in the same order.
        let locked = tx
            .query_opt(
                format!(
                    "SELECT status FROM {q} WHERE review_id = $1::bigint FOR UPDATE",
                    q = self.dimension.review_queue_table
                )
                .as_str(),
                &[&plan.review_id],
            )
            .await?
            .ok_or_else(|| ResolutionError::NotFound(format!("review entry {}", plan.review_id)))?;
        let raw_status: String = locked.try_get("status")?;
        if raw_status != ReviewStatus::Open.as_str() {
            let from = ReviewStatus::parse(&raw_status).ok_or_else(|| {
                ResolutionError::Persistence(format!("unknown review status '{}'", raw_status))
            })?;
            return Err(ResolutionError::InvalidTransition {
                review_id: plan.review_id,
                from,
                to: ReviewStatus::Merged,
            });
        }

        let ids = vec![plan.survivor_id, plan.retiree_id];
        let rows = tx
            .query(
                format!(
                    "SELECT {id}::bigint AS entity_id FROM {table} WHERE {id} = ANY($1::bigint[]) \
                     ORDER BY {id} FOR UPDATE",
                    id = self.dimension.id_column,
                    table = self.dimension.entity_table
                )
                .as_str(),
                &[&ids],
            )
            .await?;
        let present: Vec<i64> = rows
            .iter()
            .map(|r| r.try_get("entity_id"))
            .collect::<std::result::Result<_, _>>()?;
        for id in [plan.survivor_id, plan.retiree_id] {
            if !present.contains(&id) {
                return Err(ResolutionError::NotFound(format!("entity {}", id)));
            }
        }

        // Another runner may have retired either side since the plan was read;
        // deprecation does not bump the entity version.
        let retired = tx
            .query_opt(
                format!(
                    "SELECT {id}::bigint AS entity_id FROM {lc} WHERE {id} = ANY($1::bigint[]) \
                     AND lifecycle_state = 'DEPRECATED' ORDER BY {id} LIMIT 1 FOR UPDATE",
                    id = self.dimension.id_column,
                    lc = self.dimension.lifecycle_table
                )
                .as_str(),
                &[&ids],
            )
            .await?;
        if let Some(row) = retired {
            return Err(ResolutionError::EntityRetired {
                entity_id: row.try_get("entity_id")?,
            });
        }

        let survivor = self
            .update_entity_with(
                &tx,
                plan.survivor_id,
                &plan.merged_attributes,
                plan.survivor_version_expected,
                &plan.stamp,
            )
            .await?;
        self.upsert_lifecycle_with(
            &tx,
            plan.retiree_id,
            LifecycleState::Deprecated,
            &plan.lifecycle_reason,
            &plan.stamp,
        )
        .await?;
        self.transition_with(
            &tx,
            plan.review_id,
            &ReviewTransition {
                new_status: ReviewStatus::Merged,
                reviewer: plan.stamp.approved_by.clone(),
                notes: Some(plan.decision_notes.clone()),
            },
        )
        .await?;
        self.insert_audit(&tx, &plan.audit).await?;

        tx.commit().await?;
        Ok(survivor)
    }

    async fn reject_candidate(
        &self,
        review_id: i64,
        transition: &ReviewTransition,
        event: &AuditEvent,
    ) -> Result<ReviewQueueEntry> {
        let mut conn = self.pool.get().await?;
        let tx = conn.transaction().await?;
        let entry = self.transition_with(&tx, review_id, transition).await?;
        self.insert_audit(&tx, event).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn deprecated_entity_ids(&self) -> Result<BTreeSet<i64>> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "SELECT {id}::bigint AS entity_id FROM {lc} WHERE lifecycle_state = 'DEPRECATED'",
            id = self.dimension.id_column,
            lc = self.dimension.lifecycle_table
        );
        let rows = conn.query(sql.as_str(), &[]).await?;
        let mut ids = BTreeSet::new();
        for row in &rows {
            ids.insert(row.try_get::<_, i64>("entity_id")?);
        }
        Ok(ids)
    }

    async fn seed_lifecycle(&self, created_by: &str) -> Result<usize> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO {lc} ({id}, lifecycle_state, state_reason, created_by, updated_by, updated_at) \
             SELECT {id}, 'ACTIVE', 'Seed active state', $1, $1, now() FROM {table} \
             ON CONFLICT ({id}) DO NOTHING",
            lc = self.dimension.lifecycle_table,
            id = self.dimension.id_column,
            table = self.dimension.entity_table
        );
        let inserted = conn.execute(sql.as_str(), &[&created_by]).await?;
        if inserted == 0 {
            warn!(
                "No lifecycle rows seeded for {}; every entity already has one",
                self.dimension.name
            );
        }
        Ok(inserted as usize)
    }

    async fn lifecycle_distribution(&self) -> Result<BTreeMap<String, usize>> {
        let conn = self.pool.get().await?;
        let sql = format!(
            "SELECT COALESCE(l.lifecycle_state, 'UNKNOWN') AS state, COUNT(*)::bigint AS n \
             FROM {table} e LEFT JOIN {lc} l ON l.{id} = e.{id} \
             GROUP BY 1",
            table = self.dimension.entity_table,
            lc = self.dimension.lifecycle_table,
            id = self.dimension.id_column
        );
        let mut counts = BTreeMap::new();
        for row in conn.query(sql.as_str(), &[]).await? {
            let state: String = row.try_get("state")?;
            let n: i64 = row.try_get("n")?;
            counts.insert(state, n as usize);
        }
        Ok(counts)
    }

    async fn audit_trail(&self, entity_id: i64) -> Result<Vec<AuditEvent>> {
        let conn = self.pool.get().await?;
        let rows = conn
            .query(
                "SELECT dimension, review_id, action, survivor_id, retiree_id, confidence, details, actor, recorded_at \
                 FROM mdm.resolution_audit \
                 WHERE dimension = $1 AND (survivor_id = $2::bigint OR retiree_id = $2::bigint) \
                 ORDER BY recorded_at, audit_id",
                &[&self.dimension.name, &entity_id],
            )
            .await?;
        rows.iter().map(audit_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_uses_existing_mdm_column_names() {
        let vendor = render_schema(&Dimension::vendor());
        assert!(vendor.contains("state_reason"));
        assert!(vendor.contains("left_vendor_id"));
        assert!(vendor.contains("right_vendor_id"));
        assert!(!vendor.contains("left_entity_id"));
        assert!(!vendor.contains("{queue_"));

        let zone = render_schema(&Dimension::zone());
        assert!(zone.contains("left_location_id"));
        assert!(zone.contains("right_location_id"));
        assert!(!zone.contains("left_vendor_id"));
    }
}

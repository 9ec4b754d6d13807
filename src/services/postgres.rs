use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::{MatchStore, StoreError};
use crate::models::{
    Assignment, AssignmentPatch, AssignmentStatus, Candidate, CandidateFilter, JobRequest,
    MatchResult, SubScores, WeightConfig,
};

/// Assignment status as stored in the `assignment_status` enum column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignment_status", rename_all = "lowercase")]
pub enum StatusColumn {
    Invited,
    Accepted,
    Declined,
}

impl From<AssignmentStatus> for StatusColumn {
    fn from(value: AssignmentStatus) -> Self {
        match value {
            AssignmentStatus::Invited => StatusColumn::Invited,
            AssignmentStatus::Accepted => StatusColumn::Accepted,
            AssignmentStatus::Declined => StatusColumn::Declined,
        }
    }
}

impl From<StatusColumn> for AssignmentStatus {
    fn from(value: StatusColumn) -> Self {
        match value {
            StatusColumn::Invited => AssignmentStatus::Invited,
            StatusColumn::Accepted => AssignmentStatus::Accepted,
            StatusColumn::Declined => AssignmentStatus::Declined,
        }
    }
}

/// PostgreSQL-backed match store
///
/// Requests and candidates are written by the surrounding application; this
/// store reads them and owns the weights, match results and assignments
/// tables.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run embedded migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect using optional pool settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn request_from_row(row: &PgRow) -> JobRequest {
    JobRequest {
        id: row.get("id"),
        title: row.get("title"),
        location: row.get("location"),
        interests: row.get("interests"),
        professional_background: row.get("professional_background"),
        availability_days: row.get("availability_days"),
        frequencies: row.get("frequencies"),
        time_slots: row.get("time_slots"),
    }
}

fn candidate_from_row(row: &PgRow) -> Candidate {
    Candidate {
        id: row.get("id"),
        name: row.get("name"),
        location: row.get("location"),
        interests: row.get("interests"),
        background: row.get("background"),
        available_days: row.get("available_days"),
        frequencies: row.get("frequencies"),
        time_slots: row.get("time_slots"),
        is_active: row.get("is_active"),
    }
}

fn assignment_from_row(row: &PgRow) -> Assignment {
    let status: StatusColumn = row.get("status");
    Assignment {
        request_id: row.get("request_id"),
        candidate_id: row.get("candidate_id"),
        status: status.into(),
        assigned_at: row.get("assigned_at"),
        response_at: row.get("response_at"),
    }
}

fn match_result_from_row(row: &PgRow) -> MatchResult {
    let sub_scores: Json<SubScores> = row.get("sub_scores");
    let weights: Json<WeightConfig> = row.get("weights");
    let total_score: i16 = row.get("total_score");
    MatchResult {
        request_id: row.get("request_id"),
        candidate_id: row.get("candidate_id"),
        sub_scores: sub_scores.0,
        total_score: total_score.clamp(0, 100) as u8,
        weights: weights.0,
        computed_at: row.get("computed_at"),
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn get_request(&self, id: &str) -> Result<JobRequest, StoreError> {
        let query = r#"
            SELECT id, title, location, interests, professional_background,
                   availability_days, frequencies, time_slots
            FROM job_requests
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "request",
                id: id.to_string(),
            })?;

        Ok(request_from_row(&row))
    }

    async fn get_candidate(&self, id: &str) -> Result<Candidate, StoreError> {
        let query = r#"
            SELECT id, name, location, interests, background,
                   available_days, frequencies, time_slots, is_active
            FROM candidates
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "candidate",
                id: id.to_string(),
            })?;

        Ok(candidate_from_row(&row))
    }

    async fn list_candidate_pool(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>, StoreError> {
        let query = r#"
            SELECT id, name, location, interests, background,
                   available_days, frequencies, time_slots, is_active
            FROM candidates
            WHERE ($1 = FALSE OR is_active)
              AND NOT (id = ANY($2))
            ORDER BY created_at ASC, id ASC
            LIMIT $3
        "#;

        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        let rows = sqlx::query(query)
            .bind(filter.active_only)
            .bind(&filter.exclude_ids)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let pool: Vec<Candidate> = rows.iter().map(candidate_from_row).collect();
        tracing::debug!("Loaded candidate pool of {} profiles", pool.len());

        Ok(pool)
    }

    async fn get_weight_config(&self) -> Result<Option<WeightConfig>, StoreError> {
        let row = sqlx::query("SELECT weights FROM weight_configs WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let weights: Json<WeightConfig> = row.get("weights");
            weights.0
        }))
    }

    async fn save_weight_config(&self, config: &WeightConfig) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO weight_configs (id, weights, updated_at)
            VALUES (1, $1, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                weights = EXCLUDED.weights,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(Json(config))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn save_match_results(&self, request_id: &str, results: &[MatchResult]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM match_results WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        let insert = r#"
            INSERT INTO match_results
                (request_id, candidate_id, position, sub_scores, total_score, weights, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        for (position, result) in results.iter().enumerate() {
            sqlx::query(insert)
                .bind(request_id)
                .bind(&result.candidate_id)
                .bind(position as i32)
                .bind(Json(&result.sub_scores))
                .bind(result.total_score as i16)
                .bind(Json(&result.weights))
                .bind(result.computed_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Stored {} match results for request {}", results.len(), request_id);

        Ok(())
    }

    async fn get_match_results(&self, request_id: &str) -> Result<Vec<MatchResult>, StoreError> {
        let query = r#"
            SELECT request_id, candidate_id, sub_scores, total_score, weights, computed_at
            FROM match_results
            WHERE request_id = $1
            ORDER BY position ASC
        "#;

        let rows = sqlx::query(query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(match_result_from_row).collect())
    }

    /// Uses `ON CONFLICT DO NOTHING RETURNING` so that concurrent invites for
    /// one pair produce exactly one row
    async fn create_assignment_if_absent(
        &self,
        request_id: &str,
        candidate_id: &str,
        assigned_at: DateTime<Utc>,
    ) -> Result<Assignment, StoreError> {
        let query = r#"
            INSERT INTO assignments (request_id, candidate_id, status, assigned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (request_id, candidate_id) DO NOTHING
            RETURNING request_id, candidate_id, status, assigned_at, response_at
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .bind(candidate_id)
            .bind(StatusColumn::Invited)
            .bind(assigned_at)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(assignment_from_row(&row)),
            None => Err(StoreError::Conflict(format!("assignment {}/{}", request_id, candidate_id))),
        }
    }

    async fn get_assignment(&self, request_id: &str, candidate_id: &str) -> Result<Option<Assignment>, StoreError> {
        let query = r#"
            SELECT request_id, candidate_id, status, assigned_at, response_at
            FROM assignments
            WHERE request_id = $1 AND candidate_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(assignment_from_row))
    }

    async fn list_assignments(&self, request_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let query = r#"
            SELECT request_id, candidate_id, status, assigned_at, response_at
            FROM assignments
            WHERE request_id = $1
            ORDER BY assigned_at ASC, candidate_id ASC
        "#;

        let rows = sqlx::query(query)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(assignment_from_row).collect())
    }

    async fn update_assignment(
        &self,
        request_id: &str,
        candidate_id: &str,
        patch: AssignmentPatch,
    ) -> Result<Assignment, StoreError> {
        let query = r#"
            UPDATE assignments
            SET status = $3, response_at = $4
            WHERE request_id = $1 AND candidate_id = $2 AND status = $5
            RETURNING request_id, candidate_id, status, assigned_at, response_at
        "#;

        let row = sqlx::query(query)
            .bind(request_id)
            .bind(candidate_id)
            .bind(StatusColumn::from(patch.status))
            .bind(patch.response_at)
            .bind(StatusColumn::from(patch.expected))
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(assignment_from_row(&row));
        }

        // Distinguish a missing row from a lost compare-and-set
        match self.get_assignment(request_id, candidate_id).await? {
            Some(current) => Err(StoreError::Stale(format!(
                "assignment {}/{} is {}",
                request_id,
                candidate_id,
                current.status.label()
            ))),
            None => Err(StoreError::NotFound {
                entity: "assignment",
                id: format!("{}/{}", request_id, candidate_id),
            }),
        }
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

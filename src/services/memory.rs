use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{MatchStore, StoreError};
use crate::models::{
    Assignment, AssignmentPatch, AssignmentStatus, Candidate, CandidateFilter, JobRequest,
    MatchResult, WeightConfig,
};

#[derive(Default)]
struct Tables {
    requests: HashMap<String, JobRequest>,
    // Insertion order is the pool order
    candidates: Vec<Candidate>,
    weights: Option<WeightConfig>,
    results: HashMap<String, Vec<MatchResult>>,
    assignments: HashMap<(String, String), Assignment>,
}

/// In-process store used by tests and by the service when no database is
/// configured.
///
/// Every write takes the single table lock, so the check-then-insert in
/// `create_assignment_if_absent` is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a request
    pub async fn put_request(&self, request: JobRequest) {
        let mut tables = self.tables.write().await;
        tables.requests.insert(request.id.clone(), request);
    }

    /// Insert or replace a candidate, keeping its original pool position
    pub async fn put_candidate(&self, candidate: Candidate) {
        let mut tables = self.tables.write().await;
        match tables.candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(existing) => *existing = candidate,
            None => tables.candidates.push(candidate),
        }
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_request(&self, id: &str) -> Result<JobRequest, StoreError> {
        let tables = self.tables.read().await;
        tables.requests.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: "request",
            id: id.to_string(),
        })
    }

    async fn get_candidate(&self, id: &str) -> Result<Candidate, StoreError> {
        let tables = self.tables.read().await;
        tables
            .candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "candidate",
                id: id.to_string(),
            })
    }

    async fn list_candidate_pool(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>, StoreError> {
        let tables = self.tables.read().await;
        let pool = tables
            .candidates
            .iter()
            .filter(|c| filter.accepts(c))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(pool)
    }

    async fn get_weight_config(&self) -> Result<Option<WeightConfig>, StoreError> {
        Ok(self.tables.read().await.weights)
    }

    async fn save_weight_config(&self, config: &WeightConfig) -> Result<(), StoreError> {
        self.tables.write().await.weights = Some(*config);
        Ok(())
    }

    async fn save_match_results(&self, request_id: &str, results: &[MatchResult]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.results.insert(request_id.to_string(), results.to_vec());
        Ok(())
    }

    async fn get_match_results(&self, request_id: &str) -> Result<Vec<MatchResult>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.results.get(request_id).cloned().unwrap_or_default())
    }

    async fn create_assignment_if_absent(
        &self,
        request_id: &str,
        candidate_id: &str,
        assigned_at: DateTime<Utc>,
    ) -> Result<Assignment, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (request_id.to_string(), candidate_id.to_string());
        if tables.assignments.contains_key(&key) {
            return Err(StoreError::Conflict(format!("assignment {}/{}", request_id, candidate_id)));
        }

        let assignment = Assignment {
            request_id: request_id.to_string(),
            candidate_id: candidate_id.to_string(),
            status: AssignmentStatus::Invited,
            assigned_at,
            response_at: None,
        };
        tables.assignments.insert(key, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, request_id: &str, candidate_id: &str) -> Result<Option<Assignment>, StoreError> {
        let tables = self.tables.read().await;
        let key = (request_id.to_string(), candidate_id.to_string());
        Ok(tables.assignments.get(&key).cloned())
    }

    async fn list_assignments(&self, request_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<Assignment> = tables
            .assignments
            .values()
            .filter(|a| a.request_id == request_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| {
            a.assigned_at
                .cmp(&b.assigned_at)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        Ok(assignments)
    }

    async fn update_assignment(
        &self,
        request_id: &str,
        candidate_id: &str,
        patch: AssignmentPatch,
    ) -> Result<Assignment, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (request_id.to_string(), candidate_id.to_string());
        let assignment = tables.assignments.get_mut(&key).ok_or_else(|| StoreError::NotFound {
            entity: "assignment",
            id: format!("{}/{}", request_id, candidate_id),
        })?;

        if assignment.status != patch.expected {
            return Err(StoreError::Stale(format!(
                "assignment {}/{} is {}",
                request_id,
                candidate_id,
                assignment.status.label()
            )));
        }

        assignment.status = patch.status;
        assignment.response_at = patch.response_at;
        Ok(assignment.clone())
    }
}

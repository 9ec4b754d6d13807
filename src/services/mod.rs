// Service exports
pub mod appwrite;
pub mod cache;
pub mod memory;
pub mod postgres;

pub use appwrite::AppwriteNotifier;
pub use cache::{CacheManager, CacheKey, CacheError, CacheStats};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Assignment, AssignmentPatch, Candidate, CandidateFilter, JobRequest, MatchResult, WeightConfig,
};

/// Errors surfaced by storage adapters
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Stale update: {0}")]
    Stale(String),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Storage collaborator the matching core reads from and writes to.
///
/// `create_assignment_if_absent` must be atomic: of two concurrent calls for
/// the same pair, exactly one returns the new assignment and the other
/// returns [`StoreError::Conflict`]. `update_assignment` applies only while
/// the stored status equals `patch.expected`, otherwise [`StoreError::Stale`].
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_request(&self, id: &str) -> Result<JobRequest, StoreError>;

    async fn get_candidate(&self, id: &str) -> Result<Candidate, StoreError>;

    /// Candidates in a stable order; ties in ranking keep this order
    async fn list_candidate_pool(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>, StoreError>;

    async fn get_weight_config(&self) -> Result<Option<WeightConfig>, StoreError>;

    async fn save_weight_config(&self, config: &WeightConfig) -> Result<(), StoreError>;

    /// Replace every stored result for the request
    async fn save_match_results(&self, request_id: &str, results: &[MatchResult]) -> Result<(), StoreError>;

    async fn get_match_results(&self, request_id: &str) -> Result<Vec<MatchResult>, StoreError>;

    async fn create_assignment_if_absent(
        &self,
        request_id: &str,
        candidate_id: &str,
        assigned_at: DateTime<Utc>,
    ) -> Result<Assignment, StoreError>;

    async fn get_assignment(&self, request_id: &str, candidate_id: &str) -> Result<Option<Assignment>, StoreError>;

    async fn list_assignments(&self, request_id: &str) -> Result<Vec<Assignment>, StoreError>;

    async fn update_assignment(
        &self,
        request_id: &str,
        candidate_id: &str,
        patch: AssignmentPatch,
    ) -> Result<Assignment, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Errors surfaced by notification adapters
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),
}

/// Outbound notification hook. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient_id: &str, message: &str, link: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes the notification to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient_id: &str, message: &str, link: &str) -> Result<(), NotifyError> {
        tracing::info!(recipient = recipient_id, link, "Notification: {}", message);
        Ok(())
    }
}

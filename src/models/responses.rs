use serde::{Deserialize, Serialize};
use crate::models::domain::{Assignment, MatchResult, WeightConfig};

/// Active weights with their validity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsResponse {
    pub weights: WeightConfig,
    pub sum: f64,
    pub valid: bool,
}

/// Ranked matches for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub matches: Vec<MatchResult>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
}

/// Assignments recorded for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentsResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub assignments: Vec<Assignment>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

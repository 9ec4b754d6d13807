use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::{InvitationManager, MatchRanker, WeightConfiguration};
use crate::error::MatchError;
use crate::models::{
    ApplyPresetRequest, AssignmentsResponse, CandidateFilter, ErrorResponse, HealthResponse,
    InviteRequest, MatchResult, MatchesQuery, MatchesResponse, RespondRequest, ResponseOutcome,
    UpdateWeightsRequest, WeightConfig, WeightsResponse,
};
use crate::services::{CacheManager, MatchStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub cache: Option<Arc<CacheManager>>,
    pub ranker: MatchRanker,
    pub invitations: InvitationManager,
    pub matching: MatchingSettings,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/weights", web::get().to(get_weights))
        .route("/weights", web::put().to(update_weights))
        .route("/weights/preset", web::post().to(apply_preset))
        .route("/weights/auto-balance", web::post().to(auto_balance))
        .route("/requests/{request_id}/rematch", web::post().to(rematch))
        .route("/requests/{request_id}/matches", web::get().to(get_matches))
        .route("/requests/{request_id}/assignments", web::get().to(list_assignments))
        .route("/invitations", web::post().to(invite))
        .route("/invitations/respond", web::post().to(respond));
}

fn error_body(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    error_body(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
}

/// Map a core error onto an HTTP response
fn match_error_response(err: &MatchError) -> HttpResponse {
    let (status, error) = match err {
        MatchError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        MatchError::DuplicateInvite { .. } => (StatusCode::CONFLICT, "duplicate_invite"),
        MatchError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        MatchError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        MatchError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected: {}", err);
    }

    error_body(status, error, err.to_string())
}

fn weights_response(weights: WeightConfig) -> WeightsResponse {
    WeightsResponse {
        weights,
        sum: weights.sum(),
        valid: crate::core::is_valid_sum(&weights),
    }
}

impl AppState {
    fn effective_limit(&self, requested: Option<u16>) -> usize {
        requested
            .unwrap_or(self.matching.default_limit)
            .min(self.matching.max_limit) as usize
    }

    async fn invalidate_cached_weights(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_weights().await {
                tracing::warn!("Failed to invalidate cached weights: {}", e);
            }
        }
    }

    /// Persist an edited weight configuration and answer with the saved weights
    async fn save_weights(&self, mut config: WeightConfiguration) -> HttpResponse {
        if let Err(e) = config.save(self.store.as_ref()).await {
            return match_error_response(&e);
        }
        self.invalidate_cached_weights().await;
        HttpResponse::Ok().json(weights_response(config.weights()))
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Current persisted weights
///
/// GET /api/v1/weights
async fn get_weights(state: web::Data<AppState>) -> impl Responder {
    if let Some(cache) = &state.cache {
        if let Ok(weights) = cache.get_weights().await {
            return HttpResponse::Ok().json(weights_response(weights));
        }
    }

    let config = match WeightConfiguration::load(state.store.as_ref()).await {
        Ok(config) => config,
        Err(e) => return match_error_response(&e),
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&crate::services::CacheKey::weights(), &config.weights()).await {
            tracing::warn!("Failed to cache weights: {}", e);
        }
    }

    HttpResponse::Ok().json(weights_response(config.weights()))
}

/// Replace and persist the weights
///
/// PUT /api/v1/weights
///
/// Request body:
/// ```json
/// { "location": 40, "interests": 25, "background": 25,
///   "availability": 5, "frequency": 2.5, "timing": 2.5 }
/// ```
async fn update_weights(
    state: web::Data<AppState>,
    req: web::Json<UpdateWeightsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let mut config = match WeightConfiguration::load(state.store.as_ref()).await {
        Ok(config) => config,
        Err(e) => return match_error_response(&e),
    };
    if let Err(e) = config.set_weights(req.to_config()) {
        return match_error_response(&e);
    }

    state.save_weights(config).await
}

/// Replace and persist the weights from a named preset
///
/// POST /api/v1/weights/preset
///
/// Request body:
/// ```json
/// { "preset": "LocationPriority" }
/// ```
async fn apply_preset(
    state: web::Data<AppState>,
    req: web::Json<ApplyPresetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let mut config = WeightConfiguration::default();
    match config.apply_preset(&req.preset) {
        Ok(preset) => tracing::info!("Applying weight preset {}", preset),
        Err(e) => return match_error_response(&e),
    }

    state.save_weights(config).await
}

/// Preview the given weights rescaled to 100. Nothing is persisted.
///
/// POST /api/v1/weights/auto-balance
async fn auto_balance(req: web::Json<UpdateWeightsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let mut config = WeightConfiguration::new(req.to_config());
    match config.auto_balance() {
        Ok(()) => HttpResponse::Ok().json(weights_response(config.weights())),
        Err(e) => match_error_response(&e),
    }
}

fn matches_response(request_id: String, mut results: Vec<MatchResult>, limit: usize) -> MatchesResponse {
    let total_results = results.len();
    results.truncate(limit);
    MatchesResponse {
        request_id,
        matches: results,
        total_results,
    }
}

/// Recompute and replace the stored matches for a request
///
/// POST /api/v1/requests/{request_id}/rematch?limit=50&activeOnly=true
async fn rematch(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<MatchesQuery>,
) -> impl Responder {
    let request_id = path.into_inner();
    let filter = CandidateFilter {
        active_only: query.active_only.unwrap_or(state.matching.active_only),
        ..CandidateFilter::default()
    };

    tracing::info!("Rematching request {}", request_id);

    let results = match state.ranker.rematch(state.store.as_ref(), &request_id, &filter).await {
        Ok(results) => results,
        Err(e) => return match_error_response(&e),
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.put_match_results(&request_id, &results).await {
            tracing::warn!("Failed to cache match results for {}: {}", request_id, e);
        }
    }

    let limit = state.effective_limit(query.limit);
    HttpResponse::Ok().json(matches_response(request_id, results, limit))
}

/// Stored matches for a request, best first
///
/// GET /api/v1/requests/{request_id}/matches?limit=50
async fn get_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<MatchesQuery>,
) -> impl Responder {
    let request_id = path.into_inner();
    let limit = state.effective_limit(query.limit);

    if let Some(cache) = &state.cache {
        if let Ok(results) = cache.get_match_results(&request_id).await {
            return HttpResponse::Ok().json(matches_response(request_id, results, limit));
        }
    }

    let results = match state.store.get_match_results(&request_id).await {
        Ok(results) => results,
        Err(e) => return match_error_response(&e.into()),
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.put_match_results(&request_id, &results).await {
            tracing::warn!("Failed to cache match results for {}: {}", request_id, e);
        }
    }

    HttpResponse::Ok().json(matches_response(request_id, results, limit))
}

/// Assignments for a request, for status badges
///
/// GET /api/v1/requests/{request_id}/assignments
async fn list_assignments(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let request_id = path.into_inner();

    match state.invitations.assignments(&request_id).await {
        Ok(assignments) => HttpResponse::Ok().json(AssignmentsResponse {
            request_id,
            assignments,
        }),
        Err(e) => match_error_response(&e),
    }
}

/// Invite a candidate
///
/// POST /api/v1/invitations
///
/// Request body:
/// ```json
/// { "requestId": "string", "candidateId": "string" }
/// ```
async fn invite(
    state: web::Data<AppState>,
    req: web::Json<InviteRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.invitations.invite(&req.request_id, &req.candidate_id).await {
        Ok(assignment) => HttpResponse::Created().json(assignment),
        Err(e) => match_error_response(&e),
    }
}

/// Record a candidate's answer
///
/// POST /api/v1/invitations/respond
///
/// Request body:
/// ```json
/// { "requestId": "string", "candidateId": "string", "outcome": "accepted|declined" }
/// ```
async fn respond(
    state: web::Data<AppState>,
    req: web::Json<RespondRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let outcome: ResponseOutcome = match req.outcome.parse() {
        Ok(outcome) => outcome,
        Err(message) => return error_body(StatusCode::BAD_REQUEST, "Invalid outcome", message),
    };

    match state.invitations.respond(&req.request_id, &req.candidate_id, outcome).await {
        Ok(assignment) => HttpResponse::Ok().json(assignment),
        Err(e) => match_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, AssignmentStatus, Candidate, JobRequest};
    use crate::services::{LogNotifier, MemoryStore};
    use actix_web::{test, App};
    use serde_json::json;

    async fn create_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        store
            .put_request(JobRequest {
                location: Some("Springfield".to_string()),
                interests: vec!["music".to_string(), "art".to_string()],
                ..JobRequest::new("R1")
            })
            .await;
        store
            .put_candidate(Candidate {
                location: Some("Shelbyville".to_string()),
                ..Candidate::new("C1")
            })
            .await;
        store
            .put_candidate(Candidate {
                location: Some("Springfield".to_string()),
                interests: vec!["music".to_string()],
                ..Candidate::new("C2")
            })
            .await;

        let store: Arc<dyn MatchStore> = store;
        AppState {
            store: store.clone(),
            cache: None,
            ranker: MatchRanker::default(),
            invitations: InvitationManager::new(store, Arc::new(LogNotifier)),
            matching: MatchingSettings::default(),
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .service(web::scope("/api/v1").configure(configure)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_check_response() {
        let app = app!(create_state().await);
        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let resp: HealthResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.status, "healthy");
    }

    #[actix_web::test]
    async fn test_invalid_weights_rejected() {
        let app = app!(create_state().await);
        let req = test::TestRequest::put()
            .uri("/api/v1/weights")
            .set_json(json!({
                "location": 50, "interests": 50, "background": 50,
                "availability": 0, "frequency": 0, "timing": 0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_apply_preset_persists() {
        let app = app!(create_state().await);
        let req = test::TestRequest::post()
            .uri("/api/v1/weights/preset")
            .set_json(json!({ "preset": "location_priority" }))
            .to_request();
        let resp: WeightsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.weights.location, 60.0);
        assert!(resp.valid);

        let req = test::TestRequest::get().uri("/api/v1/weights").to_request();
        let resp: WeightsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.weights.location, 60.0);
    }

    #[actix_web::test]
    async fn test_auto_balance_preview() {
        let app = app!(create_state().await);
        let req = test::TestRequest::post()
            .uri("/api/v1/weights/auto-balance")
            .set_json(json!({
                "location": 20, "interests": 12.5, "background": 12.5,
                "availability": 2.5, "frequency": 1.25, "timing": 1.25
            }))
            .to_request();
        let resp: WeightsResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.weights.location, 40.0);
        assert!(resp.valid);
    }

    #[actix_web::test]
    async fn test_rematch_then_list() {
        let app = app!(create_state().await);
        let req = test::TestRequest::post().uri("/api/v1/requests/R1/rematch").to_request();
        let resp: MatchesResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.total_results, 2);
        assert_eq!(resp.matches[0].candidate_id, "C2");
        assert_eq!(resp.matches[0].total_score, 53);

        let req = test::TestRequest::get()
            .uri("/api/v1/requests/R1/matches?limit=1")
            .to_request();
        let resp: MatchesResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.matches.len(), 1);
        assert_eq!(resp.total_results, 2);
    }

    #[actix_web::test]
    async fn test_rematch_unknown_request_is_404() {
        let app = app!(create_state().await);
        let req = test::TestRequest::post().uri("/api/v1/requests/R9/rematch").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_invitation_flow() {
        let app = app!(create_state().await);
        let invite = || {
            test::TestRequest::post()
                .uri("/api/v1/invitations")
                .set_json(json!({ "requestId": "R1", "candidateId": "C2" }))
                .to_request()
        };

        let resp = test::call_service(&app, invite()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(&app, invite()).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/v1/invitations/respond")
            .set_json(json!({ "requestId": "R1", "candidateId": "C2", "outcome": "accepted" }))
            .to_request();
        let assignment: Assignment = test::call_and_read_body_json(&app, req).await;
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
        assert!(assignment.response_at.is_some());

        let req = test::TestRequest::get().uri("/api/v1/requests/R1/assignments").to_request();
        let resp: AssignmentsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.assignments.len(), 1);
    }

    #[actix_web::test]
    async fn test_respond_with_unknown_outcome() {
        let app = app!(create_state().await);
        let req = test::TestRequest::post()
            .uri("/api/v1/invitations/respond")
            .set_json(json!({ "requestId": "R1", "candidateId": "C2", "outcome": "maybe" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

use crate::models::InvitationState;
use crate::services::StoreError;
use thiserror::Error;

/// Errors raised by the matching core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Candidate {candidate_id} is already invited to request {request_id}")]
    DuplicateInvite {
        request_id: String,
        candidate_id: String,
    },

    #[error("Cannot respond for candidate {candidate_id} on request {request_id}: assignment is {state}")]
    InvalidTransition {
        request_id: String,
        candidate_id: String,
        state: InvitationState,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl MatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        MatchError::Validation(message.into())
    }
}

impl From<StoreError> for MatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => MatchError::NotFound { entity, id },
            other => MatchError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: MatchError = StoreError::NotFound {
            entity: "request",
            id: "R9".to_string(),
        }
        .into();

        assert!(matches!(err, MatchError::NotFound { entity: "request", .. }));
        assert_eq!(err.to_string(), "request not found: R9");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = MatchError::InvalidTransition {
            request_id: "R1".to_string(),
            candidate_id: "C1".to_string(),
            state: InvitationState::Accepted,
        };

        assert!(err.to_string().contains("assignment is accepted"));
    }
}

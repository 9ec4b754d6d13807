use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MatchError;
use crate::models::{
    Assignment, AssignmentPatch, AssignmentStatus, InvitationState, JobRequest, ResponseOutcome,
};
use crate::services::{MatchStore, Notifier, StoreError};

pub const DEFAULT_LINK_BASE: &str = "/requests";

/// Upper bound an invite waits on the notifier
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(3);

fn require_id(field: &str, value: &str) -> Result<(), MatchError> {
    if value.trim().is_empty() {
        return Err(MatchError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Invitation lifecycle per (request, candidate) pair
///
/// ```text
/// NotInvited --invite--> Invited --respond--> Accepted | Declined
/// ```
///
/// Accepted and Declined are terminal and assignments are never deleted.
#[derive(Clone)]
pub struct InvitationManager {
    store: Arc<dyn MatchStore>,
    notifier: Arc<dyn Notifier>,
    link_base: String,
    notify_timeout: Duration,
}

impl InvitationManager {
    pub fn new(store: Arc<dyn MatchStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            link_base: DEFAULT_LINK_BASE.to_string(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Prefix for the request link sent with invitation notifications
    pub fn with_link_base(mut self, link_base: impl Into<String>) -> Self {
        self.link_base = link_base.into();
        self
    }

    /// How long an invite waits for the notifier before giving up on it
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Invite a candidate to a request
    ///
    /// Fails with [`MatchError::DuplicateInvite`] when the pair already has an
    /// assignment, whatever its status. On success the candidate is notified;
    /// notification failures and timeouts are logged and do not fail the
    /// invite.
    pub async fn invite(&self, request_id: &str, candidate_id: &str) -> Result<Assignment, MatchError> {
        require_id("requestId", request_id)?;
        require_id("candidateId", candidate_id)?;

        let request = self.store.get_request(request_id).await?;
        self.store.get_candidate(candidate_id).await?;

        if self.store.get_assignment(request_id, candidate_id).await?.is_some() {
            return Err(MatchError::DuplicateInvite {
                request_id: request_id.to_string(),
                candidate_id: candidate_id.to_string(),
            });
        }

        // The store's conditional create is authoritative when two invites race
        let assignment = match self
            .store
            .create_assignment_if_absent(request_id, candidate_id, Utc::now())
            .await
        {
            Ok(assignment) => assignment,
            Err(StoreError::Conflict(_)) => {
                return Err(MatchError::DuplicateInvite {
                    request_id: request_id.to_string(),
                    candidate_id: candidate_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Invited candidate {} to request {}", candidate_id, request_id);

        self.send_invitation(&request, candidate_id).await;

        Ok(assignment)
    }

    async fn send_invitation(&self, request: &JobRequest, candidate_id: &str) {
        let message = match request.title.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(title) => format!("You have been invited to volunteer: {}", title),
            None => "You have been invited to a volunteer request".to_string(),
        };
        let link = format!("{}/{}", self.link_base.trim_end_matches('/'), request.id);

        let delivery = tokio::time::timeout(
            self.notify_timeout,
            self.notifier.notify(candidate_id, &message, &link),
        )
        .await;

        match delivery {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                "Invitation notification to {} for request {} failed: {}",
                candidate_id,
                request.id,
                e
            ),
            Err(_) => tracing::warn!(
                "Invitation notification to {} for request {} timed out after {:?}",
                candidate_id,
                request.id,
                self.notify_timeout
            ),
        }
    }

    /// Record the candidate's answer. Only valid while the assignment is
    /// Invited.
    pub async fn respond(
        &self,
        request_id: &str,
        candidate_id: &str,
        outcome: ResponseOutcome,
    ) -> Result<Assignment, MatchError> {
        require_id("requestId", request_id)?;
        require_id("candidateId", candidate_id)?;

        let state = self.state(request_id, candidate_id).await?;
        if state != InvitationState::Invited {
            return Err(self.invalid_transition(request_id, candidate_id, state));
        }

        let patch = AssignmentPatch {
            expected: AssignmentStatus::Invited,
            status: outcome.into(),
            response_at: Some(Utc::now()),
        };

        match self.store.update_assignment(request_id, candidate_id, patch).await {
            Ok(assignment) => {
                tracing::info!(
                    "Candidate {} {} request {}",
                    candidate_id,
                    assignment.status.label(),
                    request_id
                );
                Ok(assignment)
            }
            // Another response landed between the read and the update
            Err(StoreError::Stale(_)) => {
                let state = self.state(request_id, candidate_id).await?;
                Err(self.invalid_transition(request_id, candidate_id, state))
            }
            Err(StoreError::NotFound { .. }) => {
                Err(self.invalid_transition(request_id, candidate_id, InvitationState::NotInvited))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn invalid_transition(&self, request_id: &str, candidate_id: &str, state: InvitationState) -> MatchError {
        MatchError::InvalidTransition {
            request_id: request_id.to_string(),
            candidate_id: candidate_id.to_string(),
            state,
        }
    }

    /// Current lifecycle state of a pair
    pub async fn state(&self, request_id: &str, candidate_id: &str) -> Result<InvitationState, MatchError> {
        let assignment = self.store.get_assignment(request_id, candidate_id).await?;
        Ok(InvitationState::of(assignment.as_ref()))
    }

    /// All assignments for a request, oldest invitation first
    pub async fn assignments(&self, request_id: &str) -> Result<Vec<Assignment>, MatchError> {
        require_id("requestId", request_id)?;
        Ok(self.store.list_assignments(request_id).await?)
    }
}

// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Assignment, AssignmentPatch, AssignmentStatus, Candidate, CandidateFilter, Criterion,
    InvitationState, JobRequest, MatchResult, ResponseOutcome, SubScores, WeightConfig,
};
pub use requests::{ApplyPresetRequest, InviteRequest, MatchesQuery, RespondRequest, UpdateWeightsRequest};
pub use responses::{AssignmentsResponse, ErrorResponse, HealthResponse, MatchesResponse, WeightsResponse};

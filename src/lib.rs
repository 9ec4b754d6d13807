//! Volunteer Match - matching engine for the community volunteering platform
//!
//! Scores and ranks candidate profiles against volunteer-work requests with an
//! admin-configurable weighted model, and tracks the invitation lifecycle that
//! follows.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{InvitationManager, MatchRanker, Preset, ScoringEngine, WeightConfiguration};
pub use error::MatchError;
pub use models::{Assignment, Candidate, InvitationState, JobRequest, MatchResult, WeightConfig};

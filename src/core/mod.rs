// Core algorithm exports
pub mod comparators;
pub mod invitations;
pub mod ranker;
pub mod scoring;
pub mod weights;

pub use comparators::{Comparators, TextMatch};
pub use invitations::InvitationManager;
pub use ranker::MatchRanker;
pub use scoring::{calculate_fractions, MatchFractions, ScoringEngine};
pub use weights::{is_valid_sum, Preset, WeightConfiguration, WEIGHT_SUM_TOLERANCE, WEIGHT_TOTAL};

use chrono::{DateTime, Utc};

use crate::core::comparators::{coverage, intersects, Comparators, TextMatch};
use crate::models::{Candidate, JobRequest, MatchResult, SubScores, WeightConfig};

/// Per-criterion match fractions, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatchFractions {
    pub location: f64,
    pub interests: f64,
    pub background: f64,
    pub availability: f64,
    pub frequency: f64,
    pub timing: f64,
}

impl MatchFractions {
    /// Multiply each fraction by its criterion weight
    pub fn weighted(&self, weights: &WeightConfig) -> SubScores {
        SubScores {
            location: self.location * weights.location,
            interests: self.interests * weights.interests,
            background: self.background * weights.background,
            availability: self.availability * weights.availability,
            frequency: self.frequency * weights.frequency,
            timing: self.timing * weights.timing,
        }
    }
}

/// Scores one candidate against one request.
///
/// Pure: no I/O, and identical inputs give identical sub-scores and totals.
/// Missing candidate data lowers the affected sub-score to 0 instead of
/// failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    comparators: Comparators,
}

impl ScoringEngine {
    pub fn new(comparators: Comparators) -> Self {
        Self { comparators }
    }

    pub fn comparators(&self) -> &Comparators {
        &self.comparators
    }

    /// Score a pair, stamping the result with the current time
    pub fn score(&self, request: &JobRequest, candidate: &Candidate, weights: &WeightConfig) -> MatchResult {
        self.score_at(request, candidate, weights, Utc::now())
    }

    /// Score a pair with an explicit computation timestamp
    pub fn score_at(
        &self,
        request: &JobRequest,
        candidate: &Candidate,
        weights: &WeightConfig,
        computed_at: DateTime<Utc>,
    ) -> MatchResult {
        let sub_scores = calculate_fractions(request, candidate, &self.comparators).weighted(weights);

        MatchResult {
            request_id: request.id.clone(),
            candidate_id: candidate.id.clone(),
            sub_scores,
            total_score: total_score(&sub_scores),
            weights: *weights,
            computed_at,
        }
    }
}

/// Round the sub-score sum to a whole number within `[0, 100]`
#[inline]
pub fn total_score(sub_scores: &SubScores) -> u8 {
    let sum = sub_scores.sum();
    if !sum.is_finite() {
        return 0;
    }
    sum.round().clamp(0.0, 100.0) as u8
}

/// Compute every criterion's match fraction
///
/// Scoring rules:
/// - location: 1 if the locations match, else 0
/// - interests: share of requested interests the candidate has; a request
///   without interests is a full match
/// - background: 1 if the candidate's background matches the requested one
/// - availability: share of required days the candidate is available
/// - frequency: 1 if any preferred frequency is accepted by the request
/// - timing: share of requested time slots the candidate prefers
///
/// Apart from interests, a criterion the request leaves unset scores 0.
pub fn calculate_fractions(
    request: &JobRequest,
    candidate: &Candidate,
    comparators: &Comparators,
) -> MatchFractions {
    MatchFractions {
        location: single_value_fraction(
            request.location.as_deref(),
            candidate.location.as_deref(),
            comparators.location,
        ),
        interests: interests_fraction(&request.interests, &candidate.interests, comparators.interests),
        background: single_value_fraction(
            request.professional_background.as_deref(),
            candidate.background.as_deref(),
            comparators.background,
        ),
        availability: coverage_fraction(
            &request.availability_days,
            &candidate.available_days,
            comparators.availability,
        ),
        frequency: frequency_fraction(&request.frequencies, &candidate.frequencies, comparators.frequency),
        timing: coverage_fraction(&request.time_slots, &candidate.time_slots, comparators.timing),
    }
}

/// Location and background: compare one optional value on each side.
/// A blank value on either side is no match.
#[inline]
fn single_value_fraction(required: Option<&str>, offered: Option<&str>, cmp: TextMatch) -> f64 {
    let required = required.filter(|v| !v.trim().is_empty());
    let offered = offered.filter(|v| !v.trim().is_empty());
    match (required, offered) {
        (Some(required), Some(offered)) if cmp.matches(offered, required) => 1.0,
        _ => 0.0,
    }
}

#[inline]
fn interests_fraction(required: &[String], offered: &[String], cmp: TextMatch) -> f64 {
    coverage(required, offered, cmp).unwrap_or(1.0)
}

/// Availability and timing: share of required values offered. Nothing
/// required is an empty intersection.
#[inline]
fn coverage_fraction(required: &[String], offered: &[String], cmp: TextMatch) -> f64 {
    coverage(required, offered, cmp).unwrap_or(0.0)
}

#[inline]
fn frequency_fraction(accepted: &[String], preferred: &[String], cmp: TextMatch) -> f64 {
    if intersects(accepted, preferred, cmp) { 1.0 } else { 0.0 }
}

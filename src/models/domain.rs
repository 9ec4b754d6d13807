use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six matching criteria, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Location,
    Interests,
    Background,
    Availability,
    Frequency,
    Timing,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Location,
        Criterion::Interests,
        Criterion::Background,
        Criterion::Availability,
        Criterion::Frequency,
        Criterion::Timing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Location => "location",
            Criterion::Interests => "interests",
            Criterion::Background => "background",
            Criterion::Availability => "availability",
            Criterion::Frequency => "frequency",
            Criterion::Timing => "timing",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage weights applied to each matching criterion.
///
/// A config is only usable for scoring when its weights sum to 100
/// (see [`crate::core::weights::is_valid_sum`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub location: f64,
    pub interests: f64,
    pub background: f64,
    pub availability: f64,
    pub frequency: f64,
    pub timing: f64,
}

impl WeightConfig {
    pub fn sum(&self) -> f64 {
        self.location
            + self.interests
            + self.background
            + self.availability
            + self.frequency
            + self.timing
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Location => self.location,
            Criterion::Interests => self.interests,
            Criterion::Background => self.background,
            Criterion::Availability => self.availability,
            Criterion::Frequency => self.frequency,
            Criterion::Timing => self.timing,
        }
    }

    /// Apply `f` to every weight, returning the new config
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            location: f(self.location),
            interests: f(self.interests),
            background: f(self.background),
            availability: f(self.availability),
            frequency: f(self.frequency),
            timing: f(self.timing),
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.location,
            self.interests,
            self.background,
            self.availability,
            self.frequency,
            self.timing,
        ]
    }
}

/// A volunteer-work request carrying matching criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(rename = "professionalBackground", default)]
    pub professional_background: Option<String>,
    #[serde(rename = "availabilityDays", default)]
    pub availability_days: Vec<String>,
    #[serde(default)]
    pub frequencies: Vec<String>,
    #[serde(rename = "timeSlots", default)]
    pub time_slots: Vec<String>,
}

impl JobRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            location: None,
            interests: vec![],
            professional_background: None,
            availability_days: vec![],
            frequencies: vec![],
            time_slots: vec![],
        }
    }
}

/// A retiree/senior profile eligible for matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(rename = "availableDays", default)]
    pub available_days: Vec<String>,
    #[serde(default)]
    pub frequencies: Vec<String>,
    #[serde(rename = "timeSlots", default)]
    pub time_slots: Vec<String>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
}

impl Candidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            location: None,
            interests: vec![],
            background: None,
            available_days: vec![],
            frequencies: vec![],
            time_slots: vec![],
            is_active: true,
        }
    }
}

fn default_true() -> bool { true }

/// Weighted sub-score per criterion. Each value lies in `[0, weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub location: f64,
    pub interests: f64,
    pub background: f64,
    pub availability: f64,
    pub frequency: f64,
    pub timing: f64,
}

impl SubScores {
    pub fn sum(&self) -> f64 {
        self.location
            + self.interests
            + self.background
            + self.availability
            + self.frequency
            + self.timing
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Location => self.location,
            Criterion::Interests => self.interests,
            Criterion::Background => self.background,
            Criterion::Availability => self.availability,
            Criterion::Frequency => self.frequency,
            Criterion::Timing => self.timing,
        }
    }
}

/// Weight-snapshotted score breakdown for one (request, candidate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    #[serde(rename = "subScores")]
    pub sub_scores: SubScores,
    #[serde(rename = "totalScore")]
    pub total_score: u8,
    pub weights: WeightConfig,
    #[serde(rename = "computedAt")]
    pub computed_at: DateTime<Utc>,
}

impl MatchResult {
    /// Fraction of a criterion's weight the candidate earned, in `[0, 1]`.
    /// Zero-weight criteria report 0.
    pub fn ratio(&self, criterion: Criterion) -> f64 {
        let weight = self.weights.get(criterion);
        if weight <= 0.0 {
            return 0.0;
        }
        (self.sub_scores.get(criterion) / weight).clamp(0.0, 1.0)
    }
}

/// Persisted status of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Invited,
    Accepted,
    Declined,
}

impl AssignmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AssignmentStatus::Invited => "invited",
            AssignmentStatus::Accepted => "accepted",
            AssignmentStatus::Declined => "declined",
        }
    }
}

/// Candidate's answer to an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Accepted,
    Declined,
}

impl From<ResponseOutcome> for AssignmentStatus {
    fn from(value: ResponseOutcome) -> Self {
        match value {
            ResponseOutcome::Accepted => AssignmentStatus::Accepted,
            ResponseOutcome::Declined => AssignmentStatus::Declined,
        }
    }
}

impl std::str::FromStr for ResponseOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accepted" | "accept" => Ok(ResponseOutcome::Accepted),
            "declined" | "decline" => Ok(ResponseOutcome::Declined),
            other => Err(format!("unknown response outcome '{}'", other)),
        }
    }
}

/// Invitation and response record for one candidate on one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub status: AssignmentStatus,
    #[serde(rename = "assignedAt")]
    pub assigned_at: DateTime<Utc>,
    #[serde(rename = "responseAt", default)]
    pub response_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a (request, candidate) pair, including the absence of
/// an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationState {
    NotInvited,
    Invited,
    Accepted,
    Declined,
}

impl InvitationState {
    pub fn of(assignment: Option<&Assignment>) -> Self {
        match assignment.map(|a| a.status) {
            None => InvitationState::NotInvited,
            Some(AssignmentStatus::Invited) => InvitationState::Invited,
            Some(AssignmentStatus::Accepted) => InvitationState::Accepted,
            Some(AssignmentStatus::Declined) => InvitationState::Declined,
        }
    }
}

impl fmt::Display for InvitationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvitationState::NotInvited => "not_invited",
            InvitationState::Invited => "invited",
            InvitationState::Accepted => "accepted",
            InvitationState::Declined => "declined",
        };
        f.write_str(label)
    }
}

/// Filter applied when listing the candidate pool for a request
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    /// Skip profiles flagged inactive
    pub active_only: bool,
    pub exclude_ids: Vec<String>,
    pub limit: Option<usize>,
}

impl CandidateFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn accepts(&self, candidate: &Candidate) -> bool {
        if self.active_only && !candidate.is_active {
            return false;
        }
        !self.exclude_ids.contains(&candidate.id)
    }
}

/// Partial update applied to an existing assignment.
///
/// `expected` is the status the assignment must still have for the update to
/// apply.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPatch {
    pub expected: AssignmentStatus,
    pub status: AssignmentStatus,
    pub response_at: Option<DateTime<Utc>>,
}

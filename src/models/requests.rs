use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::WeightConfig;

/// Request to replace the active weights
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateWeightsRequest {
    #[validate(range(min = 0.0))]
    pub location: f64,
    #[validate(range(min = 0.0))]
    pub interests: f64,
    #[validate(range(min = 0.0))]
    pub background: f64,
    #[validate(range(min = 0.0))]
    pub availability: f64,
    #[validate(range(min = 0.0))]
    pub frequency: f64,
    #[validate(range(min = 0.0))]
    pub timing: f64,
}

impl UpdateWeightsRequest {
    pub fn to_config(&self) -> WeightConfig {
        WeightConfig {
            location: self.location,
            interests: self.interests,
            background: self.background,
            availability: self.availability,
            frequency: self.frequency,
            timing: self.timing,
        }
    }
}

/// Request to replace the active weights with a named preset
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApplyPresetRequest {
    #[validate(length(min = 1))]
    pub preset: String,
}

/// Query parameters for listing stored matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesQuery {
    #[serde(default)]
    pub limit: Option<u16>,
    #[serde(rename = "activeOnly", default)]
    pub active_only: Option<bool>,
}

/// Request to invite a candidate to a volunteer request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: String,
}

/// Request to record a candidate's answer to an invitation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RespondRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub outcome: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_weight_fails_validation() {
        let req = UpdateWeightsRequest {
            location: -1.0,
            interests: 25.0,
            background: 25.0,
            availability: 5.0,
            frequency: 2.5,
            timing: 2.5,
        };

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_invite_request_accepts_snake_case_alias() {
        let json = r#"{"request_id": "R1", "candidate_id": "C1"}"#;
        let req: InviteRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.request_id, "R1");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_ids_fail_validation() {
        let req = InviteRequest {
            request_id: String::new(),
            candidate_id: "C1".to_string(),
        };

        assert!(req.validate().is_err());
    }
}

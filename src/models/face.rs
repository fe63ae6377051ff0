use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One stored embedding of an enrolled account, as seen by the matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledEmbedding {
    pub account_id: String,
    pub embedding: Vec<f64>,
}

/// Closest enrolled account within threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMatch {
    pub account_id: String,
    pub distance: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AccountPath {
    #[validate(length(min = 1, max = 128, message = "Account id must be 1 to 128 characters"))]
    pub account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFaceResponse {
    pub face_id: Uuid,
    pub account_id: String,
    pub dimensions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFaceResponse {
    pub account_id: String,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFaceResponse {
    pub matched: bool,
    pub account_id: Option<String>,
    pub distance: Option<f64>,
}

impl From<Option<FaceMatch>> for SearchFaceResponse {
    fn from(found: Option<FaceMatch>) -> Self {
        match found {
            Some(m) => Self {
                matched: true,
                account_id: Some(m.account_id),
                distance: Some(m.distance),
            },
            None => Self {
                matched: false,
                account_id: None,
                distance: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FareStatus {
    Charged,
    Suppressed,
    NoMatch,
}

impl std::fmt::Display for FareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FareStatus::Charged => write!(f, "CHARGED"),
            FareStatus::Suppressed => write!(f, "SUPPRESSED"),
            FareStatus::NoMatch => write!(f, "NO_MATCH"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFareResponse {
    pub status: FareStatus,
    pub account_id: Option<String>,
    pub diff_seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFacesRequest {
    #[validate(length(min = 1, message = "image1 cannot be empty"))]
    pub image1: String,
    #[validate(length(min = 1, message = "image2 cannot be empty"))]
    pub image2: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFacesResponse {
    pub verified: bool,
    pub distance: f64,
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub version: String,
    pub store: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_status_serializes_screaming_case() {
        let body = serde_json::to_value(PayFareResponse {
            status: FareStatus::NoMatch,
            account_id: None,
            diff_seconds: None,
        })
        .unwrap();
        assert_eq!(body["status"], "NO_MATCH");
        assert!(body["accountId"].is_null());
    }

    #[test]
    fn test_search_response_from_match() {
        let response = SearchFaceResponse::from(Some(FaceMatch {
            account_id: "42".into(),
            distance: 0.5,
        }));
        assert!(response.matched);
        assert_eq!(response.account_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_account_path_validation() {
        assert!(AccountPath { account_id: "42".into() }.validate().is_ok());
        assert!(AccountPath { account_id: String::new() }.validate().is_err());
        assert!(AccountPath { account_id: "x".repeat(129) }.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::models::domain::PostingId;

/// Response for the find-ride endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindRideResponse {
    pub message: String,
    pub matched: bool,
    #[serde(rename = "postingId")]
    pub posting_id: PostingId,
    #[serde(rename = "matchId", skip_serializing_if = "Option::is_none", default)]
    pub match_id: Option<uuid::Uuid>,
}

/// Response for the provide-service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferResponse {
    pub message: String,
    #[serde(rename = "postingId")]
    pub posting_id: PostingId,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Body returned when no match is stored for the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub message: String,
}

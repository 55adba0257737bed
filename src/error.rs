//! Error types for the ScamLens engine.
//!
//! The only failure modes a caller ever sees are "quota exceeded" and
//! "malformed request", both reported before any evidence gathering starts.
//! Degraded external services never surface here — they degrade the evidence
//! set, not the request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Application-level errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan limit reached: {used}/{limit}")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        next_reset: DateTime<Utc>,
    },

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        match self {
            ScanError::QuotaExceeded {
                used,
                limit,
                next_reset,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "limitReached": true,
                    "scansUsed": used,
                    "scanLimit": limit,
                    "nextResetTime": next_reset,
                })),
            )
                .into_response(),

            ScanError::InvalidArtifact(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid artifact: {msg}") })),
            )
                .into_response(),

            ScanError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Internal error: {e}") })),
            )
                .into_response(),
        }
    }
}

// Shared error envelope for the Booking API
// Every module error renders through ErrorResponse so clients see one JSON shape

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;

/// Consistent error response structure
///
/// It carries both a machine-readable `error_code` and a human-readable
/// `message`; `details` holds structured context such as the mismatching
/// field of a calculation error.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "TOTAL_MISMATCH")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional structured details, omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(
        error_code: &str,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Pair the envelope with a status code and render it
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

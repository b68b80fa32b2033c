//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
///
/// Failures are rendered by `AppError` itself, so this only carries data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Outcome of a vote or poll-vote request.
///
/// A repeated vote is an expected outcome rather than a failure, so it is
/// reported here with `success: false` instead of as an error status.
#[derive(Debug, Serialize)]
pub struct VoteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl VoteOutcome {
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub const fn rejected(code: &'static str) -> Self {
        Self {
            success: false,
            error: Some(code),
        }
    }
}

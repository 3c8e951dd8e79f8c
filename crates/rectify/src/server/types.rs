//! JSON error envelope shared by all endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A uniform API error: status code, a user-presentable message, and an
/// optional internal detail string.
pub struct ApiErrorType {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, detail): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "detail": self.detail,
        });
        (self.status, Json(body)).into_response()
    }
}

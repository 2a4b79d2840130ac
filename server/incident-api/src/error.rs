//! Mapping of tracker errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use incident_core::TrackerError;
use serde_json::json;
use tracing::error;

/// Handler error. Every variant is user-facing except storage failures.
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
  fn from(e: TrackerError) -> Self {
    Self(e)
  }
}

impl From<incident_core::ValidationError> for ApiError {
  fn from(e: incident_core::ValidationError) -> Self {
    Self(TrackerError::Validation(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self.0 {
      TrackerError::Validation(err) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "Validation failed", "details": err.details }),
      ),
      TrackerError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": "Incident not found" })),
      TrackerError::Malformed(_) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "Request body must be JSON" }),
      ),
      TrackerError::Storage(reason) => {
        error!(%reason, "storage failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({ "error": "Internal server error" }),
        )
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes() {
    let cases = [
      (TrackerError::not_found("x"), StatusCode::NOT_FOUND),
      (TrackerError::malformed("bad"), StatusCode::BAD_REQUEST),
      (TrackerError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
      (
        TrackerError::Validation(incident_core::ValidationError::default()),
        StatusCode::BAD_REQUEST,
      ),
    ];
    for (err, expected) in cases {
      assert_eq!(ApiError(err).into_response().status(), expected);
    }
  }
}

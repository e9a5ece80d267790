//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use oifind_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The filter mapping was rejected before any backend call.
  #[error("{0}")]
  BadRequest(String),

  /// The store failed or timed out. Never reported as an empty result.
  #[error("{0}")]
  Upstream(String),
}

impl From<oifind_core::Error> for ApiError {
  fn from(e: oifind_core::Error) -> Self {
    match e.kind() {
      ErrorKind::Configuration => Self::BadRequest(e.to_string()),
      ErrorKind::Execution => Self::Upstream(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
      tracing::warn!(error = %self, "query failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

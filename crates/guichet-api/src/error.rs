//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use guichet_core::Error as WorkflowError;

/// An error returned by an API handler. Each variant maps one kind of the
/// workflow taxonomy onto its HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The caller should reload the demande and retry.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("upstream dependency failed: {0}")]
  Dependency(String),
}

impl From<WorkflowError> for ApiError {
  fn from(err: WorkflowError) -> Self {
    let message = err.to_string();
    match err {
      WorkflowError::NotFound(_) => ApiError::NotFound(message),
      WorkflowError::Forbidden { .. } => ApiError::Forbidden(message),
      WorkflowError::InvalidArgument(_) => ApiError::BadRequest(message),
      WorkflowError::Conflict(_) => ApiError::Conflict(message),
      WorkflowError::DependencyFailure(_) => ApiError::Dependency(message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Dependency(m) => (StatusCode::BAD_GATEWAY, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use growth_timelapse::AssemblyError;
use serde_json::json;
use thiserror::Error;

/// Lines of encoder output included in an `encoding_failed` response.
const LOG_EXCERPT_LINES: usize = 20;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("time-lapse error: {0}")]
  Assembly(#[from] AssemblyError),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": m }))
      }
      ApiError::Assembly(e) => {
        let status = match e {
          AssemblyError::InsufficientFrames { .. } => StatusCode::UNPROCESSABLE_ENTITY,
          AssemblyError::AlreadyRunning(_) => StatusCode::CONFLICT,
          AssemblyError::StagingFailed { .. }
          | AssemblyError::EncodingFailed { .. }
          | AssemblyError::IoFailure { .. } => {
            tracing::error!(error = %e, "time-lapse assembly failed");
            StatusCode::INTERNAL_SERVER_ERROR
          }
        };
        let mut body = json!({ "error": e.user_message(), "kind": e.kind() });
        if let Some(excerpt) = e.log_excerpt(LOG_EXCERPT_LINES) {
          body["log_excerpt"] = excerpt.into();
        }
        (status, body)
      }
    };
    (status, Json(body)).into_response()
  }
}

//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"error": "<message>", "kind": "<kind>"}`
//! where `kind` is the snake_case [`ErrorKind`].

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use enroll_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error, keeping its classification.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    ApiError::Store { kind: e.kind(), source: Box::new(e) }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::NotFound(_) => ErrorKind::NotFound,
      ApiError::BadRequest(_) => ErrorKind::Validation,
      ApiError::Store { kind, .. } => *kind,
    }
  }
}

/// HTTP status for an error classification.
pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound | ErrorKind::EmptyQueue => StatusCode::NOT_FOUND,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    if kind == ErrorKind::Persistence {
      error!(error = %self, "store failure");
    }
    let body = json!({ "error": self.to_string(), "kind": kind });
    (status_for(kind), Json(body)).into_response()
  }
}

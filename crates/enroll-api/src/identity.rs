//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches these
//! handlers the worker's identity is carried in the `X-Worker-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use enroll_core::queue::WorkerId;

use crate::error::ApiError;

pub const WORKER_HEADER: &str = "x-worker-id";

/// The acting worker. Rejects the request with 400 when the header is
/// missing or blank.
pub struct Caller(pub WorkerId);

/// Like [`Caller`] but optional, for actions an anonymous caller may take.
pub struct MaybeCaller(pub Option<WorkerId>);

fn worker_from(parts: &Parts) -> Option<WorkerId> {
  parts
    .headers
    .get(WORKER_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(WorkerId::new)
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    worker_from(parts)
      .map(Caller)
      .ok_or_else(|| ApiError::BadRequest(format!("missing {WORKER_HEADER} header")))
  }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeCaller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeCaller(worker_from(parts)))
  }
}

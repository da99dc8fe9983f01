//! Handlers for `/queue` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/queue` | Optional `?status=` and `?priority=`; serving order |
//! | `GET`  | `/queue/next` | Head of the line or `null`; claims nothing |
//! | `GET`  | `/queue/mine` | Items held by the caller |
//! | `POST` | `/queue/claim` | Claim the head of the line |
//! | `GET`  | `/queue/{id}` | 404 if not found |
//! | `POST` | `/queue/{id}/claim` | Claim a specific waiting item |
//! | `POST` | `/queue/{id}/complete` | Caller must hold the item |
//! | `POST` | `/queue/{id}/release` | Caller must hold the item |
//! | `POST` | `/queue/{id}/cancel` | Body: `{"reason":"..."}` (optional) |
//!
//! Claiming, completing, releasing, and `/queue/mine` need `X-Worker-Id`.
//! Cancel records it when present.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use enroll_core::{
  Classify as _, ErrorKind,
  queue::{Priority, QueueEntry, QueueFilter, QueueItem, QueueStatus},
  store::AdmissionStore,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
  error::ApiError,
  identity::{Caller, MaybeCaller},
};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:   Option<QueueStatus>,
  pub priority: Option<Priority>,
}

/// Response body of `GET /queue`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueueListing {
  pub items:    Vec<QueueEntry>,
  /// `true` when the store could not be read and `items` is a placeholder.
  pub degraded: bool,
}

/// `GET /queue[?status=..][&priority=..]`
///
/// A store that cannot be read yields an empty, degraded listing rather than
/// an error, so queue displays keep rendering.
pub async fn list<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<QueueListing>, ApiError> {
  let filter = QueueFilter { status: params.status, priority: params.priority };
  match store.list_queue(&filter).await {
    Ok(items) => Ok(Json(QueueListing { items, degraded: false })),
    Err(e) if e.kind() == ErrorKind::Persistence => {
      warn!(error = %e, "queue listing degraded");
      Ok(Json(QueueListing { items: Vec::new(), degraded: true }))
    }
    Err(e) => Err(ApiError::store(e)),
  }
}

/// `GET /queue/next`
pub async fn peek<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Option<QueueEntry>>, ApiError> {
  let head = store.peek_next().await.map_err(ApiError::store)?;
  Ok(Json(head))
}

/// `GET /queue/mine`
pub async fn mine<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Caller(worker): Caller,
) -> Result<Json<Vec<QueueEntry>>, ApiError> {
  let items = store.my_queue(worker).await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `GET /queue/{id}`
pub async fn get_one<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<QueueEntry>, ApiError> {
  let entry = store
    .get_queue_item(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("queue item {id} not found")))?;
  Ok(Json(entry))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /queue/claim`
pub async fn claim_next<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Caller(worker): Caller,
) -> Result<Json<QueueItem>, ApiError> {
  let item = store.claim_next(worker).await.map_err(ApiError::store)?;
  Ok(Json(item))
}

/// `POST /queue/{id}/claim`
pub async fn claim<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  Caller(worker): Caller,
) -> Result<Json<QueueItem>, ApiError> {
  let item = store.claim_specific(id, worker).await.map_err(ApiError::store)?;
  Ok(Json(item))
}

/// `POST /queue/{id}/complete`
pub async fn complete<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  Caller(worker): Caller,
) -> Result<Json<QueueItem>, ApiError> {
  let item = store.complete_item(id, worker).await.map_err(ApiError::store)?;
  Ok(Json(item))
}

/// `POST /queue/{id}/release`
pub async fn release<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  Caller(worker): Caller,
) -> Result<Json<QueueItem>, ApiError> {
  let item = store.release_item(id, worker).await.map_err(ApiError::store)?;
  Ok(Json(item))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
  pub reason: Option<String>,
}

/// `POST /queue/{id}/cancel`
pub async fn cancel<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  MaybeCaller(actor): MaybeCaller,
  body: Option<Json<CancelBody>>,
) -> Result<Json<QueueItem>, ApiError> {
  let reason = body
    .and_then(|Json(b)| b.reason)
    .filter(|r| !r.trim().is_empty());
  let item = store.cancel_item(id, reason, actor).await.map_err(ApiError::store)?;
  Ok(Json(item))
}

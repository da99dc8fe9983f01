//! Handlers for `/applications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/applications` | Body: [`ApplicationForm`]; returns 201 + receipt |
//! | `GET`  | `/applications` | Optional `status`, `grade_level`, `search`, `submitted_from`, `submitted_until` |
//! | `GET`  | `/applications/{id}` | 404 if not found |
//! | `POST` | `/applications/{id}/decision` | Body: `{"decision":"approved","notes":"..."}`; needs `X-Worker-Id` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use enroll_core::{
  application::{
    ApplicationForm, ApplicationQuery, ApplicationSummary, Decision, DecisionInput,
    EnrollmentApplication, EnrollmentStatus, GradeLevel,
  },
  store::AdmissionStore,
};
use serde::Deserialize;

use crate::{error::ApiError, identity::Caller};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /applications`
pub async fn submit<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Json(form): Json<ApplicationForm>,
) -> Result<impl IntoResponse, ApiError> {
  let receipt = store.submit_application(form).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:          Option<EnrollmentStatus>,
  pub grade_level:     Option<GradeLevel>,
  pub search:          Option<String>,
  /// Inclusive lower bound on `submitted_at`, RFC 3339.
  pub submitted_from:  Option<DateTime<Utc>>,
  /// Exclusive upper bound on `submitted_at`, RFC 3339.
  pub submitted_until: Option<DateTime<Utc>>,
}

/// `GET /applications[?status=..][&grade_level=..][&search=..]`
pub async fn list<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ApplicationSummary>>, ApiError> {
  let query = ApplicationQuery {
    status:          params.status,
    grade_level:     params.grade_level,
    search:          params.search.filter(|s| !s.trim().is_empty()),
    submitted_from:  params.submitted_from,
    submitted_until: params.submitted_until,
  };
  let apps = store.list_applications(&query).await.map_err(ApiError::store)?;
  Ok(Json(apps))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /applications/{id}`
pub async fn get_one<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<ApplicationSummary>, ApiError> {
  let app = store
    .get_application(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("application {id} not found")))?;
  Ok(Json(app))
}

// ─── Decide ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
  pub decision: Decision,
  pub notes:    Option<String>,
}

/// `POST /applications/{id}/decision`
pub async fn decide<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  Caller(worker): Caller,
  Json(body): Json<DecisionBody>,
) -> Result<Json<EnrollmentApplication>, ApiError> {
  let input = DecisionInput {
    decision:   body.decision,
    decided_by: worker,
    notes:      body.notes,
  };
  let app = store.decide_application(id, input).await.map_err(ApiError::store)?;
  Ok(Json(app))
}

//! Handlers for `/stats` and `/activity` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stats/queue` | Live counts and wait estimates; degrades instead of failing |
//! | `GET`  | `/stats/dashboard` | Application and queue totals |
//! | `GET`  | `/stats/enrollments` | Applications per enrollment status |
//! | `GET`  | `/stats/queue-analytics` | Historical waits per tier and per day |
//! | `GET`  | `/stats/grade-levels` | Decisions per grade level |
//! | `GET`  | `/stats/enrollment-trends` | Optional `?period=daily\|weekly\|monthly` (default monthly) |
//! | `GET`  | `/activity` | Optional `?limit=` (default 50) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use enroll_core::{
  Classify as _, ErrorKind,
  activity::ActivityEntry,
  stats::{
    DashboardStats, EnrollmentCounts, EnrollmentTrend, GradeLevelStats, QueueAnalytics,
    QueueStats, TrendPeriod,
  },
  store::AdmissionStore,
};
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;

/// Default page size for `GET /activity`.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// `GET /stats/queue`
pub async fn queue<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<QueueStats>, ApiError> {
  match store.queue_stats().await {
    Ok(stats) => Ok(Json(stats)),
    Err(e) if e.kind() == ErrorKind::Persistence => {
      warn!(error = %e, "queue stats degraded");
      Ok(Json(QueueStats::degraded()))
    }
    Err(e) => Err(ApiError::store(e)),
  }
}

/// `GET /stats/dashboard`
pub async fn dashboard<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<DashboardStats>, ApiError> {
  Ok(Json(store.dashboard_stats().await.map_err(ApiError::store)?))
}

/// `GET /stats/enrollments`
pub async fn enrollments<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<EnrollmentCounts>, ApiError> {
  Ok(Json(store.enrollment_counts().await.map_err(ApiError::store)?))
}

/// `GET /stats/queue-analytics`
pub async fn analytics<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<QueueAnalytics>, ApiError> {
  Ok(Json(store.queue_analytics().await.map_err(ApiError::store)?))
}

/// `GET /stats/grade-levels`
pub async fn grade_levels<S: AdmissionStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<GradeLevelStats>>, ApiError> {
  Ok(Json(store.grade_level_stats().await.map_err(ApiError::store)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
  pub period: Option<TrendPeriod>,
}

/// `GET /stats/enrollment-trends[?period=..]`
pub async fn enrollment_trends<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<TrendParams>,
) -> Result<Json<Vec<EnrollmentTrend>>, ApiError> {
  let period = params.period.unwrap_or_default();
  Ok(Json(store.enrollment_trends(period).await.map_err(ApiError::store)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
  pub limit: Option<usize>,
}

/// `GET /activity[?limit=N]`
pub async fn activity<S: AdmissionStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
  Ok(Json(store.recent_activity(limit).await.map_err(ApiError::store)?))
}

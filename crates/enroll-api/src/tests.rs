//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use enroll_core::{
  Classify, ErrorKind,
  activity::ActivityEntry,
  application::{
    ApplicationForm, ApplicationQuery, ApplicationSummary, DecisionInput,
    EnrollmentApplication, SubmissionReceipt,
  },
  queue::{QueueEntry, QueueFilter, QueueItem, WorkerId},
  stats::{
    DashboardStats, EnrollmentCounts, EnrollmentTrend, GradeLevelStats, QueueAnalytics,
    QueueStats, TrendPeriod,
  },
  store::AdmissionStore,
};
use enroll_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{WORKER_HEADER, api_router};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn call(
  app: &Router,
  method: &str,
  uri: &str,
  worker: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(w) = worker {
    builder = builder.header(WORKER_HEADER, w);
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };

  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn submit(app: &Router, first: &str, priority: &str) -> Value {
  let (status, body) = call(
    app,
    "POST",
    "/applications",
    None,
    Some(json!({ "first_name": first, "last_name": "Applicant", "priority_level": priority })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body
}

// ─── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_returns_receipt() {
  let app = app().await;
  let receipt = submit(&app, "Ada", "high").await;
  assert_eq!(receipt["queue_number"], 1);
  assert!(receipt["student_number"].as_str().unwrap().ends_with("0001"));

  let id = receipt["application_id"].as_i64().unwrap();
  let (status, body) = call(&app, "GET", &format!("/applications/{id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["applicant"]["first_name"], "Ada");
  assert_eq!(body["application"]["status"], "pending");
  assert_eq!(body["queue_status"], "waiting");
}

#[tokio::test]
async fn unknown_priority_is_rejected() {
  let app = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/applications",
    None,
    Some(json!({ "first_name": "Ada", "priority_level": "urgent" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn missing_application_is_404() {
  let app = app().await;
  let (status, body) = call(&app, "GET", "/applications/42", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn decision_is_final() {
  let app = app().await;
  let receipt = submit(&app, "Ada", "medium").await;
  let id = receipt["application_id"].as_i64().unwrap();
  let uri = format!("/applications/{id}/decision");
  let decision = json!({ "decision": "rejected", "notes": "incomplete" });

  let (status, _) = call(&app, "POST", &uri, None, Some(decision.clone())).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    call(&app, "POST", &uri, Some("registrar"), Some(decision.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "rejected");
  assert_eq!(body["processed_by"], "registrar");

  let (status, body) = call(&app, "POST", &uri, Some("registrar"), Some(decision)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "conflict");

  let (_, list) = call(&app, "GET", "/applications?status=rejected", None, None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn queue_lists_in_serving_order() {
  let app = app().await;
  submit(&app, "Lo", "low").await;
  submit(&app, "Hi", "high").await;
  submit(&app, "Mid", "medium").await;

  let (status, body) = call(&app, "GET", "/queue", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["degraded"], false);
  let names: Vec<_> = body["items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["first_name"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(names, ["Hi", "Mid", "Lo"]);

  let (_, head) = call(&app, "GET", "/queue/next", None, None).await;
  assert_eq!(head["first_name"], "Hi");

  let (_, low) = call(&app, "GET", "/queue?priority=low", None, None).await;
  assert_eq!(low["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn claim_and_complete_flow() {
  let app = app().await;
  submit(&app, "Ada", "medium").await;

  let (status, body) = call(&app, "POST", "/queue/claim", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "validation");

  let (status, item) = call(&app, "POST", "/queue/claim", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(item["status"], "processing");
  assert_eq!(item["assigned_worker"], "alice");
  let id = item["id"].as_i64().unwrap();

  let (_, mine) = call(&app, "GET", "/queue/mine", Some("alice"), None).await;
  assert_eq!(mine.as_array().unwrap().len(), 1);

  let uri = format!("/queue/{id}/complete");
  let (status, body) = call(&app, "POST", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["kind"], "forbidden");

  let (status, done) = call(&app, "POST", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["status"], "completed");
  assert!(done["actual_wait_minutes"].is_i64());

  let (status, body) =
    call(&app, "POST", &format!("/queue/{id}/cancel"), Some("sup"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn empty_queue_claim_is_404() {
  let app = app().await;
  let (status, body) = call(&app, "POST", "/queue/claim", Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "empty_queue");

  let (status, head) = call(&app, "GET", "/queue/next", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(head.is_null());
}

#[tokio::test]
async fn second_claim_of_an_item_conflicts() {
  let app = app().await;
  submit(&app, "Ada", "medium").await;
  let (_, listing) = call(&app, "GET", "/queue", None, None).await;
  let id = listing["items"][0]["id"].as_i64().unwrap();
  let uri = format!("/queue/{id}/claim");

  let (status, _) = call(&app, "POST", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, body) = call(&app, "POST", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn cancel_records_reason() {
  let app = app().await;
  submit(&app, "Ada", "medium").await;
  let (_, listing) = call(&app, "GET", "/queue", None, None).await;
  let id = listing["items"][0]["id"].as_i64().unwrap();

  let (status, item) = call(
    &app,
    "POST",
    &format!("/queue/{id}/cancel"),
    None,
    Some(json!({ "reason": "withdrawn" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(item["status"], "cancelled");
  assert_eq!(item["cancel_reason"], "withdrawn");
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_endpoints_answer() {
  let app = app().await;
  submit(&app, "Ada", "high").await;

  let (status, stats) = call(&app, "GET", "/stats/queue", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["waiting_count"], 1);
  assert_eq!(stats["estimated_wait_by_priority"]["high"], 15.0);
  assert_eq!(stats["degraded"], false);

  for uri in [
    "/stats/dashboard",
    "/stats/enrollments",
    "/stats/queue-analytics",
    "/stats/grade-levels",
    "/activity?limit=5",
  ] {
    let (status, _) = call(&app, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
  }

  let (status, trends) =
    call(&app, "GET", "/stats/enrollment-trends?period=daily", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(trends[0]["count"], 1);
  assert_eq!(trends[0]["pending"], 1);
  assert_eq!(trends[0]["period"].as_str().map(str::len), Some(10));

  let (status, monthly) = call(&app, "GET", "/stats/enrollment-trends", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(monthly[0]["period"].as_str().map(str::len), Some(7));
}

// ─── Degraded reads ──────────────────────────────────────────────────────────

/// A store whose every call fails as if the database were unreachable.
struct BrokenStore;

#[derive(Debug, thiserror::Error)]
#[error("database unavailable")]
struct Unavailable;

impl Classify for Unavailable {
  fn kind(&self) -> ErrorKind { ErrorKind::Persistence }
}

type Broken<T> = Result<T, Unavailable>;

impl AdmissionStore for BrokenStore {
  type Error = Unavailable;

  async fn submit_application(&self, _: ApplicationForm) -> Broken<SubmissionReceipt> {
    Err(Unavailable)
  }
  async fn get_application(&self, _: i64) -> Broken<Option<ApplicationSummary>> {
    Err(Unavailable)
  }
  async fn list_applications(
    &self,
    _: &ApplicationQuery,
  ) -> Broken<Vec<ApplicationSummary>> {
    Err(Unavailable)
  }
  async fn decide_application(
    &self,
    _: i64,
    _: DecisionInput,
  ) -> Broken<EnrollmentApplication> {
    Err(Unavailable)
  }
  async fn list_queue(&self, _: &QueueFilter) -> Broken<Vec<QueueEntry>> {
    Err(Unavailable)
  }
  async fn get_queue_item(&self, _: i64) -> Broken<Option<QueueEntry>> {
    Err(Unavailable)
  }
  async fn peek_next(&self) -> Broken<Option<QueueEntry>> { Err(Unavailable) }
  async fn my_queue(&self, _: WorkerId) -> Broken<Vec<QueueEntry>> {
    Err(Unavailable)
  }
  async fn claim_next(&self, _: WorkerId) -> Broken<QueueItem> { Err(Unavailable) }
  async fn claim_specific(&self, _: i64, _: WorkerId) -> Broken<QueueItem> {
    Err(Unavailable)
  }
  async fn complete_item(&self, _: i64, _: WorkerId) -> Broken<QueueItem> {
    Err(Unavailable)
  }
  async fn release_item(&self, _: i64, _: WorkerId) -> Broken<QueueItem> {
    Err(Unavailable)
  }
  async fn cancel_item(
    &self,
    _: i64,
    _: Option<String>,
    _: Option<WorkerId>,
  ) -> Broken<QueueItem> {
    Err(Unavailable)
  }
  async fn queue_stats(&self) -> Broken<QueueStats> { Err(Unavailable) }
  async fn dashboard_stats(&self) -> Broken<DashboardStats> { Err(Unavailable) }
  async fn enrollment_counts(&self) -> Broken<EnrollmentCounts> { Err(Unavailable) }
  async fn queue_analytics(&self) -> Broken<QueueAnalytics> { Err(Unavailable) }
  async fn grade_level_stats(&self) -> Broken<Vec<GradeLevelStats>> {
    Err(Unavailable)
  }
  async fn enrollment_trends(&self, _: TrendPeriod) -> Broken<Vec<EnrollmentTrend>> {
    Err(Unavailable)
  }
  async fn recent_activity(&self, _: usize) -> Broken<Vec<ActivityEntry>> {
    Err(Unavailable)
  }
}

#[tokio::test]
async fn unreadable_store_degrades_queue_reads() {
  let app = api_router(Arc::new(BrokenStore));

  let (status, listing) = call(&app, "GET", "/queue", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listing, json!({ "items": [], "degraded": true }));

  let (status, stats) = call(&app, "GET", "/stats/queue", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["degraded"], true);
  assert_eq!(stats["waiting_count"], 0);

  let (status, body) = call(&app, "GET", "/stats/dashboard", None, None).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["kind"], "persistence");

  let (status, _) = call(&app, "POST", "/queue/claim", Some("alice"), None).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

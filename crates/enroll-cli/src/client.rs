//! Async HTTP client wrapping the enrollment JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use enroll_core::{
  activity::ActivityEntry,
  application::{ApplicationForm, ApplicationSummary, EnrollmentApplication, SubmissionReceipt},
  queue::{QueueEntry, QueueItem},
  stats::{
    DashboardStats, EnrollmentCounts, EnrollmentTrend, GradeLevelStats, QueueAnalytics,
    QueueStats,
  },
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;

/// Header carrying the acting worker's identity.
const WORKER_HEADER: &str = "x-worker-id";

/// Connection settings for the enrollment API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Sent as `X-Worker-Id`; staff commands fail server-side without it.
  pub worker:   Option<String>,
}

/// Mirrors the server's `GET /queue` response.
#[derive(Debug, Deserialize, Serialize)]
pub struct QueueListing {
  pub items:    Vec<QueueEntry>,
  pub degraded: bool,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
  kind:  String,
}

/// Async HTTP client for the enrollment JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    match &self.config.worker {
      Some(worker) => req.header(WORKER_HEADER, worker),
      None => req,
    }
  }

  /// Send `req` and decode a JSON success body, or turn the API's error body
  /// into a readable message.
  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    debug!(request = what, "sending");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let resp = check(resp, what).await?;
    resp
      .json()
      .await
      .with_context(|| format!("deserialising {what} response"))
  }

  // ── Applications ──────────────────────────────────────────────────────────

  /// `POST /api/applications`
  pub async fn submit(&self, form: &ApplicationForm) -> Result<SubmissionReceipt> {
    let req = self.request(Method::POST, "/applications").json(form);
    self.send(req, "POST /applications").await
  }

  /// `GET /api/applications`
  pub async fn list_applications(
    &self,
    query: &[(&str, String)],
  ) -> Result<Vec<ApplicationSummary>> {
    let req = self.request(Method::GET, "/applications").query(query);
    self.send(req, "GET /applications").await
  }

  /// `GET /api/applications/{id}`
  pub async fn get_application(&self, id: i64) -> Result<ApplicationSummary> {
    let path = format!("/applications/{id}");
    self.send(self.request(Method::GET, &path), &format!("GET {path}")).await
  }

  /// `POST /api/applications/{id}/decision`
  pub async fn decide(
    &self,
    id: i64,
    decision: &str,
    notes: Option<&str>,
  ) -> Result<EnrollmentApplication> {
    let path = format!("/applications/{id}/decision");
    let req = self
      .request(Method::POST, &path)
      .json(&json!({ "decision": decision, "notes": notes }));
    self.send(req, &format!("POST {path}")).await
  }

  // ── Queue ─────────────────────────────────────────────────────────────────

  /// `GET /api/queue`
  pub async fn list_queue(&self, query: &[(&str, String)]) -> Result<QueueListing> {
    let req = self.request(Method::GET, "/queue").query(query);
    self.send(req, "GET /queue").await
  }

  /// `GET /api/queue/next`
  pub async fn peek(&self) -> Result<Option<QueueEntry>> {
    self.send(self.request(Method::GET, "/queue/next"), "GET /queue/next").await
  }

  /// `GET /api/queue/mine`
  pub async fn mine(&self) -> Result<Vec<QueueEntry>> {
    self.send(self.request(Method::GET, "/queue/mine"), "GET /queue/mine").await
  }

  /// `POST /api/queue/claim` or `POST /api/queue/{id}/claim`
  pub async fn claim(&self, id: Option<i64>) -> Result<QueueItem> {
    let path = match id {
      Some(id) => format!("/queue/{id}/claim"),
      None => "/queue/claim".to_string(),
    };
    self.send(self.request(Method::POST, &path), &format!("POST {path}")).await
  }

  /// `POST /api/queue/{id}/{action}` for `complete` and `release`.
  pub async fn transition(&self, id: i64, action: &str) -> Result<QueueItem> {
    let path = format!("/queue/{id}/{action}");
    self.send(self.request(Method::POST, &path), &format!("POST {path}")).await
  }

  /// `POST /api/queue/{id}/cancel`
  pub async fn cancel(&self, id: i64, reason: Option<&str>) -> Result<QueueItem> {
    let path = format!("/queue/{id}/cancel");
    let req = self
      .request(Method::POST, &path)
      .json(&json!({ "reason": reason }));
    self.send(req, &format!("POST {path}")).await
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  pub async fn queue_stats(&self) -> Result<QueueStats> {
    self.send(self.request(Method::GET, "/stats/queue"), "GET /stats/queue").await
  }

  pub async fn dashboard(&self) -> Result<DashboardStats> {
    let path = "/stats/dashboard";
    self.send(self.request(Method::GET, path), path).await
  }

  pub async fn enrollments(&self) -> Result<EnrollmentCounts> {
    let path = "/stats/enrollments";
    self.send(self.request(Method::GET, path), path).await
  }

  pub async fn analytics(&self) -> Result<QueueAnalytics> {
    let path = "/stats/queue-analytics";
    self.send(self.request(Method::GET, path), path).await
  }

  pub async fn grade_levels(&self) -> Result<Vec<GradeLevelStats>> {
    let path = "/stats/grade-levels";
    self.send(self.request(Method::GET, path), path).await
  }

  /// `GET /api/stats/enrollment-trends?period=..`
  pub async fn enrollment_trends(&self, period: &str) -> Result<Vec<EnrollmentTrend>> {
    let req = self
      .request(Method::GET, "/stats/enrollment-trends")
      .query(&[("period", period)]);
    self.send(req, "GET /stats/enrollment-trends").await
  }

  /// `GET /api/activity?limit=N`
  pub async fn activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    let req = self
      .request(Method::GET, "/activity")
      .query(&[("limit", limit.to_string())]);
    self.send(req, "GET /activity").await
  }
}

/// Pass successful responses through; decode error bodies otherwise.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(match serde_json::from_str::<ErrorBody>(&body) {
    Ok(e) => anyhow!("{what} → {status} ({}): {}", e.kind, e.error),
    Err(_) => anyhow!("{what} → {status}"),
  })
}

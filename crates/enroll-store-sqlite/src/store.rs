//! [`SqliteStore`], the SQLite implementation of [`AdmissionStore`].

use std::{path::Path, sync::Arc};

use rusqlite::Connection;
use tracing::info;

use enroll_core::{
  activity::{ActivityAction, ActivityEntry, NewActivity, application_target, item_target},
  application::{
    ApplicationForm, ApplicationQuery, ApplicationSummary, DecisionInput,
    EnrollmentApplication, SubmissionReceipt,
  },
  clock::{Clock, SystemClock},
  queue::{QueueEntry, QueueFilter, QueueItem, WorkerId},
  stats::{
    DEFAULT_WAIT_MINUTES, DashboardStats, EnrollmentCounts, EnrollmentTrend,
    GradeLevelStats, QueueAnalytics, QueueStats, TrendPeriod,
  },
  store::AdmissionStore,
};

use crate::{
  Error, Result,
  activity::{self, ActivitySink},
  ledger, queue,
  schema::SCHEMA,
  stats,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tunables for a [`SqliteStore`].
#[derive(Clone)]
pub struct StoreOptions {
  /// Source of "now" for every timestamp the store writes.
  pub clock:                Arc<dyn Clock>,
  /// Average wait assumed before any item has completed.
  pub default_wait_minutes: f64,
  /// Bound on activity entries queued for the writer task.
  pub activity_capacity:    usize,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      clock:                Arc::new(SystemClock),
      default_wait_minutes: DEFAULT_WAIT_MINUTES,
      activity_capacity:    1024,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An admission store backed by a single SQLite file.
///
/// Cloning is cheap; the connection, activity sink, and clock are all shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:                 tokio_rusqlite::Connection,
  activity:             ActivitySink,
  clock:                Arc<dyn Clock>,
  default_wait_minutes: f64,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, options).await
  }

  async fn init(conn: tokio_rusqlite::Connection, options: StoreOptions) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    Ok(Self {
      activity: ActivitySink::spawn(conn.clone(), options.activity_capacity),
      conn,
      clock: options.clock,
      default_wait_minutes: options.default_wait_minutes,
    })
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  fn record(
    &self,
    actor: Option<&WorkerId>,
    action: ActivityAction,
    target: String,
    detail: Option<String>,
  ) {
    self.activity.record(NewActivity {
      actor: actor.cloned(),
      action,
      target,
      detail,
      recorded_at: self.clock.now(),
    });
  }
}

// ─── AdmissionStore impl ─────────────────────────────────────────────────────

impl AdmissionStore for SqliteStore {
  type Error = Error;

  // ── Entry ledger ──────────────────────────────────────────────────────────

  async fn submit_application(&self, form: ApplicationForm) -> Result<SubmissionReceipt> {
    let new = form.normalize()?;
    let priority = new.priority;
    let now = self.clock.now();

    let (receipt, item_id) = self.run(move |conn| ledger::submit(conn, new, now)).await?;

    info!(
      application_id = receipt.application_id,
      student_number = %receipt.student_number,
      queue_number = receipt.queue_number,
      item_id,
      %priority,
      "application submitted"
    );
    self.record(
      None,
      ActivityAction::ApplicationSubmitted,
      application_target(receipt.application_id),
      Some(format!("queue number {}", receipt.queue_number)),
    );
    Ok(receipt)
  }

  async fn get_application(&self, id: i64) -> Result<Option<ApplicationSummary>> {
    self.run(move |conn| ledger::get_application(conn, id)).await
  }

  async fn list_applications(
    &self,
    query: &ApplicationQuery,
  ) -> Result<Vec<ApplicationSummary>> {
    let query = query.clone();
    self.run(move |conn| ledger::list_applications(conn, &query)).await
  }

  async fn decide_application(
    &self,
    id: i64,
    decision: DecisionInput,
  ) -> Result<EnrollmentApplication> {
    let now = self.clock.now();
    let actor = decision.decided_by.clone();

    let (application, closed) =
      self.run(move |conn| ledger::decide(conn, id, &decision, now)).await?;

    info!(
      application_id = id,
      status = %application.status,
      decided_by = %actor,
      closed_item = closed.as_ref().map(|i| i.id),
      "application decided"
    );
    self.record(
      Some(&actor),
      ActivityAction::ApplicationDecided,
      application_target(id),
      Some(application.status.to_string()),
    );
    if let Some(item) = &closed {
      self.record(
        Some(&actor),
        ActivityAction::ItemCompleted,
        item_target(item.id),
        Some("closed by decision".into()),
      );
    }
    Ok(application)
  }

  // ── Queue reads ───────────────────────────────────────────────────────────

  async fn list_queue(&self, filter: &QueueFilter) -> Result<Vec<QueueEntry>> {
    let filter = filter.clone();
    self.run(move |conn| queue::list(conn, &filter)).await
  }

  async fn get_queue_item(&self, id: i64) -> Result<Option<QueueEntry>> {
    self.run(move |conn| queue::get(conn, id)).await
  }

  async fn peek_next(&self) -> Result<Option<QueueEntry>> {
    self.run(|conn| queue::peek(conn)).await
  }

  async fn my_queue(&self, worker: WorkerId) -> Result<Vec<QueueEntry>> {
    self.run(move |conn| queue::held_by(conn, &worker)).await
  }

  // ── Queue transitions ─────────────────────────────────────────────────────

  async fn claim_next(&self, worker: WorkerId) -> Result<QueueItem> {
    let now = self.clock.now();
    let who = worker.clone();
    let item = self.run(move |conn| queue::claim_next(conn, &who, now)).await?;

    info!(item_id = item.id, queue_number = item.queue_number, %worker, "claimed next item");
    self.record(Some(&worker), ActivityAction::ItemClaimed, item_target(item.id), None);
    Ok(item)
  }

  async fn claim_specific(&self, id: i64, worker: WorkerId) -> Result<QueueItem> {
    let now = self.clock.now();
    let who = worker.clone();
    let item = self
      .run(move |conn| queue::claim_specific(conn, id, &who, now))
      .await?;

    info!(item_id = id, queue_number = item.queue_number, %worker, "claimed item");
    self.record(Some(&worker), ActivityAction::ItemClaimed, item_target(id), None);
    Ok(item)
  }

  async fn complete_item(&self, id: i64, worker: WorkerId) -> Result<QueueItem> {
    let now = self.clock.now();
    let who = worker.clone();
    let item = self.run(move |conn| queue::complete(conn, id, &who, now)).await?;

    info!(
      item_id = id,
      %worker,
      wait_minutes = item.actual_wait_minutes,
      "completed item"
    );
    self.record(
      Some(&worker),
      ActivityAction::ItemCompleted,
      item_target(id),
      item.actual_wait_minutes.map(|m| format!("waited {m} minutes")),
    );
    Ok(item)
  }

  async fn release_item(&self, id: i64, worker: WorkerId) -> Result<QueueItem> {
    let who = worker.clone();
    let item = self.run(move |conn| queue::release(conn, id, &who)).await?;

    info!(item_id = id, %worker, "released item");
    self.record(Some(&worker), ActivityAction::ItemReleased, item_target(id), None);
    Ok(item)
  }

  async fn cancel_item(
    &self,
    id: i64,
    reason: Option<String>,
    actor: Option<WorkerId>,
  ) -> Result<QueueItem> {
    let now = self.clock.now();
    let item = self.run(move |conn| queue::cancel(conn, id, reason, now)).await?;

    info!(
      item_id = id,
      actor = actor.as_ref().map(|w| w.as_str()),
      reason = item.cancel_reason.as_deref(),
      "cancelled item"
    );
    self.record(
      actor.as_ref(),
      ActivityAction::ItemCancelled,
      item_target(id),
      item.cancel_reason.clone(),
    );
    Ok(item)
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  async fn queue_stats(&self) -> Result<QueueStats> {
    let fallback = self.default_wait_minutes;
    self.run(move |conn| stats::queue_stats(conn, fallback)).await
  }

  async fn dashboard_stats(&self) -> Result<DashboardStats> {
    let now = self.clock.now();
    self.run(move |conn| stats::dashboard(conn, now)).await
  }

  async fn enrollment_counts(&self) -> Result<EnrollmentCounts> {
    self.run(|conn| stats::enrollment_counts(conn)).await
  }

  async fn queue_analytics(&self) -> Result<QueueAnalytics> {
    let now = self.clock.now();
    self.run(move |conn| stats::queue_analytics(conn, now)).await
  }

  async fn grade_level_stats(&self) -> Result<Vec<GradeLevelStats>> {
    self.run(|conn| stats::grade_levels(conn)).await
  }

  async fn enrollment_trends(&self, period: TrendPeriod) -> Result<Vec<EnrollmentTrend>> {
    let now = self.clock.now();
    self.run(move |conn| stats::enrollment_trends(conn, period, now)).await
  }

  async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    self.run(move |conn| activity::recent(conn, limit)).await
  }
}

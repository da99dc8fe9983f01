//! The `AdmissionStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `enroll-store-sqlite`).
//! Higher layers (`enroll-api`, `enroll-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every mutating method is one logical state transition and must be atomic:
//! either all of its writes land or none do. Claims are compare-and-swap on
//! the item's status, so of two racing claims on the same item exactly one
//! succeeds.

use std::future::Future;

use crate::{
  Classify,
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
};

/// Abstraction over an admission store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AdmissionStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Entry ledger ──────────────────────────────────────────────────────

  /// Record applicant, application, and queue item as one unit. On failure
  /// nothing is left behind.
  fn submit_application(
    &self,
    form: ApplicationForm,
  ) -> impl Future<Output = Result<SubmissionReceipt, Self::Error>> + Send + '_;

  /// Retrieve one application. Returns `None` if not found.
  fn get_application(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ApplicationSummary>, Self::Error>> + Send + '_;

  /// Applications matching `query`, newest first.
  fn list_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> impl Future<Output = Result<Vec<ApplicationSummary>, Self::Error>> + Send + 'a;

  /// Approve or reject a pending application. A linked queue item that is
  /// still active is completed in the same transaction.
  fn decide_application(
    &self,
    id: i64,
    decision: DecisionInput,
  ) -> impl Future<Output = Result<EnrollmentApplication, Self::Error>> + Send + '_;

  // ── Queue reads ───────────────────────────────────────────────────────

  /// Items in serving order, re-read on every call.
  fn list_queue<'a>(
    &'a self,
    filter: &'a QueueFilter,
  ) -> impl Future<Output = Result<Vec<QueueEntry>, Self::Error>> + Send + 'a;

  fn get_queue_item(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<QueueEntry>, Self::Error>> + Send + '_;

  /// The head of the serving order, without claiming it.
  fn peek_next(
    &self,
  ) -> impl Future<Output = Result<Option<QueueEntry>, Self::Error>> + Send + '_;

  /// Items `worker` currently holds, oldest claim first.
  fn my_queue(
    &self,
    worker: WorkerId,
  ) -> impl Future<Output = Result<Vec<QueueEntry>, Self::Error>> + Send + '_;

  // ── Queue transitions ─────────────────────────────────────────────────

  /// Claim the head of the serving order. Fails with an `EmptyQueue` error
  /// when nothing is waiting.
  fn claim_next(
    &self,
    worker: WorkerId,
  ) -> impl Future<Output = Result<QueueItem, Self::Error>> + Send + '_;

  /// Claim a specific item, which must still be `waiting`.
  fn claim_specific(
    &self,
    id: i64,
    worker: WorkerId,
  ) -> impl Future<Output = Result<QueueItem, Self::Error>> + Send + '_;

  /// Complete an item held by `worker`.
  fn complete_item(
    &self,
    id: i64,
    worker: WorkerId,
  ) -> impl Future<Output = Result<QueueItem, Self::Error>> + Send + '_;

  /// Hand an item held by `worker` back to the waiting line.
  fn release_item(
    &self,
    id: i64,
    worker: WorkerId,
  ) -> impl Future<Output = Result<QueueItem, Self::Error>> + Send + '_;

  /// Cancel an active item. A supervisor action: the caller need not hold
  /// the item. `actor` is recorded in the activity log only.
  fn cancel_item(
    &self,
    id: i64,
    reason: Option<String>,
    actor: Option<WorkerId>,
  ) -> impl Future<Output = Result<QueueItem, Self::Error>> + Send + '_;

  // ── Statistics ────────────────────────────────────────────────────────

  fn queue_stats(
    &self,
  ) -> impl Future<Output = Result<QueueStats, Self::Error>> + Send + '_;

  fn dashboard_stats(
    &self,
  ) -> impl Future<Output = Result<DashboardStats, Self::Error>> + Send + '_;

  fn enrollment_counts(
    &self,
  ) -> impl Future<Output = Result<EnrollmentCounts, Self::Error>> + Send + '_;

  fn queue_analytics(
    &self,
  ) -> impl Future<Output = Result<QueueAnalytics, Self::Error>> + Send + '_;

  fn grade_level_stats(
    &self,
  ) -> impl Future<Output = Result<Vec<GradeLevelStats>, Self::Error>> + Send + '_;

  /// Submissions over the last twelve months bucketed by `period`, newest
  /// bucket first.
  fn enrollment_trends(
    &self,
    period: TrendPeriod,
  ) -> impl Future<Output = Result<Vec<EnrollmentTrend>, Self::Error>> + Send + '_;

  /// Newest activity-log entries first.
  fn recent_activity(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;
}

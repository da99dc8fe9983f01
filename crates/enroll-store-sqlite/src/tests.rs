//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  sync::{Arc, Mutex},
  time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use enroll_core::{
  Classify as _, ErrorKind,
  activity::ActivityAction,
  application::{
    ApplicationForm, ApplicationQuery, Decision, DecisionInput, EnrollmentStatus,
    GradeLevel,
  },
  clock::Clock,
  queue::{Priority, QueueFilter, QueueStatus, WorkerId},
  stats::TrendPeriod,
  store::AdmissionStore,
};

use crate::{SqliteStore, StoreOptions};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
  fn new(start: DateTime<Utc>) -> Arc<Self> { Arc::new(Self(Mutex::new(start))) }

  fn advance(&self, minutes: i64) {
    *self.0.lock().unwrap() += Duration::minutes(minutes);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}

fn start() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() }

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn store_with_clock() -> (SqliteStore, Arc<ManualClock>) {
  let clock = ManualClock::new(start());
  let options = StoreOptions { clock: clock.clone(), ..Default::default() };
  let store = SqliteStore::open_in_memory_with(options)
    .await
    .expect("in-memory store");
  (store, clock)
}

fn form(first: &str, priority: &str) -> ApplicationForm {
  ApplicationForm {
    first_name: Some(first.into()),
    last_name: Some("Applicant".into()),
    email: Some(format!("{}@example.test", first.to_lowercase())),
    academic_year: Some("2026-2027".into()),
    priority_level: Some(priority.into()),
    ..Default::default()
  }
}

fn worker(name: &str) -> WorkerId { WorkerId::new(name) }

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submission_creates_applicant_application_and_item() {
  let (s, _clock) = store_with_clock().await;

  let receipt = s.submit_application(form("Ada", "high")).await.unwrap();
  assert_eq!(receipt.student_number, "20260001");
  assert_eq!(receipt.queue_number, 1);

  let summary = s
    .get_application(receipt.application_id)
    .await
    .unwrap()
    .expect("application exists");
  assert_eq!(summary.applicant.details.first_name, "Ada");
  assert_eq!(summary.applicant.student_number, receipt.student_number);
  assert_eq!(summary.application.status, EnrollmentStatus::Pending);
  assert_eq!(summary.application.priority, Priority::High);
  assert_eq!(summary.application.grade_level, GradeLevel::College);
  assert_eq!(summary.queue_number, Some(1));
  assert_eq!(summary.queue_status, Some(QueueStatus::Waiting));

  let queue = s.list_queue(&QueueFilter::default()).await.unwrap();
  assert_eq!(queue.len(), 1);
  assert_eq!(queue[0].item.application_id, receipt.application_id);
  assert_eq!(queue[0].item.created_at, start());
  assert_eq!(queue[0].first_name, "Ada");
}

#[tokio::test]
async fn student_numbers_are_sequential_within_a_year() {
  let (s, _clock) = store_with_clock().await;
  let a = s.submit_application(form("Ada", "medium")).await.unwrap();
  let b = s.submit_application(form("Grace", "medium")).await.unwrap();
  assert_eq!(a.student_number, "20260001");
  assert_eq!(b.student_number, "20260002");
}

#[tokio::test]
async fn invalid_form_writes_nothing() {
  let s = store().await;
  let err = s.submit_application(form("Ada", "urgent")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let apps = s.list_applications(&ApplicationQuery::default()).await.unwrap();
  assert!(apps.is_empty());
  assert!(s.list_queue(&QueueFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_submission_leaves_no_partial_rows() {
  let s = store().await;
  s.run(|conn| {
    conn.execute_batch(
      "CREATE TRIGGER reject_queue_items BEFORE INSERT ON queue_items
       BEGIN SELECT RAISE(ABORT, 'queue table unavailable'); END;",
    )?;
    Ok(())
  })
  .await
  .unwrap();

  let err = s.submit_application(form("Ada", "high")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Persistence);

  let counts = s
    .run(|conn| {
      let count = |table: &str| {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
          r.get::<_, i64>(0)
        })
      };
      Ok((count("students")?, count("applications")?))
    })
    .await
    .unwrap();
  assert_eq!(counts, (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_unique_queue_numbers() {
  let s = store().await;

  let handles: Vec<_> = (0..50)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move {
        s.submit_application(form(&format!("Applicant{i}"), "medium")).await
      })
    })
    .collect();

  let mut numbers = Vec::new();
  let mut students = Vec::new();
  for handle in handles {
    let receipt = handle.await.unwrap().unwrap();
    numbers.push(receipt.queue_number);
    students.push(receipt.student_number);
  }
  numbers.sort_unstable();
  assert_eq!(numbers, (1..=50).collect::<Vec<_>>());

  students.sort();
  students.dedup();
  assert_eq!(students.len(), 50);
}

// ─── Serving order ───────────────────────────────────────────────────────────

#[tokio::test]
async fn priority_beats_arrival_time() {
  let (s, clock) = store_with_clock().await;

  s.submit_application(form("Carol", "low")).await.unwrap();
  clock.advance(1);
  s.submit_application(form("Alice", "high")).await.unwrap();
  clock.advance(1);
  s.submit_application(form("Bob", "high")).await.unwrap();

  let queue = s.list_queue(&QueueFilter::default()).await.unwrap();
  let names: Vec<_> = queue.iter().map(|e| e.first_name.as_str()).collect();
  assert_eq!(names, ["Alice", "Bob", "Carol"]);

  let peeked = s.peek_next().await.unwrap().expect("queue not empty");
  assert_eq!(peeked.first_name, "Alice");

  let claimed = s.claim_next(worker("w1")).await.unwrap();
  assert_eq!(claimed.id, peeked.item.id);
  assert_eq!(claimed.status, QueueStatus::Processing);
}

#[tokio::test]
async fn listing_sorts_regardless_of_submission_order() {
  let s = store().await;
  s.submit_application(form("Lo", "low")).await.unwrap();
  s.submit_application(form("Hi", "high")).await.unwrap();
  s.submit_application(form("Mid", "medium")).await.unwrap();

  let queue = s.list_queue(&QueueFilter::default()).await.unwrap();
  let tiers: Vec<_> = queue.iter().map(|e| e.item.priority).collect();
  assert_eq!(tiers, [Priority::High, Priority::Medium, Priority::Low]);
}

#[tokio::test]
async fn claim_next_on_empty_queue() {
  let s = store().await;
  let err = s.claim_next(worker("w1")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyQueue);
  assert!(s.peek_next().await.unwrap().is_none());
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_claims_on_one_item_have_one_winner() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let id = s.list_queue(&QueueFilter::default()).await.unwrap()[0].item.id;

  let (a, b) = tokio::join!(
    s.claim_specific(id, worker("alice")),
    s.claim_specific(id, worker("bob")),
  );

  let outcomes = [a, b];
  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
  assert_eq!(loser.kind(), ErrorKind::Conflict);

  let item = s.get_queue_item(id).await.unwrap().unwrap().item;
  assert_eq!(item.status, QueueStatus::Processing);
  assert!(item.assigned_worker.is_some());
}

#[tokio::test]
async fn only_the_holder_may_complete() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let item = s.claim_next(worker("alice")).await.unwrap();

  let err = s.complete_item(item.id, worker("bob")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let unchanged = s.get_queue_item(item.id).await.unwrap().unwrap().item;
  assert_eq!(unchanged.status, QueueStatus::Processing);
  assert_eq!(unchanged.assigned_worker, Some(worker("alice")));
  assert_eq!(unchanged.completed_at, None);
}

#[tokio::test]
async fn completion_records_whole_minutes_waited() {
  let (s, clock) = store_with_clock().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();

  clock.advance(5);
  let item = s.claim_next(worker("alice")).await.unwrap();
  assert_eq!(item.started_at, Some(start() + Duration::minutes(5)));

  clock.advance(37);
  let done = s.complete_item(item.id, worker("alice")).await.unwrap();
  assert_eq!(done.status, QueueStatus::Completed);
  assert_eq!(done.actual_wait_minutes, Some(42));
  assert_eq!(done.assigned_worker, None);

  let stored = s.get_queue_item(item.id).await.unwrap().unwrap().item;
  assert_eq!(stored, done);
}

#[tokio::test]
async fn complete_on_waiting_item_is_a_conflict() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let id = s.list_queue(&QueueFilter::default()).await.unwrap()[0].item.id;

  let err = s.complete_item(id, worker("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn missing_items_are_not_found() {
  let s = store().await;
  assert!(s.get_queue_item(99).await.unwrap().is_none());
  let err = s.claim_specific(99, worker("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cancel_terminal_item_is_not_found() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let item = s.claim_next(worker("alice")).await.unwrap();
  s.complete_item(item.id, worker("alice")).await.unwrap();

  let err = s
    .cancel_item(item.id, Some("duplicate".into()), Some(worker("sup")))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let stored = s.get_queue_item(item.id).await.unwrap().unwrap().item;
  assert_eq!(stored.status, QueueStatus::Completed);
}

#[tokio::test]
async fn cancel_needs_no_holder_and_keeps_the_reason() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let item = s.claim_next(worker("alice")).await.unwrap();

  let cancelled = s
    .cancel_item(item.id, Some("withdrawn".into()), Some(worker("sup")))
    .await
    .unwrap();
  assert_eq!(cancelled.status, QueueStatus::Cancelled);
  assert_eq!(cancelled.cancel_reason.as_deref(), Some("withdrawn"));
  assert_eq!(cancelled.assigned_worker, None);

  // Cancelled items stay visible in the default listing.
  let queue = s.list_queue(&QueueFilter::default()).await.unwrap();
  assert_eq!(queue.len(), 1);
  assert!(s.my_queue(worker("alice")).await.unwrap().is_empty());
}

#[tokio::test]
async fn release_puts_item_back_in_line() {
  let (s, clock) = store_with_clock().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  clock.advance(1);
  s.submit_application(form("Grace", "medium")).await.unwrap();

  let first = s.claim_next(worker("alice")).await.unwrap();
  let released = s.release_item(first.id, worker("alice")).await.unwrap();
  assert_eq!(released.status, QueueStatus::Waiting);
  assert_eq!(released.assigned_worker, None);

  // Original arrival time keeps it at the head.
  let again = s.claim_next(worker("bob")).await.unwrap();
  assert_eq!(again.id, first.id);
  assert_eq!(again.assigned_worker, Some(worker("bob")));

  let err = s.release_item(first.id, worker("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn my_queue_lists_only_held_items() {
  let (s, clock) = store_with_clock().await;
  for name in ["A", "B", "C"] {
    s.submit_application(form(name, "medium")).await.unwrap();
    clock.advance(1);
  }
  let first = s.claim_next(worker("alice")).await.unwrap();
  clock.advance(1);
  s.claim_next(worker("bob")).await.unwrap();
  clock.advance(1);
  let third = s.claim_next(worker("alice")).await.unwrap();

  let mine = s.my_queue(worker("alice")).await.unwrap();
  let ids: Vec<_> = mine.iter().map(|e| e.item.id).collect();
  assert_eq!(ids, [first.id, third.id]);
}

#[tokio::test]
async fn status_filter_narrows_the_active_listing() {
  let s = store().await;
  s.submit_application(form("A", "medium")).await.unwrap();
  s.submit_application(form("B", "high")).await.unwrap();
  s.submit_application(form("C", "low")).await.unwrap();
  let done = s.claim_next(worker("alice")).await.unwrap();
  s.complete_item(done.id, worker("alice")).await.unwrap();
  let held = s.claim_next(worker("bob")).await.unwrap();

  let active = s.list_queue(&QueueFilter::default()).await.unwrap();
  assert_eq!(active.len(), 2);
  assert!(active.iter().all(|e| e.item.id != done.id));

  let processing = s
    .list_queue(&QueueFilter { status: Some(QueueStatus::Processing), priority: None })
    .await
    .unwrap();
  assert_eq!(processing.len(), 1);
  assert_eq!(processing[0].item.id, held.id);

  let completed = s
    .list_queue(&QueueFilter { status: Some(QueueStatus::Completed), priority: None })
    .await
    .unwrap();
  assert!(completed.is_empty());

  let high = s
    .list_queue(&QueueFilter { status: None, priority: Some(Priority::High) })
    .await
    .unwrap();
  assert!(high.is_empty());
}

// ─── Decisions ───────────────────────────────────────────────────────────────

fn approve(by: &str) -> DecisionInput {
  DecisionInput {
    decision:   Decision::Approved,
    decided_by: worker(by),
    notes:      Some("documents complete".into()),
  }
}

#[tokio::test]
async fn decision_closes_the_active_item() {
  let (s, clock) = store_with_clock().await;
  let receipt = s.submit_application(form("Ada", "medium")).await.unwrap();
  let item = s.claim_next(worker("alice")).await.unwrap();

  clock.advance(25);
  let decided = s
    .decide_application(receipt.application_id, approve("registrar"))
    .await
    .unwrap();
  assert_eq!(decided.status, EnrollmentStatus::Approved);
  assert_eq!(decided.processed_by, Some(worker("registrar")));
  assert_eq!(decided.processed_at, Some(start() + Duration::minutes(25)));

  let closed = s.get_queue_item(item.id).await.unwrap().unwrap();
  assert_eq!(closed.item.status, QueueStatus::Completed);
  assert_eq!(closed.item.actual_wait_minutes, Some(25));
  assert_eq!(closed.enrollment_status, EnrollmentStatus::Approved);

  let err = s
    .decide_application(receipt.application_id, approve("registrar"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn deciding_a_missing_application() {
  let s = store().await;
  let err = s.decide_application(7, approve("registrar")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn application_listing_filters() {
  let s = store().await;
  let ada = s.submit_application(form("Ada", "medium")).await.unwrap();
  s.submit_application(ApplicationForm {
    grade_level: Some("grade11".into()),
    ..form("Grace", "low")
  })
  .await
  .unwrap();
  s.decide_application(ada.application_id, approve("registrar"))
    .await
    .unwrap();

  let all = s.list_applications(&ApplicationQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].applicant.details.first_name, "Grace");

  let approved = s
    .list_applications(&ApplicationQuery {
      status: Some(EnrollmentStatus::Approved),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(approved.len(), 1);
  assert_eq!(approved[0].application.id, ada.application_id);

  let juniors = s
    .list_applications(&ApplicationQuery {
      grade_level: Some(GradeLevel::Grade11),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(juniors.len(), 1);

  let search = s
    .list_applications(&ApplicationQuery {
      search: Some("gra".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(search.len(), 1);
  assert_eq!(search[0].applicant.details.first_name, "Grace");
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_use_fallback_without_history() {
  let s = store().await;
  s.submit_application(form("A", "medium")).await.unwrap();
  s.submit_application(form("B", "medium")).await.unwrap();

  let stats = s.queue_stats().await.unwrap();
  assert_eq!(stats.waiting_count, 2);
  assert_eq!(stats.avg_wait_minutes, 15.0);
  assert_eq!(stats.estimated_wait_by_priority.medium, 30.0);
  assert!(!stats.degraded);
}

#[tokio::test]
async fn stats_average_completed_waits() {
  let (s, clock) = store_with_clock().await;
  for name in ["A", "B", "C"] {
    s.submit_application(form(name, "high")).await.unwrap();
  }
  for _ in 0..3 {
    clock.advance(10);
    let item = s.claim_next(worker("alice")).await.unwrap();
    s.complete_item(item.id, worker("alice")).await.unwrap();
  }
  // Waits are 10, 20, and 30 minutes.

  s.submit_application(form("D", "medium")).await.unwrap();
  s.submit_application(form("E", "medium")).await.unwrap();
  s.submit_application(form("F", "low")).await.unwrap();
  s.claim_next(worker("bob")).await.unwrap();

  let stats = s.queue_stats().await.unwrap();
  assert_eq!(stats.avg_wait_minutes, 20.0);
  assert_eq!(stats.waiting_count, 2);
  assert_eq!(stats.processing_count, 1);
  assert_eq!(stats.by_priority.high, 0);
  assert_eq!(stats.by_priority.medium, 2);
  assert_eq!(stats.by_priority.low, 1);
  assert_eq!(stats.estimated_wait_by_priority.medium, 20.0);
  assert_eq!(stats.estimated_wait_by_priority.low, 20.0);

  let analytics = s.queue_analytics().await.unwrap();
  assert_eq!(analytics.by_priority.len(), 1);
  let high = &analytics.by_priority[0];
  assert_eq!(high.priority, Priority::High);
  assert_eq!(high.completed, 3);
  assert_eq!(high.avg_wait_minutes, 20.0);
  assert_eq!((high.min_wait_minutes, high.max_wait_minutes), (10, 30));
  assert_eq!(analytics.daily.len(), 1);
  assert_eq!(analytics.daily[0].created, 6);
  assert_eq!(analytics.daily[0].completed, 3);
}

#[tokio::test]
async fn dashboard_and_grade_levels() {
  let (s, clock) = store_with_clock().await;
  let old = s.submit_application(form("Old", "medium")).await.unwrap();
  clock.advance(60 * 24 * 10);
  s.submit_application(ApplicationForm {
    grade_level: Some("grade12".into()),
    ..form("New", "high")
  })
  .await
  .unwrap();
  s.decide_application(old.application_id, approve("registrar"))
    .await
    .unwrap();

  let dash = s.dashboard_stats().await.unwrap();
  assert_eq!(dash.total_applications, 2);
  assert_eq!(dash.by_status.approved, 1);
  assert_eq!(dash.by_status.pending, 1);
  assert_eq!(dash.recent_applications, 1);
  assert_eq!(dash.queue_by_status.waiting, 1);
  assert_eq!(dash.queue_by_status.completed, 1);

  let counts = s.enrollment_counts().await.unwrap();
  assert_eq!(counts, dash.by_status);

  let levels = s.grade_level_stats().await.unwrap();
  assert_eq!(levels.len(), 3);
  let college = levels.iter().find(|l| l.grade_level == GradeLevel::College).unwrap();
  assert_eq!((college.total, college.approved), (1, 1));
  let grade12 = levels.iter().find(|l| l.grade_level == GradeLevel::Grade12).unwrap();
  assert_eq!((grade12.total, grade12.pending), (1, 1));
}

#[tokio::test]
async fn enrollment_trends_bucket_the_last_twelve_months() {
  let (s, clock) = store_with_clock().await;
  s.submit_application(form("Old", "medium")).await.unwrap();

  // 2027-04-06, then 2027-04-07, then 2027-05-07.
  clock.advance(400 * 24 * 60);
  s.submit_application(form("A", "medium")).await.unwrap();
  clock.advance(24 * 60);
  let b = s.submit_application(form("B", "high")).await.unwrap();
  s.decide_application(b.application_id, approve("registrar"))
    .await
    .unwrap();
  clock.advance(30 * 24 * 60);
  s.submit_application(form("C", "low")).await.unwrap();

  let monthly = s.enrollment_trends(TrendPeriod::Monthly).await.unwrap();
  let periods: Vec<_> = monthly.iter().map(|t| t.period.as_str()).collect();
  assert_eq!(periods, ["2027-05", "2027-04"]);
  assert_eq!((monthly[0].count, monthly[0].pending), (1, 1));
  assert_eq!(
    (monthly[1].count, monthly[1].approved, monthly[1].pending, monthly[1].rejected),
    (2, 1, 1, 0)
  );

  let daily = s.enrollment_trends(TrendPeriod::Daily).await.unwrap();
  let periods: Vec<_> = daily.iter().map(|t| t.period.as_str()).collect();
  assert_eq!(periods, ["2027-05-07", "2027-04-07", "2027-04-06"]);

  let weekly = s.enrollment_trends(TrendPeriod::Weekly).await.unwrap();
  let counts: Vec<_> = weekly.iter().map(|t| t.count).collect();
  assert_eq!(counts, [1, 2]);
  assert!(weekly[0].period.starts_with("2027-W"));
}

// ─── Activity log ────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_reach_the_activity_log() {
  let s = store().await;
  s.submit_application(form("Ada", "medium")).await.unwrap();
  let item = s.claim_next(worker("alice")).await.unwrap();

  let mut entries = Vec::new();
  for _ in 0..50 {
    entries = s.recent_activity(10).await.unwrap();
    if entries.len() >= 2 {
      break;
    }
    tokio::time::sleep(StdDuration::from_millis(20)).await;
  }

  assert_eq!(entries.len(), 2);
  let claimed = entries
    .iter()
    .find(|e| e.action == ActivityAction::ItemClaimed)
    .expect("claim recorded");
  assert_eq!(claimed.actor, Some(worker("alice")));
  assert_eq!(claimed.target, format!("queue_item:{}", item.id));
  assert!(
    entries
      .iter()
      .any(|e| e.action == ActivityAction::ApplicationSubmitted && e.actor.is_none())
  );
}

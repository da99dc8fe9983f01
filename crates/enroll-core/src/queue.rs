//! Queue items, the schedulable unit of the admission line.
//!
//! A queue item is created `waiting` alongside its application and moves
//! through a small state machine:
//!
//! ```text
//! waiting --claim--> processing --complete--> completed
//!    ^                   |
//!    +-----release-------+
//! waiting | processing --cancel--> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Every transition is expressed as
//! a pure method on [`QueueItem`] that takes the current time explicitly and
//! returns the successor value; storage backends persist the result with a
//! conditional update keyed on the previous status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, application::{EnrollmentStatus, GradeLevel}};

// ─── Priority ────────────────────────────────────────────────────────────────

/// Coarse serving precedence, fixed when the item is created.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  High,
  #[default]
  Medium,
  Low,
}

/// Serving rank per tier; lower ranks are served first.
pub const PRIORITY_RANKS: [(Priority, u8); 3] =
  [(Priority::High, 1), (Priority::Medium, 2), (Priority::Low, 3)];

impl Priority {
  /// Look up this tier in [`PRIORITY_RANKS`].
  pub fn rank(self) -> u8 {
    PRIORITY_RANKS
      .iter()
      .find(|(p, _)| *p == self)
      .map(|(_, rank)| *rank)
      .unwrap_or(u8::MAX)
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueStatus {
  Waiting,
  Processing,
  Completed,
  Cancelled,
}

impl QueueStatus {
  pub const ALL: [QueueStatus; 4] = [
    QueueStatus::Waiting,
    QueueStatus::Processing,
    QueueStatus::Completed,
    QueueStatus::Cancelled,
  ];

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  /// Whether the state machine permits moving from `self` to `to`.
  pub fn can_transition_to(self, to: QueueStatus) -> bool {
    use QueueStatus::*;
    matches!(
      (self, to),
      (Waiting, Processing)
        | (Processing, Completed)
        | (Processing, Waiting)
        | (Waiting, Cancelled)
        | (Processing, Cancelled)
    )
  }
}

// ─── Worker identity ─────────────────────────────────────────────────────────

/// Opaque identity of a staff member acting on the queue. Supplied by the
/// caller's authentication layer; never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WorkerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── QueueItem ───────────────────────────────────────────────────────────────

/// One application's place in the service line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
  /// Store-assigned, monotonic in creation order.
  pub id:                  i64,
  pub application_id:      i64,
  /// Human-facing display number. Not the serving order.
  pub queue_number:        i64,
  pub priority:            Priority,
  pub status:              QueueStatus,
  /// Set only while `processing`.
  pub assigned_worker:     Option<WorkerId>,
  pub created_at:          DateTime<Utc>,
  pub started_at:          Option<DateTime<Utc>>,
  pub completed_at:        Option<DateTime<Utc>>,
  /// Computed once, when the item completes.
  pub actual_wait_minutes: Option<i64>,
  pub cancel_reason:       Option<String>,
}

/// Whole minutes between two instants, truncated toward zero.
pub fn wait_minutes(created_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> i64 {
  (completed_at - created_at).num_minutes()
}

impl QueueItem {
  fn check_transition(&self, to: QueueStatus, expected: QueueStatus) -> Result<()> {
    if self.status.can_transition_to(to) {
      return Ok(());
    }
    Err(Error::Conflict { id: self.id, expected, actual: self.status })
  }

  fn check_holder(&self, worker: &WorkerId) -> Result<()> {
    match &self.assigned_worker {
      Some(holder) if holder == worker => Ok(()),
      _ => Err(Error::Forbidden { id: self.id, worker: worker.clone() }),
    }
  }

  /// `waiting -> processing`, bound to `worker`.
  pub fn claim(&self, worker: &WorkerId, now: DateTime<Utc>) -> Result<Self> {
    self.check_transition(QueueStatus::Processing, QueueStatus::Waiting)?;
    Ok(Self {
      status: QueueStatus::Processing,
      assigned_worker: Some(worker.clone()),
      started_at: Some(now),
      ..self.clone()
    })
  }

  /// `processing -> completed`. Only the holder may complete an item.
  pub fn complete(&self, worker: &WorkerId, now: DateTime<Utc>) -> Result<Self> {
    if self.status.is_terminal() {
      return Err(Error::ItemNotActive { id: self.id, status: self.status });
    }
    self.check_transition(QueueStatus::Completed, QueueStatus::Processing)?;
    self.check_holder(worker)?;
    Ok(self.finish(now))
  }

  /// `processing -> waiting`: the holder hands the item back to the line.
  /// Its original `created_at` keeps its place in the serving order.
  pub fn release(&self, worker: &WorkerId) -> Result<Self> {
    if self.status.is_terminal() {
      return Err(Error::ItemNotActive { id: self.id, status: self.status });
    }
    self.check_transition(QueueStatus::Waiting, QueueStatus::Processing)?;
    self.check_holder(worker)?;
    Ok(Self {
      status: QueueStatus::Waiting,
      assigned_worker: None,
      started_at: None,
      ..self.clone()
    })
  }

  /// Any non-terminal state `-> cancelled`. Does not require the holder.
  pub fn cancel(&self, reason: Option<String>, now: DateTime<Utc>) -> Result<Self> {
    if !self.status.can_transition_to(QueueStatus::Cancelled) {
      return Err(Error::ItemNotActive { id: self.id, status: self.status });
    }
    Ok(Self {
      status: QueueStatus::Cancelled,
      assigned_worker: None,
      completed_at: Some(now),
      cancel_reason: reason,
      ..self.clone()
    })
  }

  /// Close the item because its application was decided. Returns `None` when
  /// the item is already terminal.
  pub fn close_for_decision(&self, now: DateTime<Utc>) -> Option<Self> {
    (!self.status.is_terminal()).then(|| self.finish(now))
  }

  fn finish(&self, now: DateTime<Utc>) -> Self {
    Self {
      status: QueueStatus::Completed,
      assigned_worker: None,
      completed_at: Some(now),
      actual_wait_minutes: Some(wait_minutes(self.created_at, now)),
      ..self.clone()
    }
  }
}

// ─── Enriched read model ─────────────────────────────────────────────────────

/// A queue item joined with the display fields of its application and
/// applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
  #[serde(flatten)]
  pub item:              QueueItem,
  pub student_number:    String,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  pub phone:             String,
  pub academic_year:     String,
  pub grade_level:       GradeLevel,
  pub enrollment_status: EnrollmentStatus,
}

/// Parameters for listing the queue.
///
/// Completed items are never listed. `status` and `priority` narrow the
/// remaining items further, so filtering on `completed` yields nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueFilter {
  pub status:   Option<QueueStatus>,
  pub priority: Option<Priority>,
}

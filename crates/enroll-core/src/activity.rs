//! The append-only activity log.
//!
//! One entry is recorded for every successful mutating operation. The log is
//! write-only from the admission core's perspective; writing it is best
//! effort and never fails the operation that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::queue::WorkerId;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
  ApplicationSubmitted,
  ApplicationDecided,
  ItemClaimed,
  ItemCompleted,
  ItemReleased,
  ItemCancelled,
}

/// An entry waiting to be written.
#[derive(Debug, Clone)]
pub struct NewActivity {
  /// `None` for applicant-initiated actions (submission).
  pub actor:       Option<WorkerId>,
  pub action:      ActivityAction,
  /// What the action touched, e.g. `queue_item:12` or `application:4`.
  pub target:      String,
  pub detail:      Option<String>,
  pub recorded_at: DateTime<Utc>,
}

/// A persisted entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub id:          i64,
  pub actor:       Option<WorkerId>,
  pub action:      ActivityAction,
  pub target:      String,
  pub detail:      Option<String>,
  pub recorded_at: DateTime<Utc>,
}

pub fn item_target(item_id: i64) -> String { format!("queue_item:{item_id}") }

pub fn application_target(application_id: i64) -> String {
  format!("application:{application_id}")
}

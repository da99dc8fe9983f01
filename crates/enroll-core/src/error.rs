//! Error types for `enroll-core`.

use serde::Serialize;
use thiserror::Error;

use crate::{
  application::EnrollmentStatus,
  queue::{QueueStatus, WorkerId},
};

/// Coarse classification shared by every error type in the workspace.
///
/// Transports map these onto their own status codes; the variants mirror the
/// failure categories a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Missing or malformed caller input.
  Validation,
  /// The referenced item or application does not exist (or is no longer
  /// eligible for the requested transition).
  NotFound,
  /// A state-machine precondition did not hold.
  Conflict,
  /// The caller does not hold the item it tried to act on.
  Forbidden,
  /// `claim_next` found no waiting item.
  EmptyQueue,
  /// The underlying store failed.
  Persistence,
}

/// Implemented by every error that can cross the store boundary.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("queue item not found: {0}")]
  ItemNotFound(i64),

  #[error("application not found: {0}")]
  ApplicationNotFound(i64),

  #[error("no waiting items in the queue")]
  QueueEmpty,

  #[error("queue item {id} is {actual}, expected {expected}")]
  Conflict {
    id:       i64,
    expected: QueueStatus,
    actual:   QueueStatus,
  },

  #[error("queue item {id} is not held by worker {worker}")]
  Forbidden { id: i64, worker: WorkerId },

  #[error("queue item {id} is already {status}")]
  ItemNotActive { id: i64, status: QueueStatus },

  #[error("application {id} is already {status}")]
  AlreadyDecided { id: i64, status: EnrollmentStatus },
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation { .. } => ErrorKind::Validation,
      Self::ItemNotFound(_)
      | Self::ApplicationNotFound(_)
      | Self::ItemNotActive { .. } => ErrorKind::NotFound,
      Self::QueueEmpty => ErrorKind::EmptyQueue,
      Self::Conflict { .. } | Self::AlreadyDecided { .. } => ErrorKind::Conflict,
      Self::Forbidden { .. } => ErrorKind::Forbidden,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

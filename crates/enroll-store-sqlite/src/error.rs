//! Error type for `enroll-store-sqlite`.

use enroll_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] enroll_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its enumeration.
  #[error("cannot decode {column}: {value:?}")]
  Decode {
    column: &'static str,
    value:  String,
  },
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Database(_)
      | Error::Sqlite(_)
      | Error::DateParse(_)
      | Error::Decode { .. } => ErrorKind::Persistence,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

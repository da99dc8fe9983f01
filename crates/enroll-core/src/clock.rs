//! Time source for store operations.
//!
//! Every timestamp a store writes comes from a [`Clock`], so tests can drive
//! wait-time arithmetic with a clock they advance by hand.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

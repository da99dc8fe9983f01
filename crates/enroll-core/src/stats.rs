//! Live statistics derived from queue and ledger state.
//!
//! A tier's wait estimate is its number of waiting items times the mean
//! historical wait. There is no service-rate model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  application::{EnrollmentStatus, GradeLevel},
  queue::{Priority, QueueStatus},
};

/// Average wait assumed when no item has completed yet.
pub const DEFAULT_WAIT_MINUTES: f64 = 15.0;

/// Window for the dashboard's "recent applications" count.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Window for the daily series in [`QueueAnalytics`].
pub const ANALYTICS_WINDOW_DAYS: i64 = 30;

/// Months of submissions covered by enrollment trends.
pub const TREND_WINDOW_MONTHS: u32 = 12;

// ─── Per-tier container ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ByPriority<T> {
  pub high:   T,
  pub medium: T,
  pub low:    T,
}

impl<T> ByPriority<T> {
  pub fn get(&self, p: Priority) -> &T {
    match p {
      Priority::High => &self.high,
      Priority::Medium => &self.medium,
      Priority::Low => &self.low,
    }
  }

  pub fn get_mut(&mut self, p: Priority) -> &mut T {
    match p {
      Priority::High => &mut self.high,
      Priority::Medium => &mut self.medium,
      Priority::Low => &mut self.low,
    }
  }

  pub fn map<U>(&self, mut f: impl FnMut(Priority, &T) -> U) -> ByPriority<U> {
    ByPriority {
      high:   f(Priority::High, &self.high),
      medium: f(Priority::Medium, &self.medium),
      low:    f(Priority::Low, &self.low),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

// ─── Queue stats ─────────────────────────────────────────────────────────────

/// One `(status, priority) -> count` row as aggregated by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPriorityCount {
  pub status:   QueueStatus,
  pub priority: Priority,
  pub count:    u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
  pub waiting_count:              u64,
  pub processing_count:           u64,
  /// Active backlog (`waiting` + `processing`) per tier.
  pub by_priority:                ByPriority<u64>,
  /// Estimated minutes until the waiting items of each tier are served.
  pub estimated_wait_by_priority: ByPriority<f64>,
  /// The average wait the estimates were computed from.
  pub avg_wait_minutes:           f64,
  /// `true` when the store could not be read and these are zeroed
  /// placeholders.
  #[serde(default)]
  pub degraded:                   bool,
}

impl QueueStats {
  /// Build stats from aggregated counts and the historical mean wait
  /// (`None` when nothing has completed yet, in which case `fallback` is
  /// used).
  pub fn compute(
    counts: &[StatusPriorityCount],
    history_avg: Option<f64>,
    fallback: f64,
  ) -> Self {
    let mut stats = QueueStats::default();
    let mut waiting = ByPriority::<u64>::default();

    for row in counts {
      match row.status {
        QueueStatus::Waiting => {
          stats.waiting_count += row.count;
          *waiting.get_mut(row.priority) += row.count;
        }
        QueueStatus::Processing => stats.processing_count += row.count,
        QueueStatus::Completed | QueueStatus::Cancelled => continue,
      }
      *stats.by_priority.get_mut(row.priority) += row.count;
    }

    let avg = history_avg.unwrap_or(fallback);
    stats.avg_wait_minutes = avg;
    stats.estimated_wait_by_priority = waiting.map(|_, n| *n as f64 * avg);
    stats
  }

  /// Zeroed stats flagged as degraded.
  pub fn degraded() -> Self { Self { degraded: true, ..Self::default() } }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCounts {
  pub pending:  u64,
  pub approved: u64,
  pub rejected: u64,
}

impl EnrollmentCounts {
  pub fn add(&mut self, status: EnrollmentStatus, n: u64) {
    match status {
      EnrollmentStatus::Pending => self.pending += n,
      EnrollmentStatus::Approved => self.approved += n,
      EnrollmentStatus::Rejected => self.rejected += n,
    }
  }

  pub fn total(&self) -> u64 { self.pending + self.approved + self.rejected }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatusCounts {
  pub waiting:    u64,
  pub processing: u64,
  pub completed:  u64,
  pub cancelled:  u64,
}

impl QueueStatusCounts {
  pub fn add(&mut self, status: QueueStatus, n: u64) {
    match status {
      QueueStatus::Waiting => self.waiting += n,
      QueueStatus::Processing => self.processing += n,
      QueueStatus::Completed => self.completed += n,
      QueueStatus::Cancelled => self.cancelled += n,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub total_applications:  u64,
  pub by_status:           EnrollmentCounts,
  pub queue_by_status:     QueueStatusCounts,
  /// Applications submitted within the last [`RECENT_WINDOW_DAYS`] days.
  pub recent_applications: u64,
  /// Mean `actual_wait_minutes` over completed items, rounded to two places;
  /// zero when there is no history.
  pub avg_wait_minutes:    f64,
}

// ─── Analytics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWaitStats {
  pub priority:         Priority,
  pub completed:        u64,
  pub avg_wait_minutes: f64,
  pub min_wait_minutes: i64,
  pub max_wait_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQueueVolume {
  pub date:             NaiveDate,
  /// Items created on this day.
  pub created:          u64,
  /// Items completed on this day.
  pub completed:        u64,
  /// Mean wait of the items completed on this day.
  pub avg_wait_minutes: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueAnalytics {
  pub by_priority: Vec<PriorityWaitStats>,
  /// Newest day first; days with no activity are omitted.
  pub daily:       Vec<DailyQueueVolume>,
}

impl QueueAnalytics {
  /// Merge the per-day created and completed series into one, newest first.
  pub fn merge_daily(
    created: &[(NaiveDate, u64)],
    completed: &[(NaiveDate, u64, Option<f64>)],
  ) -> Vec<DailyQueueVolume> {
    let mut days: std::collections::BTreeMap<NaiveDate, DailyQueueVolume> =
      std::collections::BTreeMap::new();

    let blank = |date| DailyQueueVolume {
      date,
      created: 0,
      completed: 0,
      avg_wait_minutes: None,
    };

    for &(date, n) in created {
      days.entry(date).or_insert_with(|| blank(date)).created = n;
    }
    for &(date, n, avg) in completed {
      let day = days.entry(date).or_insert_with(|| blank(date));
      day.completed = n;
      day.avg_wait_minutes = avg.map(round2);
    }

    days.into_values().rev().collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeLevelStats {
  pub grade_level: GradeLevel,
  pub total:       u64,
  pub approved:    u64,
  pub rejected:    u64,
  pub pending:     u64,
}

// ─── Enrollment trends ───────────────────────────────────────────────────────

/// Bucket width for enrollment trends.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendPeriod {
  Daily,
  Weekly,
  #[default]
  Monthly,
}

/// Applications submitted within one period, by decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentTrend {
  /// `YYYY-MM-DD`, `YYYY-Www` (Monday-based week) or `YYYY-MM`.
  pub period:   String,
  pub count:    u64,
  pub approved: u64,
  pub rejected: u64,
  pub pending:  u64,
}

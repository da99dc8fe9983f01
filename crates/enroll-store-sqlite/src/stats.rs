//! Aggregate queries backing the statistics endpoints.
//!
//! The SQL only groups and counts; shaping the results into the reporting
//! types is left to `enroll_core::stats`.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use rusqlite::Connection;

use enroll_core::{
  application::{EnrollmentStatus, GradeLevel},
  queue::{Priority, QueueStatus},
  stats::{
    ANALYTICS_WINDOW_DAYS, DashboardStats, EnrollmentCounts, EnrollmentTrend,
    GradeLevelStats, PriorityWaitStats, QueueAnalytics, QueueStats, QueueStatusCounts,
    RECENT_WINDOW_DAYS, StatusPriorityCount, TREND_WINDOW_MONTHS, TrendPeriod, round2,
  },
};

use crate::{
  Result,
  encode::{decode_date, decode_enum, encode_dt},
};

/// Run `sql` and collect every row through `f`.
fn collect<T>(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
  f: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, f)?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Mean wait over completed items, or `None` with no history.
fn history_average(conn: &Connection) -> Result<Option<f64>> {
  Ok(conn.query_row(
    "SELECT AVG(actual_wait_minutes) FROM queue_items
      WHERE status = 'completed' AND actual_wait_minutes IS NOT NULL",
    [],
    |r| r.get(0),
  )?)
}

pub fn queue_stats(conn: &Connection, fallback: f64) -> Result<QueueStats> {
  let rows = collect(
    conn,
    "SELECT status, priority, COUNT(*) FROM queue_items GROUP BY status, priority",
    [],
    |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?)),
  )?;

  let counts = rows
    .into_iter()
    .map(|(status, priority, count)| {
      Ok(StatusPriorityCount {
        status:   decode_enum("status", &status)?,
        priority: decode_enum("priority", &priority)?,
        count:    count as u64,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  let average = history_average(conn)?.map(round2);
  Ok(QueueStats::compute(&counts, average, fallback))
}

pub fn enrollment_counts(conn: &Connection) -> Result<EnrollmentCounts> {
  let rows = collect(
    conn,
    "SELECT status, COUNT(*) FROM applications GROUP BY status",
    [],
    |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
  )?;

  let mut counts = EnrollmentCounts::default();
  for (status, n) in rows {
    let status: EnrollmentStatus = decode_enum("status", &status)?;
    counts.add(status, n as u64);
  }
  Ok(counts)
}

pub fn dashboard(conn: &Connection, now: DateTime<Utc>) -> Result<DashboardStats> {
  let by_status = enrollment_counts(conn)?;

  let mut queue_by_status = QueueStatusCounts::default();
  let rows = collect(
    conn,
    "SELECT status, COUNT(*) FROM queue_items GROUP BY status",
    [],
    |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
  )?;
  for (status, n) in rows {
    let status: QueueStatus = decode_enum("status", &status)?;
    queue_by_status.add(status, n as u64);
  }

  let since = encode_dt(now - Duration::days(RECENT_WINDOW_DAYS));
  let recent: i64 = conn.query_row(
    "SELECT COUNT(*) FROM applications WHERE submitted_at >= ?1",
    rusqlite::params![since],
    |r| r.get(0),
  )?;

  Ok(DashboardStats {
    total_applications: by_status.total(),
    by_status,
    queue_by_status,
    recent_applications: recent as u64,
    avg_wait_minutes: history_average(conn)?.map(round2).unwrap_or(0.0),
  })
}

pub fn queue_analytics(conn: &Connection, now: DateTime<Utc>) -> Result<QueueAnalytics> {
  let rows = collect(
    conn,
    "SELECT priority, COUNT(*), AVG(actual_wait_minutes),
            MIN(actual_wait_minutes), MAX(actual_wait_minutes)
       FROM queue_items
      WHERE status = 'completed' AND actual_wait_minutes IS NOT NULL
      GROUP BY priority",
    [],
    |r| {
      Ok((
        r.get::<_, String>(0)?,
        r.get::<_, i64>(1)?,
        r.get::<_, f64>(2)?,
        r.get::<_, i64>(3)?,
        r.get::<_, i64>(4)?,
      ))
    },
  )?;

  let mut by_priority = rows
    .into_iter()
    .map(|(priority, completed, avg, min, max)| {
      Ok(PriorityWaitStats {
        priority:         decode_enum::<Priority>("priority", &priority)?,
        completed:        completed as u64,
        avg_wait_minutes: round2(avg),
        min_wait_minutes: min,
        max_wait_minutes: max,
      })
    })
    .collect::<Result<Vec<_>>>()?;
  by_priority.sort_by_key(|s| s.priority.rank());

  let since = encode_dt(now - Duration::days(ANALYTICS_WINDOW_DAYS));
  let created = collect(
    conn,
    "SELECT substr(created_at, 1, 10), COUNT(*) FROM queue_items
      WHERE created_at >= ?1
      GROUP BY 1",
    rusqlite::params![since],
    |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
  )?
  .into_iter()
  .map(|(day, n)| Ok((decode_date(&day)?, n as u64)))
  .collect::<Result<Vec<(NaiveDate, u64)>>>()?;

  let completed = collect(
    conn,
    "SELECT substr(completed_at, 1, 10), COUNT(*), AVG(actual_wait_minutes)
       FROM queue_items
      WHERE status = 'completed' AND completed_at >= ?1
      GROUP BY 1",
    rusqlite::params![since],
    |r| {
      Ok((
        r.get::<_, String>(0)?,
        r.get::<_, i64>(1)?,
        r.get::<_, Option<f64>>(2)?,
      ))
    },
  )?
  .into_iter()
  .map(|(day, n, avg)| Ok((decode_date(&day)?, n as u64, avg)))
  .collect::<Result<Vec<(NaiveDate, u64, Option<f64>)>>>()?;

  Ok(QueueAnalytics {
    by_priority,
    daily: QueueAnalytics::merge_daily(&created, &completed),
  })
}

pub fn grade_levels(conn: &Connection) -> Result<Vec<GradeLevelStats>> {
  let rows = collect(
    conn,
    "SELECT grade_level, status, COUNT(*) FROM applications
      GROUP BY grade_level, status",
    [],
    |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?)),
  )?;

  let mut stats: Vec<GradeLevelStats> = GradeLevel::ALL
    .into_iter()
    .map(|grade_level| GradeLevelStats {
      grade_level,
      total: 0,
      approved: 0,
      rejected: 0,
      pending: 0,
    })
    .collect();

  for (level, status, n) in rows {
    let level: GradeLevel = decode_enum("grade_level", &level)?;
    let status: EnrollmentStatus = decode_enum("status", &status)?;
    let Some(entry) = stats.iter_mut().find(|s| s.grade_level == level) else {
      continue;
    };
    let n = n as u64;
    entry.total += n;
    match status {
      EnrollmentStatus::Pending => entry.pending += n,
      EnrollmentStatus::Approved => entry.approved += n,
      EnrollmentStatus::Rejected => entry.rejected += n,
    }
  }
  Ok(stats)
}

pub fn enrollment_trends(
  conn: &Connection,
  period: TrendPeriod,
  now: DateTime<Utc>,
) -> Result<Vec<EnrollmentTrend>> {
  let bucket = match period {
    TrendPeriod::Daily => "substr(submitted_at, 1, 10)",
    TrendPeriod::Weekly => "strftime('%Y-W%W', substr(submitted_at, 1, 10))",
    TrendPeriod::Monthly => "substr(submitted_at, 1, 7)",
  };
  let since = now
    .checked_sub_months(Months::new(TREND_WINDOW_MONTHS))
    .unwrap_or(DateTime::<Utc>::MIN_UTC);

  collect(
    conn,
    &format!(
      "SELECT {bucket}, COUNT(*),
              SUM(status = 'approved'), SUM(status = 'rejected'), SUM(status = 'pending')
         FROM applications
        WHERE submitted_at >= ?1
        GROUP BY 1
        ORDER BY 1 DESC"
    ),
    rusqlite::params![encode_dt(since)],
    |r| {
      Ok(EnrollmentTrend {
        period:   r.get(0)?,
        count:    r.get::<_, i64>(1)? as u64,
        approved: r.get::<_, i64>(2)? as u64,
        rejected: r.get::<_, i64>(3)? as u64,
        pending:  r.get::<_, i64>(4)? as u64,
      })
    },
  )
}

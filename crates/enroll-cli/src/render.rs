//! Plain-text rendering of API responses.

use enroll_core::{
  activity::ActivityEntry,
  application::ApplicationSummary,
  queue::{QueueEntry, QueueItem},
  stats::{DashboardStats, EnrollmentTrend, GradeLevelStats, QueueAnalytics, QueueStats},
};

pub fn queue_entry(e: &QueueEntry) -> String {
  let worker = e
    .item
    .assigned_worker
    .as_ref()
    .map(|w| format!(" [{w}]"))
    .unwrap_or_default();
  format!(
    "#{:<5} {:<6} {:<10} {:<10} {} {} ({}){worker}",
    e.item.queue_number,
    e.item.priority,
    e.item.status,
    e.student_number,
    e.first_name,
    e.last_name,
    e.item.created_at.format("%Y-%m-%d %H:%M"),
  )
}

pub fn queue_item(item: &QueueItem) -> String {
  let mut line = format!(
    "item {} (#{}) is {}",
    item.id, item.queue_number, item.status
  );
  if let Some(w) = &item.assigned_worker {
    line.push_str(&format!(", held by {w}"));
  }
  if let Some(m) = item.actual_wait_minutes {
    line.push_str(&format!(", waited {m} min"));
  }
  if let Some(r) = &item.cancel_reason {
    line.push_str(&format!(", reason: {r}"));
  }
  line
}

pub fn application(s: &ApplicationSummary) -> String {
  let queue = match (s.queue_number, s.queue_status) {
    (Some(n), Some(st)) => format!("#{n} {st}"),
    _ => "-".to_string(),
  };
  format!(
    "{:<5} {:<10} {:<24} {:<8} {:<8} {:<6} {queue}",
    s.application.id,
    s.applicant.student_number,
    s.applicant.full_name(),
    s.application.grade_level,
    s.application.status,
    s.application.priority,
  )
}

pub fn queue_stats(s: &QueueStats) -> String {
  let mut out = String::new();
  if s.degraded {
    out.push_str("(statistics unavailable, showing placeholders)\n");
  }
  out.push_str(&format!(
    "waiting {}  processing {}  avg wait {:.1} min\n",
    s.waiting_count, s.processing_count, s.avg_wait_minutes
  ));
  for (name, count, est) in [
    ("high", s.by_priority.high, s.estimated_wait_by_priority.high),
    ("medium", s.by_priority.medium, s.estimated_wait_by_priority.medium),
    ("low", s.by_priority.low, s.estimated_wait_by_priority.low),
  ] {
    out.push_str(&format!("  {name:<6} {count:>4} active  ~{est:.0} min\n"));
  }
  out
}

pub fn dashboard(d: &DashboardStats) -> String {
  format!(
    "applications {} (pending {}, approved {}, rejected {}), {} in the last week\n\
     queue: waiting {}, processing {}, completed {}, cancelled {}\n\
     average wait {:.2} min\n",
    d.total_applications,
    d.by_status.pending,
    d.by_status.approved,
    d.by_status.rejected,
    d.recent_applications,
    d.queue_by_status.waiting,
    d.queue_by_status.processing,
    d.queue_by_status.completed,
    d.queue_by_status.cancelled,
    d.avg_wait_minutes,
  )
}

pub fn analytics(a: &QueueAnalytics) -> String {
  let mut out = String::from("priority  done   avg    min  max\n");
  for p in &a.by_priority {
    out.push_str(&format!(
      "{:<8} {:>5} {:>6.2} {:>4} {:>4}\n",
      p.priority, p.completed, p.avg_wait_minutes, p.min_wait_minutes, p.max_wait_minutes
    ));
  }
  out.push_str("\ndate        created  completed  avg\n");
  for d in &a.daily {
    let avg = d.avg_wait_minutes.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into());
    out.push_str(&format!("{}  {:>7}  {:>9}  {avg}\n", d.date, d.created, d.completed));
  }
  out
}

pub fn grade_level(g: &GradeLevelStats) -> String {
  format!(
    "{:<8} total {:>4}  approved {:>4}  rejected {:>4}  pending {:>4}",
    g.grade_level, g.total, g.approved, g.rejected, g.pending
  )
}

pub fn trend(t: &EnrollmentTrend) -> String {
  format!(
    "{:<10} total {:>4}  approved {:>4}  rejected {:>4}  pending {:>4}",
    t.period, t.count, t.approved, t.rejected, t.pending
  )
}

pub fn activity(e: &ActivityEntry) -> String {
  let actor = e.actor.as_ref().map(|w| w.as_str()).unwrap_or("applicant");
  let detail = e.detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default();
  format!(
    "{} {:<10} {:<22} {}{detail}",
    e.recorded_at.format("%Y-%m-%d %H:%M:%S"),
    actor,
    e.action,
    e.target,
  )
}

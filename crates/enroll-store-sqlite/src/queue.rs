//! Queue reads and state transitions.
//!
//! Transitions load the current row, apply the pure transition from
//! `enroll_core::queue`, and persist the result with an update conditioned on
//! the status that was read. A second writer that got there first leaves the
//! update matching zero rows, which surfaces as a conflict.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};

use enroll_core::{
  Error as CoreError,
  queue::{QueueEntry, QueueFilter, QueueItem, QueueStatus, WorkerId},
  scheduler::{next_to_serve, sort_for_service},
};

use crate::{
  Result,
  encode::{ENTRY_FROM, ITEM_COLUMNS, RawQueueEntry, RawQueueItem, encode_dt, entry_columns},
};

// ─── Reads ───────────────────────────────────────────────────────────────────

fn load_item(conn: &Connection, id: i64) -> Result<QueueItem> {
  conn
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM queue_items q WHERE q.item_id = ?1"),
      rusqlite::params![id],
      |r| RawQueueItem::from_row(r, 0),
    )
    .optional()?
    .ok_or(CoreError::ItemNotFound(id))?
    .into_item()
}

fn query_entries(
  conn: &Connection,
  where_sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<QueueEntry>> {
  let sql = format!("SELECT {} {ENTRY_FROM} {where_sql}", entry_columns());
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params, RawQueueEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawQueueEntry::into_entry).collect()
}

/// Entries matching `filter`, in serving order.
pub fn list(conn: &Connection, filter: &QueueFilter) -> Result<Vec<QueueEntry>> {
  let mut clauses = vec!["q.status != ?"];
  let mut params = vec![QueueStatus::Completed.to_string()];

  if let Some(status) = filter.status {
    clauses.push("q.status = ?");
    params.push(status.to_string());
  }
  if let Some(priority) = filter.priority {
    clauses.push("q.priority = ?");
    params.push(priority.to_string());
  }

  let where_sql = format!("WHERE {}", clauses.join(" AND "));
  let mut entries =
    query_entries(conn, &where_sql, rusqlite::params_from_iter(params.iter()))?;
  sort_for_service(&mut entries);
  Ok(entries)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<QueueEntry>> {
  Ok(
    query_entries(conn, "WHERE q.item_id = ?1", rusqlite::params![id])?
      .into_iter()
      .next(),
  )
}

fn waiting_items(conn: &Connection) -> Result<Vec<QueueItem>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ITEM_COLUMNS} FROM queue_items q WHERE q.status = 'waiting'"
  ))?;
  let raws = stmt
    .query_map([], |r| RawQueueItem::from_row(r, 0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawQueueItem::into_item).collect()
}

/// The head of the serving order, without claiming it.
pub fn peek(conn: &Connection) -> Result<Option<QueueEntry>> {
  let waiting = waiting_items(conn)?;
  match next_to_serve(&waiting) {
    Some(head) => get(conn, head.id),
    None => Ok(None),
  }
}

/// Items currently held by `worker`, oldest claim first.
pub fn held_by(conn: &Connection, worker: &WorkerId) -> Result<Vec<QueueEntry>> {
  query_entries(
    conn,
    "WHERE q.status = 'processing' AND q.assigned_worker = ?1
     ORDER BY q.started_at ASC, q.item_id ASC",
    rusqlite::params![worker.as_str()],
  )
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Persist `next` over `prev`, conditioned on the row still being in
/// `prev.status`.
pub(crate) fn write_transition(
  conn: &Connection,
  prev: &QueueItem,
  next: &QueueItem,
) -> Result<()> {
  let changed = conn.execute(
    "UPDATE queue_items
        SET status = ?3, assigned_worker = ?4, started_at = ?5,
            completed_at = ?6, actual_wait_minutes = ?7, cancel_reason = ?8
      WHERE item_id = ?1 AND status = ?2",
    rusqlite::params![
      prev.id,
      prev.status.as_ref(),
      next.status.as_ref(),
      next.assigned_worker.as_ref().map(|w| w.as_str()),
      next.started_at.map(encode_dt),
      next.completed_at.map(encode_dt),
      next.actual_wait_minutes,
      next.cancel_reason,
    ],
  )?;

  if changed == 0 {
    let actual = load_item(conn, prev.id)?.status;
    return Err(
      CoreError::Conflict { id: prev.id, expected: prev.status, actual }.into(),
    );
  }
  Ok(())
}

/// Load item `id`, apply `step`, and persist the result in one immediate
/// transaction.
fn transition(
  conn: &mut Connection,
  id: i64,
  step: impl FnOnce(&QueueItem) -> enroll_core::Result<QueueItem>,
) -> Result<QueueItem> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let current = load_item(&tx, id)?;
  let next = step(&current)?;
  write_transition(&tx, &current, &next)?;
  tx.commit()?;
  Ok(next)
}

/// Claim the head of the serving order for `worker`.
pub fn claim_next(
  conn: &mut Connection,
  worker: &WorkerId,
  now: DateTime<Utc>,
) -> Result<QueueItem> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let waiting = waiting_items(&tx)?;
  let head = next_to_serve(&waiting).ok_or(CoreError::QueueEmpty)?;
  let next = head.claim(worker, now)?;
  write_transition(&tx, head, &next)?;
  tx.commit()?;
  Ok(next)
}

pub fn claim_specific(
  conn: &mut Connection,
  id: i64,
  worker: &WorkerId,
  now: DateTime<Utc>,
) -> Result<QueueItem> {
  transition(conn, id, |item| item.claim(worker, now))
}

pub fn complete(
  conn: &mut Connection,
  id: i64,
  worker: &WorkerId,
  now: DateTime<Utc>,
) -> Result<QueueItem> {
  transition(conn, id, |item| item.complete(worker, now))
}

pub fn release(conn: &mut Connection, id: i64, worker: &WorkerId) -> Result<QueueItem> {
  transition(conn, id, |item| item.release(worker))
}

pub fn cancel(
  conn: &mut Connection,
  id: i64,
  reason: Option<String>,
  now: DateTime<Utc>,
) -> Result<QueueItem> {
  transition(conn, id, |item| item.cancel(reason, now))
}

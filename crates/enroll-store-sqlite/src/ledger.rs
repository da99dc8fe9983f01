//! The entry ledger: applicants, applications, and decisions.
//!
//! Every function here runs on the connection thread inside
//! [`tokio_rusqlite::Connection::call`] and owns its transaction.

use chrono::{DateTime, Datelike as _, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};

use enroll_core::{
  Error as CoreError,
  applicant::{student_number, student_number_prefix},
  application::{
    ApplicationQuery, ApplicationSummary, DecisionInput, EnrollmentApplication,
    NewApplication, SubmissionReceipt,
  },
  queue::QueueItem,
};

use crate::{
  Result,
  encode::{
    APPLICATION_COLUMNS, ITEM_COLUMNS, RawApplication, RawQueueItem, RawSummary,
    SUMMARY_FROM, encode_date, encode_dt, summary_columns,
  },
  queue::write_transition,
};

// ─── Counters ────────────────────────────────────────────────────────────────

/// Bump the counter `name` and return its new value. A missing counter is
/// created from `seed_sql`, a scalar subquery evaluated in the same statement.
fn next_counter(conn: &Connection, name: &str, seed_sql: &str) -> Result<i64> {
  let sql = format!(
    "INSERT INTO counters (name, value) VALUES (?1, ({seed_sql}))
     ON CONFLICT(name) DO UPDATE SET value = value + 1
     RETURNING value"
  );
  Ok(conn.query_row(&sql, rusqlite::params![name], |r| r.get(0))?)
}

fn next_queue_number(conn: &Connection) -> Result<i64> {
  next_counter(
    conn,
    "queue_number",
    "SELECT COALESCE(MAX(queue_number), 0) + 1 FROM queue_items",
  )
}

fn next_student_sequence(conn: &Connection, year: i32) -> Result<i64> {
  let prefix = student_number_prefix(year);
  // The prefix is all digits, so inlining it into the seed query is safe.
  let seed = format!(
    "SELECT COUNT(*) + 1 FROM students WHERE student_number LIKE '{prefix}%'"
  );
  next_counter(conn, &format!("student_number:{year}"), &seed)
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Write applicant, application, and queue item in one transaction.
///
/// Returns the receipt and the new queue item's id.
pub fn submit(
  conn: &mut Connection,
  new: NewApplication,
  now: DateTime<Utc>,
) -> Result<(SubmissionReceipt, i64)> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let now_str = encode_dt(now);

  let sequence = next_student_sequence(&tx, now.year())?;
  let number = student_number(now.year(), sequence);
  let d = &new.applicant;

  tx.execute(
    "INSERT INTO students (
       student_number, first_name, last_name, middle_name, email, phone,
       date_of_birth, gender, address, city, state, zip_code,
       emergency_contact_name, emergency_contact_phone,
       emergency_contact_relationship, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    rusqlite::params![
      number,
      d.first_name,
      d.last_name,
      d.middle_name,
      d.email,
      d.phone,
      d.date_of_birth.map(encode_date),
      d.gender.as_ref(),
      d.address,
      d.city,
      d.state,
      d.zip_code,
      d.emergency_contact_name,
      d.emergency_contact_phone,
      d.emergency_contact_relationship,
      now_str,
    ],
  )?;
  let student_id = tx.last_insert_rowid();

  tx.execute(
    "INSERT INTO applications (
       student_id, academic_year, grade_level, previous_school,
       previous_grade, priority, status, submitted_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
    rusqlite::params![
      student_id,
      new.academic_year,
      new.grade_level.as_ref(),
      new.previous_school,
      new.previous_grade,
      new.priority.as_ref(),
      now_str,
    ],
  )?;
  let application_id = tx.last_insert_rowid();

  let queue_number = next_queue_number(&tx)?;
  tx.execute(
    "INSERT INTO queue_items (
       application_id, queue_number, priority, status, created_at
     ) VALUES (?1, ?2, ?3, 'waiting', ?4)",
    rusqlite::params![application_id, queue_number, new.priority.as_ref(), now_str],
  )?;
  let item_id = tx.last_insert_rowid();

  tx.commit()?;

  let receipt = SubmissionReceipt { student_number: number, application_id, queue_number };
  Ok((receipt, item_id))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn get_application(conn: &Connection, id: i64) -> Result<Option<ApplicationSummary>> {
  let sql = format!(
    "SELECT {} {SUMMARY_FROM} WHERE a.application_id = ?1",
    summary_columns()
  );
  conn
    .query_row(&sql, rusqlite::params![id], RawSummary::from_row)
    .optional()?
    .map(RawSummary::into_summary)
    .transpose()
}

pub fn list_applications(
  conn: &Connection,
  query: &ApplicationQuery,
) -> Result<Vec<ApplicationSummary>> {
  let mut clauses: Vec<&str> = Vec::new();
  let mut params: Vec<String> = Vec::new();

  if let Some(status) = query.status {
    params.push(status.to_string());
    clauses.push("a.status = ?");
  }
  if let Some(level) = query.grade_level {
    params.push(level.to_string());
    clauses.push("a.grade_level = ?");
  }
  if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
    let pattern = format!("%{search}%");
    params.extend([pattern.clone(), pattern.clone(), pattern]);
    clauses.push(
      "(s.first_name LIKE ? OR s.last_name LIKE ? OR s.student_number LIKE ?)",
    );
  }
  if let Some(from) = query.submitted_from {
    params.push(encode_dt(from));
    clauses.push("a.submitted_at >= ?");
  }
  if let Some(until) = query.submitted_until {
    params.push(encode_dt(until));
    clauses.push("a.submitted_at < ?");
  }

  let where_sql = if clauses.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", clauses.join(" AND "))
  };
  let sql = format!(
    "SELECT {} {SUMMARY_FROM} {where_sql}
     ORDER BY a.submitted_at DESC, a.application_id DESC",
    summary_columns()
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params_from_iter(params.iter()), RawSummary::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSummary::into_summary).collect()
}

// ─── Decisions ───────────────────────────────────────────────────────────────

/// Record a decision and close the application's queue item if it is still
/// active. Returns the decided application and the closed item, if any.
pub fn decide(
  conn: &mut Connection,
  id: i64,
  input: &DecisionInput,
  now: DateTime<Utc>,
) -> Result<(EnrollmentApplication, Option<QueueItem>)> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let current = tx
    .query_row(
      &format!("SELECT {APPLICATION_COLUMNS} FROM applications a WHERE a.application_id = ?1"),
      rusqlite::params![id],
      |r| RawApplication::from_row(r, 0),
    )
    .optional()?
    .ok_or(CoreError::ApplicationNotFound(id))?
    .into_application()?;

  let decided = current.decide(input, now)?;
  tx.execute(
    "UPDATE applications
        SET status = ?2, processed_at = ?3, processed_by = ?4, notes = ?5
      WHERE application_id = ?1 AND status = 'pending'",
    rusqlite::params![
      id,
      decided.status.as_ref(),
      decided.processed_at.map(encode_dt),
      decided.processed_by.as_ref().map(|w| w.as_str()),
      decided.notes,
    ],
  )?;

  let item = tx
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM queue_items q WHERE q.application_id = ?1"),
      rusqlite::params![id],
      |r| RawQueueItem::from_row(r, 0),
    )
    .optional()?
    .map(RawQueueItem::into_item)
    .transpose()?;

  let closed = match item {
    Some(item) => match item.close_for_decision(now) {
      Some(next) => {
        write_transition(&tx, &item, &next)?;
        Some(next)
      }
      None => None,
    },
    None => None,
  };

  tx.commit()?;
  Ok((decided, closed))
}

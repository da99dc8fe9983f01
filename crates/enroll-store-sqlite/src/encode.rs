//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! width (`2026-03-02T09:00:00.000000Z`) so that string comparison in SQL
//! agrees with chronological order. Enumerations are stored as their
//! lowercase names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use enroll_core::{
  activity::ActivityEntry,
  applicant::{Applicant, ApplicantDetails},
  application::{ApplicationSummary, EnrollmentApplication},
  queue::{QueueEntry, QueueItem, WorkerId},
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_dt_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode any strum-backed enumeration column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

fn worker(s: Option<String>) -> Option<WorkerId> { s.map(WorkerId) }

// ─── Column lists ────────────────────────────────────────────────────────────
//
// Each raw row type reads its columns starting at a caller-supplied offset so
// the lists below can be concatenated into joined selects.

pub const ITEM_COLUMNS: &str = "q.item_id, q.application_id, q.queue_number, \
   q.priority, q.status, q.assigned_worker, q.created_at, q.started_at, \
   q.completed_at, q.actual_wait_minutes, q.cancel_reason";
const ITEM_WIDTH: usize = 11;

/// Display fields that enrich a queue item.
pub const ENTRY_EXTRA_COLUMNS: &str = "s.student_number, s.first_name, \
   s.last_name, s.email, s.phone, a.academic_year, a.grade_level, a.status";

pub const ENTRY_FROM: &str = "FROM queue_items q
   JOIN applications a ON a.application_id = q.application_id
   JOIN students     s ON s.student_id     = a.student_id";

pub const APPLICATION_COLUMNS: &str = "a.application_id, a.student_id, \
   a.academic_year, a.grade_level, a.previous_school, a.previous_grade, \
   a.priority, a.status, a.submitted_at, a.processed_at, a.processed_by, a.notes";
const APPLICATION_WIDTH: usize = 12;

pub const APPLICANT_COLUMNS: &str = "s.student_id, s.student_number, \
   s.first_name, s.last_name, s.middle_name, s.email, s.phone, \
   s.date_of_birth, s.gender, s.address, s.city, s.state, s.zip_code, \
   s.emergency_contact_name, s.emergency_contact_phone, \
   s.emergency_contact_relationship, s.created_at";
const APPLICANT_WIDTH: usize = 17;

pub const SUMMARY_FROM: &str = "FROM applications a
   JOIN students         s ON s.student_id     = a.student_id
   LEFT JOIN queue_items q ON q.application_id = a.application_id";

pub fn summary_columns() -> String {
  format!("{APPLICATION_COLUMNS}, {APPLICANT_COLUMNS}, q.queue_number, q.status")
}

pub fn entry_columns() -> String { format!("{ITEM_COLUMNS}, {ENTRY_EXTRA_COLUMNS}") }

// ─── Queue items ─────────────────────────────────────────────────────────────

/// Raw values read directly from a `queue_items` row.
pub struct RawQueueItem {
  pub item_id:             i64,
  pub application_id:      i64,
  pub queue_number:        i64,
  pub priority:            String,
  pub status:              String,
  pub assigned_worker:     Option<String>,
  pub created_at:          String,
  pub started_at:          Option<String>,
  pub completed_at:        Option<String>,
  pub actual_wait_minutes: Option<i64>,
  pub cancel_reason:       Option<String>,
}

impl RawQueueItem {
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:             row.get(at)?,
      application_id:      row.get(at + 1)?,
      queue_number:        row.get(at + 2)?,
      priority:            row.get(at + 3)?,
      status:              row.get(at + 4)?,
      assigned_worker:     row.get(at + 5)?,
      created_at:          row.get(at + 6)?,
      started_at:          row.get(at + 7)?,
      completed_at:        row.get(at + 8)?,
      actual_wait_minutes: row.get(at + 9)?,
      cancel_reason:       row.get(at + 10)?,
    })
  }

  pub fn into_item(self) -> Result<QueueItem> {
    Ok(QueueItem {
      id:                  self.item_id,
      application_id:      self.application_id,
      queue_number:        self.queue_number,
      priority:            decode_enum("priority", &self.priority)?,
      status:              decode_enum("status", &self.status)?,
      assigned_worker:     worker(self.assigned_worker),
      created_at:          decode_dt(&self.created_at)?,
      started_at:          decode_dt_opt(self.started_at)?,
      completed_at:        decode_dt_opt(self.completed_at)?,
      actual_wait_minutes: self.actual_wait_minutes,
      cancel_reason:       self.cancel_reason,
    })
  }
}

/// A queue item row joined with its display fields.
pub struct RawQueueEntry {
  pub item:              RawQueueItem,
  pub student_number:    String,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  pub phone:             String,
  pub academic_year:     String,
  pub grade_level:       String,
  pub enrollment_status: String,
}

impl RawQueueEntry {
  /// Read a row selected with [`entry_columns`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let at = ITEM_WIDTH;
    Ok(Self {
      item:              RawQueueItem::from_row(row, 0)?,
      student_number:    row.get(at)?,
      first_name:        row.get(at + 1)?,
      last_name:         row.get(at + 2)?,
      email:             row.get(at + 3)?,
      phone:             row.get(at + 4)?,
      academic_year:     row.get(at + 5)?,
      grade_level:       row.get(at + 6)?,
      enrollment_status: row.get(at + 7)?,
    })
  }

  pub fn into_entry(self) -> Result<QueueEntry> {
    Ok(QueueEntry {
      item:              self.item.into_item()?,
      student_number:    self.student_number,
      first_name:        self.first_name,
      last_name:         self.last_name,
      email:             self.email,
      phone:             self.phone,
      academic_year:     self.academic_year,
      grade_level:       decode_enum("grade_level", &self.grade_level)?,
      enrollment_status: decode_enum("enrollment_status", &self.enrollment_status)?,
    })
  }
}

// ─── Applications ────────────────────────────────────────────────────────────

pub struct RawApplication {
  pub application_id:  i64,
  pub student_id:      i64,
  pub academic_year:   String,
  pub grade_level:     String,
  pub previous_school: String,
  pub previous_grade:  String,
  pub priority:        String,
  pub status:          String,
  pub submitted_at:    String,
  pub processed_at:    Option<String>,
  pub processed_by:    Option<String>,
  pub notes:           Option<String>,
}

impl RawApplication {
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id:  row.get(at)?,
      student_id:      row.get(at + 1)?,
      academic_year:   row.get(at + 2)?,
      grade_level:     row.get(at + 3)?,
      previous_school: row.get(at + 4)?,
      previous_grade:  row.get(at + 5)?,
      priority:        row.get(at + 6)?,
      status:          row.get(at + 7)?,
      submitted_at:    row.get(at + 8)?,
      processed_at:    row.get(at + 9)?,
      processed_by:    row.get(at + 10)?,
      notes:           row.get(at + 11)?,
    })
  }

  pub fn into_application(self) -> Result<EnrollmentApplication> {
    Ok(EnrollmentApplication {
      id:              self.application_id,
      applicant_id:    self.student_id,
      academic_year:   self.academic_year,
      grade_level:     decode_enum("grade_level", &self.grade_level)?,
      previous_school: self.previous_school,
      previous_grade:  self.previous_grade,
      priority:        decode_enum("priority", &self.priority)?,
      status:          decode_enum("status", &self.status)?,
      submitted_at:    decode_dt(&self.submitted_at)?,
      processed_at:    decode_dt_opt(self.processed_at)?,
      processed_by:    worker(self.processed_by),
      notes:           self.notes,
    })
  }
}

pub struct RawApplicant {
  pub student_id:                     i64,
  pub student_number:                 String,
  pub first_name:                     String,
  pub last_name:                      String,
  pub middle_name:                    String,
  pub email:                          String,
  pub phone:                          String,
  pub date_of_birth:                  Option<String>,
  pub gender:                         String,
  pub address:                        String,
  pub city:                           String,
  pub state:                          String,
  pub zip_code:                       String,
  pub emergency_contact_name:         String,
  pub emergency_contact_phone:        String,
  pub emergency_contact_relationship: String,
  pub created_at:                     String,
}

impl RawApplicant {
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:                     row.get(at)?,
      student_number:                 row.get(at + 1)?,
      first_name:                     row.get(at + 2)?,
      last_name:                      row.get(at + 3)?,
      middle_name:                    row.get(at + 4)?,
      email:                          row.get(at + 5)?,
      phone:                          row.get(at + 6)?,
      date_of_birth:                  row.get(at + 7)?,
      gender:                         row.get(at + 8)?,
      address:                        row.get(at + 9)?,
      city:                           row.get(at + 10)?,
      state:                          row.get(at + 11)?,
      zip_code:                       row.get(at + 12)?,
      emergency_contact_name:         row.get(at + 13)?,
      emergency_contact_phone:        row.get(at + 14)?,
      emergency_contact_relationship: row.get(at + 15)?,
      created_at:                     row.get(at + 16)?,
    })
  }

  pub fn into_applicant(self) -> Result<Applicant> {
    Ok(Applicant {
      id:             self.student_id,
      student_number: self.student_number,
      details:        ApplicantDetails {
        first_name:                     self.first_name,
        last_name:                      self.last_name,
        middle_name:                    self.middle_name,
        email:                          self.email,
        phone:                          self.phone,
        date_of_birth:                  self
          .date_of_birth
          .as_deref()
          .map(decode_date)
          .transpose()?,
        gender:                         decode_enum("gender", &self.gender)?,
        address:                        self.address,
        city:                           self.city,
        state:                          self.state,
        zip_code:                       self.zip_code,
        emergency_contact_name:         self.emergency_contact_name,
        emergency_contact_phone:        self.emergency_contact_phone,
        emergency_contact_relationship: self.emergency_contact_relationship,
      },
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// An application row joined with applicant and (optional) queue columns.
pub struct RawSummary {
  pub application:  RawApplication,
  pub applicant:    RawApplicant,
  pub queue_number: Option<i64>,
  pub queue_status: Option<String>,
}

impl RawSummary {
  /// Read a row selected with [`summary_columns`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let tail = APPLICATION_WIDTH + APPLICANT_WIDTH;
    Ok(Self {
      application:  RawApplication::from_row(row, 0)?,
      applicant:    RawApplicant::from_row(row, APPLICATION_WIDTH)?,
      queue_number: row.get(tail)?,
      queue_status: row.get(tail + 1)?,
    })
  }

  pub fn into_summary(self) -> Result<ApplicationSummary> {
    Ok(ApplicationSummary {
      application:  self.application.into_application()?,
      applicant:    self.applicant.into_applicant()?,
      queue_number: self.queue_number,
      queue_status: self
        .queue_status
        .as_deref()
        .map(|s| decode_enum("queue_status", s))
        .transpose()?,
    })
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

pub struct RawActivity {
  pub activity_id: i64,
  pub actor:       Option<String>,
  pub action:      String,
  pub target:      String,
  pub detail:      Option<String>,
  pub recorded_at: String,
}

impl RawActivity {
  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      id:          self.activity_id,
      actor:       worker(self.actor),
      action:      decode_enum("action", &self.action)?,
      target:      self.target,
      detail:      self.detail,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

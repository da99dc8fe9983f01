//! SQL schema for the enrollment SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Written once per submission, never updated.
CREATE TABLE IF NOT EXISTS students (
    student_id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    student_number                 TEXT NOT NULL UNIQUE,
    first_name                     TEXT NOT NULL DEFAULT '',
    last_name                      TEXT NOT NULL DEFAULT '',
    middle_name                    TEXT NOT NULL DEFAULT '',
    email                          TEXT NOT NULL DEFAULT '',
    phone                          TEXT NOT NULL DEFAULT '',
    date_of_birth                  TEXT,              -- YYYY-MM-DD or NULL
    gender                         TEXT NOT NULL DEFAULT 'other',
    address                        TEXT NOT NULL DEFAULT '',
    city                           TEXT NOT NULL DEFAULT '',
    state                          TEXT NOT NULL DEFAULT '',
    zip_code                       TEXT NOT NULL DEFAULT '',
    emergency_contact_name         TEXT NOT NULL DEFAULT '',
    emergency_contact_phone        TEXT NOT NULL DEFAULT '',
    emergency_contact_relationship TEXT NOT NULL DEFAULT '',
    created_at                     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    application_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id      INTEGER NOT NULL REFERENCES students(student_id),
    academic_year   TEXT NOT NULL DEFAULT '',
    grade_level     TEXT NOT NULL DEFAULT 'college',
    previous_school TEXT NOT NULL DEFAULT '',
    previous_grade  TEXT NOT NULL DEFAULT '',
    priority        TEXT NOT NULL DEFAULT 'medium',
    status          TEXT NOT NULL DEFAULT 'pending',  -- pending | approved | rejected
    submitted_at    TEXT NOT NULL,
    processed_at    TEXT,
    processed_by    TEXT,
    notes           TEXT
);

-- One row per application. The serving order is computed, never stored.
CREATE TABLE IF NOT EXISTS queue_items (
    item_id             INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id      INTEGER NOT NULL UNIQUE REFERENCES applications(application_id),
    queue_number        INTEGER NOT NULL UNIQUE,
    priority            TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'waiting',
    assigned_worker     TEXT,
    created_at          TEXT NOT NULL,
    started_at          TEXT,
    completed_at        TEXT,
    actual_wait_minutes INTEGER,
    cancel_reason       TEXT,
    CHECK (status IN ('waiting', 'processing', 'completed', 'cancelled')),
    CHECK ((status = 'processing') = (assigned_worker IS NOT NULL))
);

-- Monotonic counters: 'queue_number' and one 'student_number:<year>' row per
-- year. Incremented with a single upsert inside the writing transaction.
CREATE TABLE IF NOT EXISTS counters (
    name  TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

-- Append-only. Written by the background activity writer.
CREATE TABLE IF NOT EXISTS activity_log (
    activity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor       TEXT,
    action      TEXT NOT NULL,
    target      TEXT NOT NULL,
    detail      TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS queue_status_idx        ON queue_items(status);
CREATE INDEX IF NOT EXISTS queue_worker_idx        ON queue_items(assigned_worker);
CREATE INDEX IF NOT EXISTS applications_status_idx ON applications(status);
CREATE INDEX IF NOT EXISTS applications_submit_idx ON applications(submitted_at);
CREATE INDEX IF NOT EXISTS activity_recorded_idx   ON activity_log(recorded_at);

PRAGMA user_version = 1;
";

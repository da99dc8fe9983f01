//! Best-effort activity log.
//!
//! Mutations hand entries to an [`ActivitySink`], which queues them on a
//! bounded channel drained by a single writer task. A full or closed channel
//! drops the entry with a warning; the mutation that produced it has already
//! committed and is unaffected.

use rusqlite::Connection;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use enroll_core::activity::{ActivityEntry, NewActivity};

use crate::{
  Result,
  encode::{RawActivity, encode_dt},
};

#[derive(Clone)]
pub struct ActivitySink {
  tx: mpsc::Sender<NewActivity>,
}

impl ActivitySink {
  /// Start the writer task on the current runtime.
  pub fn spawn(conn: tokio_rusqlite::Connection, capacity: usize) -> Self {
    let (tx, mut rx) = mpsc::channel::<NewActivity>(capacity.max(1));

    tokio::spawn(async move {
      while let Some(entry) = rx.recv().await {
        let action = entry.action;
        let result = conn
          .call(move |conn| {
            insert(conn, &entry)?;
            Ok(())
          })
          .await;
        if let Err(e) = result {
          warn!(%action, error = %e, "failed to write activity entry");
        }
      }
      debug!("activity writer stopped");
    });

    Self { tx }
  }

  /// Queue `entry` without waiting.
  pub fn record(&self, entry: NewActivity) {
    match self.tx.try_send(entry) {
      Ok(()) => {}
      Err(mpsc::error::TrySendError::Full(entry)) => {
        warn!(action = %entry.action, target = %entry.target, "activity queue full, entry dropped");
      }
      Err(mpsc::error::TrySendError::Closed(entry)) => {
        warn!(action = %entry.action, target = %entry.target, "activity writer gone, entry dropped");
      }
    }
  }
}

fn insert(conn: &Connection, entry: &NewActivity) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO activity_log (actor, action, target, detail, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      entry.actor.as_ref().map(|w| w.as_str()),
      entry.action.as_ref(),
      entry.target,
      entry.detail,
      encode_dt(entry.recorded_at),
    ],
  )?;
  Ok(())
}

/// The newest `limit` entries, newest first.
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<ActivityEntry>> {
  let mut stmt = conn.prepare(
    "SELECT activity_id, actor, action, target, detail, recorded_at
       FROM activity_log
      ORDER BY recorded_at DESC, activity_id DESC
      LIMIT ?1",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![limit as i64], |r| {
      Ok(RawActivity {
        activity_id: r.get(0)?,
        actor:       r.get(1)?,
        action:      r.get(2)?,
        target:      r.get(3)?,
        detail:      r.get(4)?,
        recorded_at: r.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawActivity::into_entry).collect()
}

//! SQLite backend for the enrollment admission queue.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every mutating operation runs
//! in one `BEGIN IMMEDIATE` transaction, which serialises writers and makes
//! the counter increments and status compare-and-swaps race free.

mod activity;
mod encode;
mod ledger;
mod queue;
mod schema;
mod stats;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;

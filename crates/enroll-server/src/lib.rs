//! HTTP server wiring for the enrollment admission queue.
//!
//! Mounts the [`enroll_api`] router under `/api`, adds a liveness probe, and
//! wraps everything in request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use enroll_core::{stats::DEFAULT_WAIT_MINUTES, store::AdmissionStore};
use enroll_store_sqlite::StoreOptions;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ENROLL_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path:              PathBuf,
  /// Average wait assumed before any item has completed.
  pub default_wait_minutes:    f64,
  /// Activity entries buffered for the background writer.
  pub activity_queue_capacity: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                    "127.0.0.1".to_string(),
      port:                    8080,
      store_path:              PathBuf::from("enroll.db"),
      default_wait_minutes:    DEFAULT_WAIT_MINUTES,
      activity_queue_capacity: 1024,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      default_wait_minutes: self.default_wait_minutes,
      activity_capacity: self.activity_queue_capacity,
      ..StoreOptions::default()
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build the full application router for `store`.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: AdmissionStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", enroll_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

//! JSON REST API for the enrollment admission queue.
//!
//! Exposes an axum [`Router`] backed by any
//! [`enroll_core::store::AdmissionStore`]. Authentication, TLS, and transport
//! concerns are the caller's responsibility; the acting worker is read from
//! the `X-Worker-Id` header (see [`identity`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", enroll_api::api_router(store.clone()))
//! ```

pub mod applications;
pub mod error;
pub mod identity;
pub mod queue;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use enroll_core::store::AdmissionStore;

pub use error::ApiError;
pub use identity::WORKER_HEADER;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AdmissionStore + 'static,
{
  Router::new()
    // Entry ledger
    .route(
      "/applications",
      get(applications::list::<S>).post(applications::submit::<S>),
    )
    .route("/applications/{id}", get(applications::get_one::<S>))
    .route("/applications/{id}/decision", post(applications::decide::<S>))
    // Queue
    .route("/queue", get(queue::list::<S>))
    .route("/queue/next", get(queue::peek::<S>))
    .route("/queue/mine", get(queue::mine::<S>))
    .route("/queue/claim", post(queue::claim_next::<S>))
    .route("/queue/{id}", get(queue::get_one::<S>))
    .route("/queue/{id}/claim", post(queue::claim::<S>))
    .route("/queue/{id}/complete", post(queue::complete::<S>))
    .route("/queue/{id}/release", post(queue::release::<S>))
    .route("/queue/{id}/cancel", post(queue::cancel::<S>))
    // Statistics
    .route("/stats/queue", get(stats::queue::<S>))
    .route("/stats/dashboard", get(stats::dashboard::<S>))
    .route("/stats/enrollments", get(stats::enrollments::<S>))
    .route("/stats/queue-analytics", get(stats::analytics::<S>))
    .route("/stats/grade-levels", get(stats::grade_levels::<S>))
    .route("/stats/enrollment-trends", get(stats::enrollment_trends::<S>))
    .route("/activity", get(stats::activity::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;

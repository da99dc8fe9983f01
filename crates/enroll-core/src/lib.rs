//! Core types and trait definitions for the enrollment admission queue.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::AdmissionStore`]; transports depend on
//! that trait, never on a concrete backend.

pub mod activity;
pub mod applicant;
pub mod application;
pub mod clock;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};

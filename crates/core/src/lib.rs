//! Domain types and the pure reminder ingestion logic.
//!
//! This crate has no internal dependencies so it can be shared by the
//! storage layer, the scheduler, and any future tooling.

pub mod dosage;
pub mod error;
pub mod ingest;
pub mod notification;
pub mod reminder;
pub mod types;

pub use error::CoreError;

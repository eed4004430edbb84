//! Doseminder reminder worker.
//!
//! The binary wires PostgreSQL storage, the preference-driven notifier and
//! the reminder scheduler together. Configuration and startup live here so
//! they can be tested without a running process.

pub mod app;
pub mod config;

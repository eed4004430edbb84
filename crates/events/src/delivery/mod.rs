//! External delivery channels for reminder notifications.
//!
//! [`crate::notifier::UserNotifier`] fans a resolved notification out to
//! every target a user configured, using these services.

pub mod email;
pub mod webhook;

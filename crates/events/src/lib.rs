//! Doseminder reminder scheduling and notification delivery.
//!
//! - [`ReminderScheduler`]: background loop that ingests upcoming dosage
//!   reminders, notifies due users and records every attempt.
//! - [`UserNotifier`]: [`doseminder_core::notification::Notifier`] that
//!   resolves a user's preferences and fans out to their targets.
//! - [`delivery`]: external delivery channels (webhook, email).

pub mod delivery;
pub mod notifier;
pub mod reminder;

pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::webhook::WebhookDelivery;
pub use notifier::UserNotifier;
pub use reminder::{CycleReport, ReminderScheduler, ReminderSchedulerHandle, ShutdownError};

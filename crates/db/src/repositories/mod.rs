//! Stateless query helpers, one per table group.

pub mod dosage_reminder_repo;
pub mod notification_preference_repo;

pub use dosage_reminder_repo::DosageReminderRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;

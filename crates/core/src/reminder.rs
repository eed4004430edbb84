//! Reminder candidates, attempt records, and the storage contract.
//!
//! Storage is the single source of truth for reminder state: a fresh
//! snapshot of [`DosageReminder`]s is pulled every cycle and the only thing
//! written back is a [`RemindedDose`] per dispatched reminder.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::dosage::{Dosage, Dose};
use crate::error::CoreError;
use crate::types::{Timestamp, UserSecret};

// ---------------------------------------------------------------------------
// Interval constants
// ---------------------------------------------------------------------------

/// The soonest the scheduler will wake up again after a cycle.
pub const SHORTEST_NEXT_NOTIFICATION: Duration = Duration::from_secs(5 * 60);

/// Lookahead window, and the default wake-up cadence.
pub const NEXT_UPDATE_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Wake-up delay after a cycle failed to read its candidates.
pub const NEXT_UPDATE_INTERVAL_ON_ERROR: Duration = Duration::from_secs(2 * 60);

// ---------------------------------------------------------------------------
// DosageReminder
// ---------------------------------------------------------------------------

/// A per-user reminder candidate, produced fresh by storage each cycle.
///
/// Storage never produces a candidate for a user without both a schedule and
/// at least one recorded dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageReminder {
    pub user_secret: UserSecret,
    /// Display name, only used for logs and notification text.
    pub username: String,
    pub dosage: Dosage,
    pub last_dose: Dose,
    /// `taken_at` of the last dose a reminder was recorded for.
    pub last_reminded_dose: Option<Timestamp>,
    /// User-chosen deferral that overrides the schedule-derived time.
    pub snoozed_until: Option<Timestamp>,
}

impl DosageReminder {
    /// When this user should next be notified.
    ///
    /// The snooze time if one is set, otherwise the last dose plus the
    /// schedule interval.
    pub fn next_notification(&self) -> Timestamp {
        match self.snoozed_until {
            Some(until) => until,
            None => self.last_dose.taken_at + self.dosage.interval.to_duration(),
        }
    }

    /// Whether the last dose already produced a recorded reminder and no
    /// snooze has been set since.
    pub fn is_already_reminded(&self) -> bool {
        self.snoozed_until.is_none() && self.last_reminded_dose == Some(self.last_dose.taken_at)
    }
}

// ---------------------------------------------------------------------------
// RemindedDose
// ---------------------------------------------------------------------------

/// Attempt record written back after a reminder was dispatched.
///
/// Written whether or not the notification actually went out; once stored,
/// the next snapshot reports `last_reminded_dose == reminded_dose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindedDose {
    pub user_secret: UserSecret,
    /// `taken_at` of the dose being reminded about.
    pub reminded_dose: Timestamp,
    /// Clear the user's active snooze along with this record.
    pub clear_snooze: bool,
    /// When the dispatch attempt finished.
    pub reminded_at: Timestamp,
    /// Notifier error text, if the send failed.
    pub error_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// ReminderSettings
// ---------------------------------------------------------------------------

/// Timing knobs for ingestion and the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    /// Floor on the delay until the next cycle.
    pub shortest_next_notification: Duration,
    /// Lookahead window and default cadence.
    pub next_update_interval: Duration,
    /// Retry delay after a failed candidate read.
    pub next_update_interval_on_error: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            shortest_next_notification: SHORTEST_NEXT_NOTIFICATION,
            next_update_interval: NEXT_UPDATE_INTERVAL,
            next_update_interval_on_error: NEXT_UPDATE_INTERVAL_ON_ERROR,
        }
    }
}

impl ReminderSettings {
    /// Reject zero intervals and a floor that exceeds the lookahead window.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.shortest_next_notification.is_zero()
            || self.next_update_interval.is_zero()
            || self.next_update_interval_on_error.is_zero()
        {
            return Err(CoreError::Validation(
                "reminder intervals must be positive".into(),
            ));
        }
        if self.shortest_next_notification > self.next_update_interval {
            return Err(CoreError::Validation(format!(
                "shortest next notification ({}s) exceeds update interval ({}s)",
                self.shortest_next_notification.as_secs(),
                self.next_update_interval.as_secs(),
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Storage contract
// ---------------------------------------------------------------------------

/// Lazily produced candidate snapshot. May fail part-way through.
pub type ReminderStream<'a> = BoxStream<'a, Result<DosageReminder, CoreError>>;

/// Persistence consumed by the reminder scheduler.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Stream every user with both a schedule and a dose history.
    ///
    /// No strict ordering is required; reminders nearer their due time
    /// should come first.
    fn upcoming_dosage_reminders(&self) -> ReminderStream<'_>;

    /// Durably record dispatch attempts.
    ///
    /// Once this returns `Ok`, subsequent snapshots must report
    /// `last_reminded_dose` equal to each attempt's `reminded_dose`, and
    /// have the snooze cleared where `clear_snooze` was set.
    async fn record_reminded_doses(&self, doses: &[RemindedDose]) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::dosage::Days;

    fn now() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn candidate(taken_at: Timestamp) -> DosageReminder {
        DosageReminder {
            user_secret: UserSecret::new("secret-1"),
            username: "user1".into(),
            dosage: Dosage {
                delivery_method: "patch".into(),
                dose: 100.0,
                interval: Days(3.5),
                concurrence: Some(2),
            },
            last_dose: Dose {
                delivery_method: "patch".into(),
                dose: 100.0,
                taken_at,
                taken_off_at: None,
            },
            last_reminded_dose: None,
            snoozed_until: None,
        }
    }

    // -----------------------------------------------------------------------
    // next_notification
    // -----------------------------------------------------------------------

    #[test]
    fn next_notification_adds_interval_to_last_dose() {
        let r = candidate(now());
        assert_eq!(r.next_notification(), now() + chrono::Duration::hours(84));
    }

    #[test]
    fn snooze_overrides_schedule() {
        let mut r = candidate(now());
        let snooze = now() + chrono::Duration::minutes(10);
        r.snoozed_until = Some(snooze);
        assert_eq!(r.next_notification(), snooze);
    }

    // -----------------------------------------------------------------------
    // is_already_reminded
    // -----------------------------------------------------------------------

    #[test]
    fn never_reminded_is_not_handled() {
        assert!(!candidate(now()).is_already_reminded());
    }

    #[test]
    fn reminded_for_last_dose_is_handled() {
        let mut r = candidate(now());
        r.last_reminded_dose = Some(now());
        assert!(r.is_already_reminded());
    }

    #[test]
    fn reminded_for_older_dose_is_not_handled() {
        let mut r = candidate(now());
        r.last_reminded_dose = Some(now() - chrono::Duration::days(3));
        assert!(!r.is_already_reminded());
    }

    #[test]
    fn snooze_reopens_handled_reminder() {
        let mut r = candidate(now());
        r.last_reminded_dose = Some(now());
        r.snoozed_until = Some(now() + chrono::Duration::minutes(10));
        assert!(!r.is_already_reminded());
    }

    // -----------------------------------------------------------------------
    // ReminderSettings
    // -----------------------------------------------------------------------

    #[test]
    fn default_settings_are_valid() {
        assert!(ReminderSettings::default().validate().is_ok());
    }

    #[test]
    fn floor_above_window_rejected() {
        let settings = ReminderSettings {
            shortest_next_notification: Duration::from_secs(3600),
            ..ReminderSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_error_interval_rejected() {
        let settings = ReminderSettings {
            next_update_interval_on_error: Duration::ZERO,
            ..ReminderSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}

//! Reminder candidate row and its conversion into the domain type.

use doseminder_core::dosage::{Days, Dosage, Dose};
use doseminder_core::reminder::DosageReminder;
use doseminder_core::types::{Timestamp, UserSecret};
use sqlx::FromRow;

/// One row of the upcoming-reminders query: a user's schedule joined with
/// their latest dose and reminder state.
#[derive(Debug, Clone, FromRow)]
pub struct UpcomingReminderRow {
    pub user_secret: String,
    pub username: String,
    pub delivery_method: String,
    pub dose: f32,
    pub interval_days: f64,
    pub concurrence: Option<i32>,
    pub last_delivery_method: String,
    pub last_dose: f32,
    pub taken_at: Timestamp,
    pub taken_off_at: Option<Timestamp>,
    pub last_reminded_dose: Option<Timestamp>,
    pub snoozed_until: Option<Timestamp>,
}

impl From<UpcomingReminderRow> for DosageReminder {
    fn from(row: UpcomingReminderRow) -> Self {
        DosageReminder {
            user_secret: UserSecret::from(row.user_secret),
            username: row.username,
            dosage: Dosage {
                delivery_method: row.delivery_method,
                dose: row.dose,
                interval: Days(row.interval_days),
                concurrence: row.concurrence,
            },
            last_dose: Dose {
                delivery_method: row.last_delivery_method,
                dose: row.last_dose,
                taken_at: row.taken_at,
                taken_off_at: row.taken_off_at,
            },
            last_reminded_dose: row.last_reminded_dose,
            snoozed_until: row.snoozed_until,
        }
    }
}

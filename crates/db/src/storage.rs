//! Adapters exposing the repositories through the core collaborator traits.

use async_trait::async_trait;
use doseminder_core::notification::{NotificationPreferenceStore, UserNotificationProfile};
use doseminder_core::reminder::{DosageReminder, RemindedDose, ReminderStorage, ReminderStream};
use doseminder_core::types::UserSecret;
use doseminder_core::CoreError;
use futures::{future, StreamExt, TryStreamExt};
use validator::Validate;

use crate::repositories::{DosageReminderRepo, NotificationPreferenceRepo};
use crate::DbPool;

// ---------------------------------------------------------------------------
// PgReminderStorage
// ---------------------------------------------------------------------------

/// [`ReminderStorage`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgReminderStorage {
    pool: DbPool,
}

impl PgReminderStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStorage for PgReminderStorage {
    /// Schedules that fail validation are skipped. Postgres ranks `NaN`
    /// above every number, so such rows get past the `interval_days > 0`
    /// check constraint.
    fn upcoming_dosage_reminders(&self) -> ReminderStream<'_> {
        DosageReminderRepo::upcoming(&self.pool)
            .map_ok(DosageReminder::from)
            .map_err(CoreError::storage)
            .try_filter(|reminder| {
                let valid = match reminder.dosage.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(
                            username = %reminder.username,
                            error = %e,
                            "Skipping reminder with invalid dosage schedule"
                        );
                        false
                    }
                };
                future::ready(valid)
            })
            .boxed()
    }

    async fn record_reminded_doses(&self, doses: &[RemindedDose]) -> Result<(), CoreError> {
        let mut failures = Vec::new();

        // Each attempt commits on its own so one bad row does not lose the rest.
        for attempt in doses {
            if let Err(e) = DosageReminderRepo::record_attempt(&self.pool, attempt).await {
                tracing::warn!(
                    reminded_dose = %attempt.reminded_dose,
                    error = %e,
                    "Failed to insert reminded dose attempt"
                );
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Storage(failures.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// PgNotificationPreferences
// ---------------------------------------------------------------------------

/// [`NotificationPreferenceStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgNotificationPreferences {
    pool: DbPool,
}

impl PgNotificationPreferences {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationPreferenceStore for PgNotificationPreferences {
    async fn notification_profile(
        &self,
        user: &UserSecret,
    ) -> Result<UserNotificationProfile, CoreError> {
        NotificationPreferenceRepo::get_profile(&self.pool, user)
            .await
            .map_err(CoreError::storage)?
            .map(UserNotificationProfile::from)
            .ok_or(CoreError::NotFound { entity: "user" })
    }
}

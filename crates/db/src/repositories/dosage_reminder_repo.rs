//! Repository for reminder candidates and attempt records.

use doseminder_core::reminder::RemindedDose;
use doseminder_core::types::{Timestamp, UserSecret};
use futures::stream::BoxStream;
use sqlx::PgPool;

use crate::models::reminder::UpcomingReminderRow;

/// Every user with a schedule and at least one dose, with their latest dose,
/// the dose of their most recent reminder attempt, and any live snooze.
///
/// The inner joins drop users lacking a schedule or a dose history. A snooze
/// is only reported while it belongs to the latest dose and no attempt has
/// been recorded for that dose at or after the snooze time. Rows come back
/// ordered by when the next dose is expected.
const UPCOMING_QUERY: &str = "\
    SELECT u.secret AS user_secret, \
           u.name AS username, \
           s.delivery_method, \
           s.dose, \
           s.interval_days, \
           s.concurrence, \
           h.delivery_method AS last_delivery_method, \
           h.dose AS last_dose, \
           h.taken_at, \
           h.taken_off_at, \
           a.reminded_dose AS last_reminded_dose, \
           CASE WHEN st.snoozed_dose = h.taken_at \
                 AND (a.reminded_dose IS DISTINCT FROM h.taken_at \
                      OR a.reminded_at < st.snoozed_until) \
                THEN st.snoozed_until \
           END AS snoozed_until \
    FROM users u \
    JOIN dosage_schedules s ON s.user_secret = u.secret \
    JOIN LATERAL ( \
        SELECT delivery_method, dose, taken_at, taken_off_at \
        FROM dose_history \
        WHERE user_secret = u.secret \
        ORDER BY taken_at DESC \
        LIMIT 1 \
    ) h ON true \
    LEFT JOIN LATERAL ( \
        SELECT reminded_dose, reminded_at \
        FROM reminded_dose_attempts \
        WHERE user_secret = u.secret \
        ORDER BY id DESC \
        LIMIT 1 \
    ) a ON true \
    LEFT JOIN dosage_reminder_state st ON st.user_secret = u.secret \
    ORDER BY extract(epoch FROM h.taken_at)::float8 + s.interval_days * 86400 ASC";

/// Provides reminder queries.
pub struct DosageReminderRepo;

impl DosageReminderRepo {
    /// Stream all reminder candidates without buffering the result set.
    pub fn upcoming(pool: &PgPool) -> BoxStream<'_, Result<UpcomingReminderRow, sqlx::Error>> {
        sqlx::query_as::<_, UpcomingReminderRow>(UPCOMING_QUERY).fetch(pool)
    }

    /// Insert an attempt record, clearing the snooze in the same transaction
    /// when asked to.
    pub async fn record_attempt(pool: &PgPool, attempt: &RemindedDose) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO reminded_dose_attempts \
             (user_secret, reminded_dose, reminded_at, error_reason) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(attempt.user_secret.as_str())
        .bind(attempt.reminded_dose)
        .bind(attempt.reminded_at)
        .bind(attempt.error_reason.as_deref())
        .execute(&mut *tx)
        .await?;

        if attempt.clear_snooze {
            sqlx::query(
                "UPDATE dosage_reminder_state SET snoozed_until = NULL WHERE user_secret = $1",
            )
            .bind(attempt.user_secret.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Snooze the reminder for the user's latest dose until `until`, or
    /// clear it with `None`. Logging a newer dose retires the snooze.
    pub async fn set_snooze(
        pool: &PgPool,
        user: &UserSecret,
        until: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO dosage_reminder_state (user_secret, snoozed_until, snoozed_dose) \
             VALUES ($1, $2, (SELECT MAX(taken_at) FROM dose_history WHERE user_secret = $1)) \
             ON CONFLICT (user_secret) DO UPDATE \
             SET snoozed_until = EXCLUDED.snoozed_until, snoozed_dose = EXCLUDED.snoozed_dose",
        )
        .bind(user.as_str())
        .bind(until)
        .execute(pool)
        .await?;
        Ok(())
    }
}

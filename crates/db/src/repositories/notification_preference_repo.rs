//! Repository for the `user_notification_preferences` table.

use doseminder_core::notification::UserPreferences;
use doseminder_core::types::UserSecret;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::notification::NotificationProfileRow;

/// Provides notification preference lookups.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Load a user's name and preferences.
    ///
    /// Users without a preferences row get empty preferences. Returns `None`
    /// if the user does not exist.
    pub async fn get_profile(
        pool: &PgPool,
        user: &UserSecret,
    ) -> Result<Option<NotificationProfileRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationProfileRow>(
            "SELECT u.name AS username, \
                    COALESCE(p.preferences, '{}'::jsonb) AS preferences \
             FROM users u \
             LEFT JOIN user_notification_preferences p ON p.user_secret = u.secret \
             WHERE u.secret = $1",
        )
        .bind(user.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Replace a user's preferences.
    pub async fn set_preferences(
        pool: &PgPool,
        user: &UserSecret,
        preferences: &UserPreferences,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_notification_preferences (user_secret, preferences) \
             VALUES ($1, $2) \
             ON CONFLICT (user_secret) DO UPDATE \
             SET preferences = EXCLUDED.preferences, updated_at = NOW()",
        )
        .bind(user.as_str())
        .bind(Json(preferences))
        .execute(pool)
        .await?;
        Ok(())
    }
}

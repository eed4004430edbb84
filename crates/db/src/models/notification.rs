//! Notification profile row.

use doseminder_core::notification::{UserNotificationProfile, UserPreferences};
use sqlx::types::Json;
use sqlx::FromRow;

/// A user's display name joined with their stored preferences.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationProfileRow {
    pub username: String,
    pub preferences: Json<UserPreferences>,
}

impl From<NotificationProfileRow> for UserNotificationProfile {
    fn from(row: NotificationProfileRow) -> Self {
        UserNotificationProfile {
            username: row.username,
            preferences: row.preferences.0,
        }
    }
}

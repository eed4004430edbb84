//! Notification kinds, messages, per-user delivery preferences, and the
//! notifier contract consumed by the reminder scheduler.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::UserSecret;

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Time to take the next hormone dose.
    Reminder,
    /// Something about the account needs attention.
    AccountNotice,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::AccountNotice => "account_notice",
        }
    }

    /// The built-in message for this kind.
    pub fn default_message(self) -> NotificationMessage {
        match self {
            Self::Reminder => NotificationMessage {
                title: "Reminder".into(),
                body: "Don't forget to take your hormone dose!".into(),
            },
            Self::AccountNotice => NotificationMessage {
                title: "Account Notice".into(),
                body: "Please check your account.".into(),
            },
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reminder" => Ok(Self::Reminder),
            "account_notice" => Ok(Self::AccountNotice),
            other => Err(CoreError::UnknownNotificationKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Title and body shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
}

/// A fully resolved notification, ready for a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub username: String,
    pub message: NotificationMessage,
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// A webhook endpoint that accepts JSON-encoded notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    pub url: String,
}

/// An email recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTarget {
    pub address: String,
}

/// Where a user wants notifications delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfigs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook: Vec<WebhookTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<EmailTarget>,
}

impl NotificationConfigs {
    pub fn is_empty(&self) -> bool {
        self.webhook.is_empty() && self.email.is_empty()
    }
}

/// Per-user notification preferences, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub notification_configs: NotificationConfigs,
    /// Message bodies overriding the defaults, keyed by kind.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_messages: HashMap<NotificationKind, String>,
}

impl UserPreferences {
    /// Resolve the message for `kind`, preferring the user's custom body.
    pub fn message_for(&self, kind: NotificationKind) -> NotificationMessage {
        let mut message = kind.default_message();
        if let Some(custom) = self.custom_messages.get(&kind) {
            message.body = custom.clone();
        }
        message
    }
}

/// Everything the notifier needs to know about a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotificationProfile {
    pub username: String,
    pub preferences: UserPreferences,
}

impl UserNotificationProfile {
    /// Build the notification of `kind` for this user.
    pub fn notification(&self, kind: NotificationKind) -> Notification {
        Notification {
            kind,
            username: self.username.clone(),
            message: self.preferences.message_for(kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Lookup of per-user notification settings.
#[async_trait]
pub trait NotificationPreferenceStore: Send + Sync {
    async fn notification_profile(
        &self,
        user: &UserSecret,
    ) -> Result<UserNotificationProfile, CoreError>;
}

/// Sends a notification of a given kind to a user.
///
/// Implementations own their transport retry policy; callers simply await
/// the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user: &UserSecret, kind: NotificationKind)
        -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [NotificationKind::Reminder, NotificationKind::AccountNotice] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert_matches!(
            "digest".parse::<NotificationKind>(),
            Err(CoreError::UnknownNotificationKind(name)) if name == "digest"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::AccountNotice).unwrap();
        assert_eq!(json, "\"account_notice\"");
    }

    #[test]
    fn empty_preferences_have_no_targets() {
        let prefs: UserPreferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.notification_configs.is_empty());
    }

    #[test]
    fn preferences_parse_from_stored_json() {
        let prefs: UserPreferences = serde_json::from_value(serde_json::json!({
            "notificationConfigs": {
                "webhook": [{ "url": "https://push.example/hook" }],
                "email": [{ "address": "me@example.com" }]
            },
            "customMessages": { "reminder": "patch time" }
        }))
        .unwrap();

        assert_eq!(prefs.notification_configs.webhook.len(), 1);
        assert_eq!(prefs.notification_configs.email[0].address, "me@example.com");
        assert_eq!(
            prefs.message_for(NotificationKind::Reminder).body,
            "patch time"
        );
    }

    #[test]
    fn custom_message_keeps_default_title() {
        let mut prefs = UserPreferences::default();
        prefs
            .custom_messages
            .insert(NotificationKind::Reminder, "E time".into());

        let message = prefs.message_for(NotificationKind::Reminder);
        assert_eq!(message.title, "Reminder");
        assert_eq!(message.body, "E time");
    }

    #[test]
    fn default_message_used_without_override() {
        let profile = UserNotificationProfile {
            username: "alex".into(),
            preferences: UserPreferences::default(),
        };
        let n = profile.notification(NotificationKind::Reminder);
        assert_eq!(n.username, "alex");
        assert_eq!(n.message, NotificationKind::Reminder.default_message());
    }
}

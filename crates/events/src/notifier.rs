//! Preference-driven notifier.
//!
//! [`UserNotifier`] looks up a user's notification profile, resolves the
//! message for the requested kind and delivers it to every configured
//! webhook and email target. A user with no targets is not an error.

use std::sync::Arc;

use async_trait::async_trait;
use doseminder_core::notification::{NotificationKind, NotificationPreferenceStore, Notifier};
use doseminder_core::types::UserSecret;
use doseminder_core::CoreError;

use crate::delivery::email::EmailDelivery;
use crate::delivery::webhook::WebhookDelivery;

/// Delivers notifications over the channels a user has configured.
pub struct UserNotifier {
    preferences: Arc<dyn NotificationPreferenceStore>,
    webhook: Option<WebhookDelivery>,
    email: Option<EmailDelivery>,
}

impl UserNotifier {
    /// Create a notifier with every channel disabled.
    pub fn new(preferences: Arc<dyn NotificationPreferenceStore>) -> Self {
        Self {
            preferences,
            webhook: None,
            email: None,
        }
    }

    /// Enable webhook delivery.
    pub fn with_webhook(mut self, webhook: WebhookDelivery) -> Self {
        self.webhook = Some(webhook);
        self
    }

    /// Enable email delivery.
    pub fn with_email(mut self, email: EmailDelivery) -> Self {
        self.email = Some(email);
        self
    }
}

#[async_trait]
impl Notifier for UserNotifier {
    async fn notify_user(
        &self,
        user: &UserSecret,
        kind: NotificationKind,
    ) -> Result<(), CoreError> {
        let profile = self.preferences.notification_profile(user).await?;
        let configs = &profile.preferences.notification_configs;

        if configs.is_empty() {
            tracing::debug!(username = %profile.username, %kind, "No notification targets configured");
            return Ok(());
        }

        let notification = profile.notification(kind);
        let mut failures = Vec::new();

        match &self.webhook {
            Some(webhook) => {
                for target in &configs.webhook {
                    if let Err(e) = webhook.deliver(&target.url, &notification).await {
                        failures.push(format!("webhook: {e}"));
                    }
                }
            }
            None if !configs.webhook.is_empty() => {
                tracing::debug!(username = %profile.username, "Webhook delivery disabled, skipping targets");
            }
            None => {}
        }

        match &self.email {
            Some(email) => {
                for target in &configs.email {
                    if let Err(e) = email.deliver(&target.address, &notification).await {
                        failures.push(format!("email: {e}"));
                    }
                }
            }
            None if !configs.email.is_empty() => {
                tracing::debug!(username = %profile.username, "Email delivery disabled, skipping targets");
            }
            None => {}
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::delivery(failures.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookDelivery`] POSTs a JSON-encoded [`Notification`] to a user's
//! webhook URL. Failed attempts are retried with exponential backoff
//! (1 s, 2 s, 4 s) by default.

use std::time::Duration;

use doseminder_core::notification::Notification;

/// Retry delays (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers notifications to webhook endpoints.
pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    /// Create a delivery service with a pre-configured HTTP client.
    pub fn new() -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            retry_delays: RETRY_DELAYS.to_vec(),
        })
    }

    /// Replace the backoff schedule. An empty schedule means one attempt.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver a notification to a webhook URL with retry.
    ///
    /// Returns `Ok(())` on the first successful attempt, otherwise the error
    /// of the final attempt.
    pub async fn deliver(&self, url: &str, notification: &Notification) -> Result<(), WebhookError> {
        let payload = payload(notification);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(url, &payload).await.map_err(|e| {
            tracing::error!(error = %e, "Webhook delivery failed after all retries");
            e
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// JSON body sent to the webhook. `title`/`message` match what common push
/// relays (e.g. Gotify) expect.
fn payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "title": notification.message.title,
        "message": notification.message.body,
        "kind": notification.kind,
        "username": notification.username,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use doseminder_core::notification::NotificationKind;

    use super::*;

    fn reminder() -> Notification {
        Notification {
            kind: NotificationKind::Reminder,
            username: "robin".into(),
            message: NotificationKind::Reminder.default_message(),
        }
    }

    #[test]
    fn new_builds_client() {
        assert!(WebhookDelivery::new().is_ok());
    }

    #[test]
    fn payload_carries_title_message_and_kind() {
        let body = payload(&reminder());
        assert_eq!(body["title"], "Reminder");
        assert_eq!(body["message"], "Don't forget to take your hormone dose!");
        assert_eq!(body["kind"], "reminder");
        assert_eq!(body["username"], "robin");
    }

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }

    #[test]
    fn webhook_error_display_request() {
        // Build a reqwest error from an invalid URL.
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = WebhookError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_without_retry_schedule() {
        let delivery = WebhookDelivery::new().unwrap().with_retry_delays(vec![]);
        let result = delivery.deliver("http://127.0.0.1:1/hook", &reminder()).await;
        assert!(matches!(result, Err(WebhookError::Request(_))));
    }
}

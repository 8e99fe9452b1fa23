use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::error::NotificationError;
use super::models::{NotificationAction, OutboxEvent};

/// Delivery channel for booking notifications
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, event: &OutboxEvent) -> Result<(), NotificationError>;
}

#[derive(Debug, Serialize)]
struct NotificationPayload {
    event_id: Uuid,
    booking_id: Uuid,
    action: NotificationAction,
}

/// Posts `{event_id, booking_id, action}` to the notification service
///
/// The receiver keys on `event_id`, so redelivery after a crash is harmless.
pub struct WebhookNotificationSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationSender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookNotificationSender {
    async fn send(&self, event: &OutboxEvent) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(&NotificationPayload {
                event_id: event.id,
                booking_id: event.booking_id,
                action: event.action,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Used when no notification endpoint is configured
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, event: &OutboxEvent) -> Result<(), NotificationError> {
        info!(
            "Notification {} for booking {} (event {})",
            event.action, event.booking_id, event.id
        );
        Ok(())
    }
}

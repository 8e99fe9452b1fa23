use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which template a booking notification uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    BookingCreated,
    BookingUpdated,
    PaymentSuccess,
    PaymentFailed,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::BookingCreated => "booking_created",
            NotificationAction::BookingUpdated => "booking_updated",
            NotificationAction::PaymentSuccess => "payment_success",
            NotificationAction::PaymentFailed => "payment_failed",
        }
    }
}

impl std::fmt::Display for NotificationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    /// Claimed by a worker; reclaimable once the lease runs out
    Processing,
    Sent,
    Dead,
}

/// A notification waiting to be dispatched, written in the booking transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub action: NotificationAction,
    pub attempts: i32,
    pub status: OutboxStatus,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    pub fn new(booking_id: Uuid, action: NotificationAction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            action,
            attempts: 0,
            status: OutboxStatus::Pending,
            available_at: now,
            last_error: None,
            created_at: now,
            sent_at: None,
        }
    }
}

// Notification module
// Durable outbox of booking notifications and the worker that drains it

pub mod error;
pub mod models;
pub mod outbox;
pub mod sender;
pub mod worker;

pub use error::NotificationError;
pub use models::{NotificationAction, OutboxEvent, OutboxStatus};
pub use outbox::{OutboxStore, PgOutboxStore};
pub use sender::{LogNotificationSender, NotificationSender, WebhookNotificationSender};
pub use worker::{DispatchSummary, OutboxWorker, RetryPolicy};

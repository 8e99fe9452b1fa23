use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::error::NotificationError;
use super::models::OutboxEvent;

/// Durable queue of booking notifications
///
/// Rows are inserted by the booking commit; this trait covers the
/// dispatch side only.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Claim up to `limit` due events for this worker
    ///
    /// Pending events whose `available_at` has passed are due, as are events
    /// stuck in processing since before `stale_before`.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, NotificationError>;

    async fn mark_sent(&self, id: Uuid) -> Result<(), NotificationError>;

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), NotificationError>;

    async fn mark_dead(&self, id: Uuid, attempts: i32, error: &str)
        -> Result<(), NotificationError>;
}

#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, NotificationError> {
        // SKIP LOCKED keeps concurrent workers from claiming the same row
        let events = sqlx::query_as::<_, OutboxEvent>(
            r#"
            UPDATE notification_outbox
            SET status = 'processing', available_at = $1
            WHERE id IN (
                SELECT id FROM notification_outbox
                WHERE (status = 'pending' AND available_at <= $1)
                   OR (status = 'processing' AND available_at <= $2)
                ORDER BY created_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, booking_id, action, attempts, status, available_at,
                      last_error, created_at, sent_at
            "#,
        )
        .bind(now)
        .bind(stale_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<(), NotificationError> {
        sqlx::query(
            "UPDATE notification_outbox SET status = 'sent', sent_at = NOW(), last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), NotificationError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'pending', attempts = $2, available_at = $3, last_error = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(available_at)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_dead(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), NotificationError> {
        sqlx::query(
            "UPDATE notification_outbox SET status = 'dead', attempts = $2, last_error = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// Outbox dispatcher
//
// Polls the outbox, hands each due event to the sender and records the outcome.
// Failures are retried with exponential backoff; an event that keeps failing is
// marked dead and logged at error level.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, error, warn};

use crate::config::OutboxConfig;

use super::error::NotificationError;
use super::outbox::OutboxStore;
use super::sender::NotificationSender;

/// A claimed row older than this is assumed abandoned by a crashed worker
const PROCESSING_LEASE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before the next try, given how many attempts have failed so far
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(2u32.pow(exponent))
    }

    /// Backoff plus up to half of it again as jitter
    pub fn delay_with_jitter(&self, failed_attempts: u32) -> Duration {
        let backoff = self.backoff(failed_attempts);
        let jitter_ms = backoff.as_millis() as u64 / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        backoff + Duration::from_millis(jitter)
    }

    pub fn is_exhausted(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }
}

impl From<&OutboxConfig> for RetryPolicy {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.retry_base,
        }
    }
}

/// What one dispatch pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub retried: usize,
    pub dead: usize,
}

pub struct OutboxWorker {
    store: Arc<dyn OutboxStore>,
    sender: Arc<dyn NotificationSender>,
    policy: RetryPolicy,
    poll_interval: Duration,
    batch_size: i64,
}

impl OutboxWorker {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        sender: Arc<dyn NotificationSender>,
        config: &OutboxConfig,
    ) -> Self {
        Self {
            store,
            sender,
            policy: RetryPolicy::from(config),
            poll_interval: config.poll_interval,
            batch_size: config.batch_size,
        }
    }

    /// Claim one batch of due events and dispatch them
    pub async fn dispatch_due(&self) -> Result<DispatchSummary, NotificationError> {
        let now = Utc::now();
        let lease = chrono::Duration::from_std(PROCESSING_LEASE)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let events = self
            .store
            .claim_due(now, now - lease, self.batch_size)
            .await?;

        let mut summary = DispatchSummary::default();
        for event in events {
            match self.sender.send(&event).await {
                Ok(()) => {
                    self.store.mark_sent(event.id).await?;
                    summary.sent += 1;
                }
                Err(err) => {
                    let attempts = event.attempts.max(0) as u32 + 1;
                    let message = err.to_string();
                    if self.policy.is_exhausted(attempts) {
                        error!(
                            "Notification {} for booking {} failed permanently after {} attempts: {}",
                            event.action, event.booking_id, attempts, message
                        );
                        self.store
                            .mark_dead(event.id, attempts as i32, &message)
                            .await?;
                        summary.dead += 1;
                    } else {
                        let delay = self.policy.delay_with_jitter(attempts);
                        warn!(
                            "Notification {} for booking {} failed (attempt {}), retrying in {:?}: {}",
                            event.action, event.booking_id, attempts, delay, message
                        );
                        let available_at = Utc::now()
                            + chrono::Duration::from_std(delay)
                                .unwrap_or_else(|_| chrono::Duration::zero());
                        self.store
                            .reschedule(event.id, attempts as i32, available_at, &message)
                            .await?;
                        summary.retried += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Poll forever; meant to be spawned onto the runtime
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            match self.dispatch_due().await {
                Ok(summary) if summary != DispatchSummary::default() => {
                    debug!("Outbox pass: {:?}", summary)
                }
                Ok(_) => {}
                Err(err) => error!("Outbox pass failed: {}", err),
            }
        }
    }
}

// Invoice generation collaborator
// Called after a booking reaches sample_collected; failures never undo the booking change

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait InvoiceGenerator: Send + Sync {
    async fn generate(&self, booking_id: Uuid) -> anyhow::Result<()>;
}

/// Asks the invoice service to render and store the invoice for a booking
pub struct HttpInvoiceGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpInvoiceGenerator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl InvoiceGenerator for HttpInvoiceGenerator {
    async fn generate(&self, booking_id: Uuid) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&json!({ "booking_id": booking_id }))
            .send()
            .await
            .context("failed to reach invoice service")?
            .error_for_status()
            .context("invoice service rejected request")?;
        Ok(())
    }
}

/// Used when no invoice service is configured
pub struct LogInvoiceGenerator;

#[async_trait]
impl InvoiceGenerator for LogInvoiceGenerator {
    async fn generate(&self, booking_id: Uuid) -> anyhow::Result<()> {
        info!("Invoice requested for booking {} (no invoice service configured)", booking_id);
        Ok(())
    }
}

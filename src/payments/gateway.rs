// Payment gateway collaborator
// Hosted payment links: creation, status lookup and status mapping

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::bookings::PaymentStatus;
use crate::config::GatewayConfig;

use super::models::{LinkStatus, PaymentContact, PaymentLink};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_link(
        &self,
        booking_id: Uuid,
        amount: Decimal,
        contact: &PaymentContact,
    ) -> anyhow::Result<(PaymentLink, Value)>;

    async fn fetch_link_status(&self, gateway_order_id: &str) -> anyhow::Result<LinkStatus>;
}

/// Gateway link status → payment record status; unknown values stay initiated
pub fn map_gateway_status(status: &str) -> PaymentStatus {
    match status.trim().to_lowercase().as_str() {
        "created" | "issued" => PaymentStatus::Initiated,
        "paid" => PaymentStatus::Success,
        "cancelled" | "expired" => PaymentStatus::Failed,
        _ => PaymentStatus::Initiated,
    }
}

/// Amount in the currency's minor unit (paise), rounded half away from zero
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

pub struct HttpPaymentGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment_link(
        &self,
        booking_id: Uuid,
        amount: Decimal,
        contact: &PaymentContact,
    ) -> anyhow::Result<(PaymentLink, Value)> {
        let minor = to_minor_units(amount).context("amount out of range")?;

        let mut body = json!({
            "amount": minor,
            "currency": "INR",
            "description": format!("Payment for Booking {}", booking_id),
            "customer": contact,
            "notify": { "sms": true, "email": true },
            "reminder_enable": true,
        });
        if let Some(callback) = &self.config.callback_url {
            body["callback_url"] = json!(callback);
            body["callback_method"] = json!("get");
        }

        let raw: Value = self
            .client
            .post(self.url("payment_links"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("payment gateway rejected link creation")?
            .json()
            .await
            .context("invalid payment gateway response")?;

        let link: PaymentLink =
            serde_json::from_value(raw.clone()).context("payment link missing id or short_url")?;
        debug!("Created payment link {} for booking {}", link.id, booking_id);

        Ok((link, raw))
    }

    async fn fetch_link_status(&self, gateway_order_id: &str) -> anyhow::Result<LinkStatus> {
        let raw: Value = self
            .client
            .get(self.url(&format!("payment_links/{}", gateway_order_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("payment gateway rejected status lookup")?
            .json()
            .await
            .context("invalid payment gateway response")?;

        Ok(link_status_from(raw))
    }
}

fn link_status_from(raw: Value) -> LinkStatus {
    let status = map_gateway_status(raw.get("status").and_then(Value::as_str).unwrap_or_default());
    let gateway_payment_id = raw
        .get("payments")
        .and_then(Value::as_array)
        .and_then(|payments| payments.first())
        .and_then(|payment| payment.get("payment_id").or_else(|| payment.get("id")))
        .and_then(Value::as_str)
        .map(str::to_string);

    LinkStatus {
        status,
        gateway_payment_id,
        raw,
    }
}

/// Used when no gateway credentials are configured; online payments fail fast
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_payment_link(
        &self,
        _booking_id: Uuid,
        _amount: Decimal,
        _contact: &PaymentContact,
    ) -> anyhow::Result<(PaymentLink, Value)> {
        anyhow::bail!("payment gateway is not configured")
    }

    async fn fetch_link_status(&self, _gateway_order_id: &str) -> anyhow::Result<LinkStatus> {
        anyhow::bail!("payment gateway is not configured")
    }
}

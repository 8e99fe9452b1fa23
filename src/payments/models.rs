use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::bookings::{PaymentMethod, PaymentStatus};

/// One payment attempt against a booking
///
/// The latest record by creation time is authoritative for the booking's
/// payment_status and payment_method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookingPayment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub payment_link: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_order_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub gateway_response: Option<serde_json::Value>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingPayment {
    pub fn new(
        booking_id: Uuid,
        user_id: Option<Uuid>,
        amount: Decimal,
        status: PaymentStatus,
        method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            user_id,
            amount,
            status,
            method,
            payment_link: None,
            gateway_payment_id: None,
            gateway_order_id: None,
            gateway_response: None,
            remarks: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Customer details the gateway needs for a hosted payment link
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentContact {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Hosted payment link returned by the gateway
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub short_url: String,
    #[serde(default)]
    pub status: String,
}

/// Status of a link as reported by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStatus {
    pub status: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub raw: serde_json::Value,
}

/// Body posted by the gateway to the webhook endpoint
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GatewayWebhookPayload {
    /// Gateway-side link/order id the payment was created with
    pub order_id: String,
    pub status: String,
    pub payment_id: Option<String>,
}

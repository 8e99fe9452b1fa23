// HTTP handlers for payment endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::StaffUser;
use crate::bookings::{Booking, BookingError, BookingResult};
use crate::AppState;

use super::models::GatewayWebhookPayload;
use super::webhook::{verify_signature, SIGNATURE_HEADER};

/// Handler for POST /api/payments/webhook
/// Gateway callback; authenticated by an HMAC signature over the raw body
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body = GatewayWebhookPayload,
    responses(
        (status = 200, description = "Payment and booking synced", body = Booking),
        (status = 403, description = "Missing or invalid signature"),
        (status = 404, description = "No payment for this order")
    ),
    tag = "payments"
)]
pub async fn payment_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> BookingResult<Json<Booking>> {
    let Some(secret) = state.payment_webhook_secret.as_deref() else {
        warn!("Payment webhook received but no webhook secret is configured");
        return Err(BookingError::Forbidden("Webhook is not configured".to_string()));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(secret, &body, signature) {
        debug!("Rejected payment webhook with invalid signature");
        return Err(BookingError::Forbidden("Invalid webhook signature".to_string()));
    }

    let payload: GatewayWebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| BookingError::validation("body", e.to_string()))?;

    let booking = state.bookings.handle_gateway_webhook(payload).await?;
    Ok(Json(booking))
}

/// Handler for POST /api/bookings/{id}/payments/refresh
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/payments/refresh",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Latest payment refreshed from the gateway", body = Booking),
        (status = 404, description = "Booking has no payment"),
        (status = 502, description = "Gateway unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn refresh_payment_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<Booking>> {
    let booking = state.bookings.refresh_payment(id).await?;
    Ok(Json(booking))
}

/// Handler for POST /api/bookings/{id}/payments/sync
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/payments/sync",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking payment fields match the latest payment", body = Booking),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn sync_payment_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<Uuid>,
) -> BookingResult<Json<Booking>> {
    let booking = state.bookings.sync_payment(id).await?;
    Ok(Json(booking))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::catalog::ProductKind;
use crate::error::ErrorResponse;

use super::models::BookingStatus;

pub type BookingResult<T> = Result<T, BookingError>;

/// Error types for pricing, coupon and booking workflow operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Unknown product type: {0}")]
    InvalidProductKind(String),

    #[error("Each item must reference exactly one product")]
    InvalidItemReference,

    #[error("{kind} {id} not found")]
    ProductNotFound { kind: ProductKind, id: Uuid },

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Coupon is expired or inactive")]
    CouponExpiredOrInactive,

    #[error("Coupon {scope} usage limit reached")]
    CouponLimitReached { scope: LimitScope },

    #[error("Admin discount {admin_discount} must be between 0 and base total {base_total}")]
    InvalidAdminDiscount {
        admin_discount: Decimal,
        base_total: Decimal,
    },

    #[error("{field} mismatch: server {server_value}, client {client_value}")]
    TotalMismatch {
        field: &'static str,
        server_value: Decimal,
        client_value: Decimal,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Agent user {0} not found")]
    AgentNotFound(Uuid),

    #[error("Incentive total {total} exceeds booking final amount {final_amount}")]
    IncentiveLimitExceeded { total: Decimal, final_amount: Decimal },

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Booking is {0} and can no longer be modified")]
    BookingClosed(BookingStatus),

    #[error("Booking was modified concurrently; reload and retry")]
    ConcurrentModification,

    #[error("Coupon has already been redeemed for this booking")]
    DuplicateRedemption,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which coupon limit was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Global,
    PerUser,
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitScope::Global => write!(f, "global"),
            LimitScope::PerUser => write!(f, "per-user"),
        }
    }
}

impl BookingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BookingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::BookingClosed(_)
            | BookingError::ConcurrentModification
            | BookingError::DuplicateRedemption => StatusCode::CONFLICT,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            BookingError::Database(_) | BookingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::Validation { .. } => "VALIDATION_ERROR",
            BookingError::InvalidProductKind(_) => "INVALID_PRODUCT_KIND",
            BookingError::InvalidItemReference => "INVALID_ITEM_REFERENCE",
            BookingError::ProductNotFound { .. } => "PRODUCT_NOT_FOUND",
            BookingError::CouponNotFound => "COUPON_NOT_FOUND",
            BookingError::CouponExpiredOrInactive => "COUPON_EXPIRED_OR_INACTIVE",
            BookingError::CouponLimitReached { .. } => "COUPON_LIMIT_REACHED",
            BookingError::InvalidAdminDiscount { .. } => "INVALID_ADMIN_DISCOUNT",
            BookingError::TotalMismatch { .. } => "TOTAL_MISMATCH",
            BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            BookingError::AgentNotFound(_) => "AGENT_NOT_FOUND",
            BookingError::IncentiveLimitExceeded { .. } => "INCENTIVE_LIMIT_EXCEEDED",
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::BookingClosed(_) => "BOOKING_CLOSED",
            BookingError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            BookingError::DuplicateRedemption => "DUPLICATE_REDEMPTION",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::PaymentGateway(_) => "PAYMENT_GATEWAY_ERROR",
            BookingError::Database(_) => "DATABASE_ERROR",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            BookingError::Validation { field, .. } => Some(json!({ "field": field })),
            BookingError::ProductNotFound { kind, id } => {
                Some(json!({ "product_type": kind.as_str(), "product_id": id }))
            }
            BookingError::CouponLimitReached { scope } => {
                Some(json!({ "scope": scope.to_string() }))
            }
            BookingError::TotalMismatch {
                field,
                server_value,
                client_value,
            } => Some(json!({
                "field": field,
                "server_value": server_value,
                "client_value": client_value,
            })),
            BookingError::InvalidTransition { from, to } => {
                Some(json!({ "from": from.as_str(), "to": to.as_str() }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            BookingError::Database(err) => {
                error!("Database error: {}", err);
                "Internal server error".to_string()
            }
            BookingError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse::new(self.error_code(), message, self.details()).into_response_with(status)
    }
}

/// Map a Postgres unique violation on coupon redemptions to DuplicateRedemption
pub fn map_redemption_conflict(err: sqlx::Error) -> BookingError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation()
                && db_err
                    .constraint()
                    .map(|name| name.contains("coupon_redemptions"))
                    .unwrap_or(false) =>
        {
            BookingError::DuplicateRedemption
        }
        _ => BookingError::Database(err),
    }
}

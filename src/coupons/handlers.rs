use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use tracing::debug;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::bookings::{BookingError, BookingResult};
use crate::AppState;

use super::evaluator::{CouponEvaluator, CouponUsage};
use super::models::{CouponValidationRequest, CouponValidationResponse};

/// Check a coupon code for the caller and preview its discount
#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = CouponValidationRequest,
    responses(
        (status = 200, description = "Coupon applies", body = CouponValidationResponse),
        (status = 400, description = "Coupon unknown, expired or exhausted", body = CouponValidationResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "coupons"
)]
pub async fn validate_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CouponValidationRequest>,
) -> BookingResult<(StatusCode, Json<CouponValidationResponse>)> {
    payload
        .validate()
        .map_err(|e| BookingError::validation("coupon_code", e.to_string()))?;

    match evaluate(&state, &user, &payload).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(
            err @ (BookingError::CouponNotFound
            | BookingError::CouponExpiredOrInactive
            | BookingError::CouponLimitReached { .. }),
        ) => {
            debug!("Coupon {} rejected: {}", payload.coupon_code, err);
            Ok((
                StatusCode::BAD_REQUEST,
                Json(CouponValidationResponse {
                    valid: false,
                    coupon_id: None,
                    discount: Decimal::ZERO,
                    final_amount: payload.base_total,
                    remaining_uses: None,
                    message: err.to_string(),
                }),
            ))
        }
        Err(err) => Err(err),
    }
}

async fn evaluate(
    state: &AppState,
    user: &AuthenticatedUser,
    payload: &CouponValidationRequest,
) -> BookingResult<CouponValidationResponse> {
    let coupon = state
        .coupons
        .find_by_code(&payload.coupon_code)
        .await?
        .ok_or(BookingError::CouponNotFound)?;

    if !coupon.is_valid_now() {
        return Err(BookingError::CouponExpiredOrInactive);
    }

    let usage = CouponUsage {
        global: state.coupons.count_redemptions(coupon.id, None, None).await?,
        per_user: state
            .coupons
            .count_redemptions(coupon.id, Some(user.user_id), None)
            .await?,
    };
    let remaining_uses = CouponEvaluator::remaining_global_uses(&coupon, usage.global);
    CouponEvaluator::check_eligibility(&coupon, usage)?;

    let discount = CouponEvaluator::discount_for(&coupon, payload.base_total);
    let final_amount = (payload.base_total - discount).max(Decimal::ZERO);

    Ok(CouponValidationResponse {
        valid: true,
        coupon_id: Some(coupon.id),
        discount,
        final_amount,
        remaining_uses,
        message: "Coupon applied successfully".to_string(),
    })
}

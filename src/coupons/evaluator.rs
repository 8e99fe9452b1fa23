// Coupon discount computation and eligibility checks

use rust_decimal::{Decimal, RoundingStrategy};

use crate::bookings::{BookingError, BookingResult, LimitScope};

use super::models::{Coupon, DiscountKind};

/// Redemption counts relevant to one eligibility decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CouponUsage {
    pub global: i64,
    pub per_user: i64,
}

pub struct CouponEvaluator;

impl CouponEvaluator {
    /// Discount a coupon grants on a base total
    ///
    /// Percent coupons are capped by max_discount_amount and rounded to cents.
    /// Flat coupons are returned verbatim; clamping against the booking happens
    /// in clamp_to_base when the discount is applied.
    pub fn discount_for(coupon: &Coupon, base_total: Decimal) -> Decimal {
        match coupon.discount_type {
            DiscountKind::Percent => {
                let raw = (coupon.discount_value / Decimal::ONE_HUNDRED)
                    .checked_mul(base_total)
                    .unwrap_or(Decimal::MAX);
                let capped = match coupon.max_discount_amount {
                    Some(cap) if raw > cap => cap,
                    _ => raw,
                };
                capped.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            }
            DiscountKind::Flat => coupon.discount_value,
        }
    }

    pub fn clamp_to_base(discount: Decimal, base_total: Decimal) -> Decimal {
        discount.max(Decimal::ZERO).min(base_total.max(Decimal::ZERO))
    }

    /// Rejects the coupon once either limit is reached
    pub fn check_eligibility(coupon: &Coupon, usage: CouponUsage) -> BookingResult<()> {
        if let Some(limit) = coupon.usage_limit {
            if usage.global >= i64::from(limit) {
                return Err(BookingError::CouponLimitReached {
                    scope: LimitScope::Global,
                });
            }
        }
        if let Some(limit) = coupon.per_user_limit {
            if usage.per_user >= i64::from(limit) {
                return Err(BookingError::CouponLimitReached {
                    scope: LimitScope::PerUser,
                });
            }
        }
        Ok(())
    }

    /// None means unlimited
    pub fn remaining_global_uses(coupon: &Coupon, redemptions: i64) -> Option<i64> {
        coupon
            .usage_limit
            .map(|limit| (i64::from(limit) - redemptions).max(0))
    }
}

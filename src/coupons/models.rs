use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_non_blank, validate_non_negative_amount};

/// How a coupon's discount_value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// discount_value is a percentage of the base total (10 means 10%)
    Percent,
    /// discount_value is an absolute amount
    Flat,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountKind,
    pub discount_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Active and inside the validity window (either bound may be open)
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if matches!(self.valid_from, Some(from) if now < from) {
            return false;
        }
        if matches!(self.valid_to, Some(to) if now > to) {
            return false;
        }
        true
    }

    pub fn is_valid_now(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// One application of a coupon to one booking by one user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CouponRedemption {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRedemption {
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
}

impl NewRedemption {
    pub fn into_redemption(self) -> CouponRedemption {
        CouponRedemption {
            id: Uuid::new_v4(),
            coupon_id: self.coupon_id,
            user_id: self.user_id,
            booking_id: self.booking_id,
            used_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CouponValidationRequest {
    #[validate(custom = "validate_non_blank")]
    pub coupon_code: String,

    #[validate(custom = "validate_non_negative_amount")]
    pub base_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponValidationResponse {
    pub valid: bool,
    pub coupon_id: Option<Uuid>,
    pub discount: Decimal,
    pub final_amount: Decimal,
    /// Global uses left; None when the coupon is unlimited or was rejected
    pub remaining_uses: Option<i64>,
    pub message: String,
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::bookings::BookingResult;

use super::models::Coupon;

/// Read access to coupons and their redemption history
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> BookingResult<Option<Coupon>>;

    /// Case-insensitive lookup by code
    async fn find_by_code(&self, code: &str) -> BookingResult<Option<Coupon>>;

    /// Redemptions of a coupon, optionally for one user, never counting `excluding_booking`
    async fn count_redemptions(
        &self,
        coupon_id: Uuid,
        user_id: Option<Uuid>,
        excluding_booking: Option<Uuid>,
    ) -> BookingResult<i64>;

    async fn has_redemption(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> BookingResult<bool>;
}

pub struct PgCouponStore {
    pool: PgPool,
}

impl PgCouponStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, \
    max_discount_amount, valid_from, valid_to, usage_limit, per_user_limit, active, created_at";

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn find_by_id(&self, id: Uuid) -> BookingResult<Option<Coupon>> {
        let sql = format!("SELECT {} FROM coupons WHERE id = $1", COUPON_COLUMNS);
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    async fn find_by_code(&self, code: &str) -> BookingResult<Option<Coupon>> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE LOWER(code) = LOWER($1)",
            COUPON_COLUMNS
        );
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    async fn count_redemptions(
        &self,
        coupon_id: Uuid,
        user_id: Option<Uuid>,
        excluding_booking: Option<Uuid>,
    ) -> BookingResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM coupon_redemptions
            WHERE coupon_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::uuid IS NULL OR booking_id <> $3)
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(excluding_booking)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn has_redemption(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> BookingResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM coupon_redemptions
                WHERE coupon_id = $1 AND user_id = $2 AND booking_id = $3
            )
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

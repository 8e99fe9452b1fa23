use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::coupons::CouponRedemption;
use crate::notifications::OutboxEvent;
use crate::payments::BookingPayment;

use super::error::{map_redemption_conflict, BookingError, BookingResult};
use super::incentives::IncentiveEntry;
use super::models::{AssignedUser, Booking, BookingItem, UserAccount};
use super::store::{BookingChangeSet, BookingStore};
use super::tracker::TrackerEntry;

const BOOKING_COLUMNS: &str = "id, ref_id, user_id, address_id, coupon_id, base_total, offer_total, \
    discount_amount, coupon_discount, admin_discount, final_amount, total_savings, initial_amount, \
    status, customer_status, payment_status, payment_method, scheduled_date, scheduled_time_slot, \
    remarks, version, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, booking_id, patient_id, lab_test_id, profile_id, package_id, \
    product_name, base_price, offer_price, created_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount, status, method, payment_link, \
    gateway_payment_id, gateway_order_id, gateway_response, remarks, created_at, updated_at";

/// Postgres-backed booking store
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn find_items(&self, booking_id: Uuid) -> BookingResult<Vec<BookingItem>> {
        let sql = format!(
            "SELECT {} FROM booking_items WHERE booking_id = $1 ORDER BY created_at, id",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, BookingItem>(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn find_assignments(&self, booking_id: Uuid) -> BookingResult<Vec<AssignedUser>> {
        let assigned = sqlx::query_as::<_, AssignedUser>(
            r#"
            SELECT u.id AS user_id, u.email, u.role_name
            FROM booking_assigned_users a
            JOIN users u ON u.id = a.user_id
            WHERE a.booking_id = $1
            ORDER BY a.position
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assigned)
    }

    async fn find_user(&self, user_id: Uuid) -> BookingResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>(
            "SELECT id, email, first_name, last_name, mobile, role_name FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn latest_payment(&self, booking_id: Uuid) -> BookingResult<Option<BookingPayment>> {
        let sql = format!(
            "SELECT {} FROM booking_payments WHERE booking_id = $1 ORDER BY created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, BookingPayment>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> BookingResult<Option<BookingPayment>> {
        let sql = format!(
            "SELECT {} FROM booking_payments WHERE gateway_order_id = $1 ORDER BY created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, BookingPayment>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn find_actions(&self, booking_id: Uuid) -> BookingResult<Vec<TrackerEntry>> {
        let entries = sqlx::query_as::<_, TrackerEntry>(
            r#"
            SELECT id, booking_id, actor_id, action, notes, created_at
            FROM booking_action_trackers
            WHERE booking_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn incentive_total(&self, booking_id: Uuid) -> BookingResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM booking_incentives WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn count_ref_prefix(&self, prefix: &str) -> BookingResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE ref_id LIKE $1")
            .bind(format!("{}%", prefix))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn commit(&self, changes: BookingChangeSet) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await?;

        // booking row first: it takes the row lock and enforces the version check
        let booking = match changes.expected_version {
            None => insert_booking(&mut tx, &changes.booking).await?,
            Some(version) => update_booking(&mut tx, &changes.booking, version)
                .await?
                .ok_or(BookingError::ConcurrentModification)?,
        };

        if let Some(items) = &changes.replace_items {
            sqlx::query("DELETE FROM booking_items WHERE booking_id = $1")
                .bind(booking.id)
                .execute(&mut *tx)
                .await?;
            for item in items {
                insert_item(&mut tx, item).await?;
            }
        }

        if let Some(assigned) = &changes.replace_assignments {
            sqlx::query("DELETE FROM booking_assigned_users WHERE booking_id = $1")
                .bind(booking.id)
                .execute(&mut *tx)
                .await?;
            for (position, user) in assigned.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO booking_assigned_users (booking_id, user_id, position) VALUES ($1, $2, $3)",
                )
                .bind(booking.id)
                .bind(user.user_id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(redemption) = &changes.redemption {
            insert_redemption(&mut tx, redemption).await?;
        }
        if let Some(payment) = &changes.new_payment {
            insert_payment(&mut tx, payment).await?;
        }
        if let Some(payment) = &changes.updated_payment {
            update_payment(&mut tx, payment).await?;
        }
        for entry in &changes.entries {
            insert_entry(&mut tx, entry).await?;
        }
        for incentive in &changes.incentives {
            insert_incentive(&mut tx, incentive).await?;
        }
        for event in &changes.events {
            insert_event(&mut tx, event).await?;
        }

        tx.commit().await?;
        Ok(booking)
    }
}

async fn insert_booking(conn: &mut PgConnection, booking: &Booking) -> BookingResult<Booking> {
    let sql = format!(
        r#"
        INSERT INTO bookings ({cols})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23)
        RETURNING {cols}
        "#,
        cols = BOOKING_COLUMNS
    );

    sqlx::query_as::<_, Booking>(&sql)
        .bind(booking.id)
        .bind(&booking.ref_id)
        .bind(booking.user_id)
        .bind(booking.address_id)
        .bind(booking.coupon_id)
        .bind(booking.base_total)
        .bind(booking.offer_total)
        .bind(booking.discount_amount)
        .bind(booking.coupon_discount)
        .bind(booking.admin_discount)
        .bind(booking.final_amount)
        .bind(booking.total_savings)
        .bind(booking.initial_amount)
        .bind(booking.status)
        .bind(booking.customer_status)
        .bind(booking.payment_status)
        .bind(booking.payment_method)
        .bind(booking.scheduled_date)
        .bind(&booking.scheduled_time_slot)
        .bind(&booking.remarks)
        .bind(booking.version)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_ref_conflict)
}

/// None when the stored version no longer matches
async fn update_booking(
    conn: &mut PgConnection,
    booking: &Booking,
    expected_version: i32,
) -> BookingResult<Option<Booking>> {
    let sql = format!(
        r#"
        UPDATE bookings SET
            address_id = $3, coupon_id = $4, base_total = $5, offer_total = $6,
            discount_amount = $7, coupon_discount = $8, admin_discount = $9,
            final_amount = $10, total_savings = $11, initial_amount = $12,
            status = $13, customer_status = $14, payment_status = $15, payment_method = $16,
            scheduled_date = $17, scheduled_time_slot = $18, remarks = $19,
            version = version + 1, updated_at = NOW()
        WHERE id = $1 AND version = $2
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );

    let updated = sqlx::query_as::<_, Booking>(&sql)
        .bind(booking.id)
        .bind(expected_version)
        .bind(booking.address_id)
        .bind(booking.coupon_id)
        .bind(booking.base_total)
        .bind(booking.offer_total)
        .bind(booking.discount_amount)
        .bind(booking.coupon_discount)
        .bind(booking.admin_discount)
        .bind(booking.final_amount)
        .bind(booking.total_savings)
        .bind(booking.initial_amount)
        .bind(booking.status)
        .bind(booking.customer_status)
        .bind(booking.payment_status)
        .bind(booking.payment_method)
        .bind(booking.scheduled_date)
        .bind(&booking.scheduled_time_slot)
        .bind(&booking.remarks)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(updated)
}

async fn insert_item(conn: &mut PgConnection, item: &BookingItem) -> BookingResult<()> {
    let sql = format!(
        "INSERT INTO booking_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        ITEM_COLUMNS
    );
    sqlx::query(&sql)
        .bind(item.id)
        .bind(item.booking_id)
        .bind(item.patient_id)
        .bind(item.lab_test_id)
        .bind(item.profile_id)
        .bind(item.package_id)
        .bind(&item.product_name)
        .bind(item.base_price)
        .bind(item.offer_price)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_redemption(
    conn: &mut PgConnection,
    redemption: &CouponRedemption,
) -> BookingResult<()> {
    sqlx::query(
        "INSERT INTO coupon_redemptions (id, coupon_id, user_id, booking_id, used_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(redemption.id)
    .bind(redemption.coupon_id)
    .bind(redemption.user_id)
    .bind(redemption.booking_id)
    .bind(redemption.used_at)
    .execute(&mut *conn)
    .await
    .map_err(map_redemption_conflict)?;
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &BookingPayment) -> BookingResult<()> {
    let sql = format!(
        "INSERT INTO booking_payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        PAYMENT_COLUMNS
    );
    sqlx::query(&sql)
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(payment.method)
        .bind(&payment.payment_link)
        .bind(&payment.gateway_payment_id)
        .bind(&payment.gateway_order_id)
        .bind(&payment.gateway_response)
        .bind(&payment.remarks)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn update_payment(conn: &mut PgConnection, payment: &BookingPayment) -> BookingResult<()> {
    sqlx::query(
        r#"
        UPDATE booking_payments
        SET status = $2, gateway_payment_id = $3, gateway_response = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(payment.id)
    .bind(payment.status)
    .bind(&payment.gateway_payment_id)
    .bind(&payment.gateway_response)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_entry(conn: &mut PgConnection, entry: &TrackerEntry) -> BookingResult<()> {
    sqlx::query(
        "INSERT INTO booking_action_trackers (id, booking_id, actor_id, action, notes, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.id)
    .bind(entry.booking_id)
    .bind(entry.actor_id)
    .bind(entry.action)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_incentive(conn: &mut PgConnection, incentive: &IncentiveEntry) -> BookingResult<()> {
    sqlx::query(
        r#"
        INSERT INTO booking_incentives (id, booking_id, user_id, amount, note, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(incentive.id)
    .bind(incentive.booking_id)
    .bind(incentive.user_id)
    .bind(incentive.amount)
    .bind(&incentive.note)
    .bind(incentive.created_by)
    .bind(incentive.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_event(conn: &mut PgConnection, event: &OutboxEvent) -> BookingResult<()> {
    sqlx::query(
        r#"
        INSERT INTO notification_outbox (id, booking_id, action, attempts, status, available_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(event.booking_id)
    .bind(event.action)
    .bind(event.attempts)
    .bind(event.status)
    .bind(event.available_at)
    .bind(event.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Two creates racing for the same daily sequence number
fn map_ref_conflict(err: sqlx::Error) -> BookingError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation()
                && db_err
                    .constraint()
                    .map(|name| name.contains("ref_id"))
                    .unwrap_or(false) =>
        {
            BookingError::ConcurrentModification
        }
        _ => BookingError::Database(err),
    }
}

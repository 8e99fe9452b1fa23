use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::coupons::CouponRedemption;
use crate::notifications::OutboxEvent;
use crate::payments::BookingPayment;

use super::error::BookingResult;
use super::incentives::IncentiveEntry;
use super::models::{AssignedUser, Booking, BookingItem, UserAccount};
use super::tracker::TrackerEntry;

/// Everything one booking mutation writes, committed atomically
#[derive(Debug, Clone)]
pub struct BookingChangeSet {
    pub booking: Booking,
    /// None inserts a new booking; Some updates only if the stored version still matches
    pub expected_version: Option<i32>,
    pub replace_items: Option<Vec<BookingItem>>,
    pub replace_assignments: Option<Vec<AssignedUser>>,
    pub new_payment: Option<BookingPayment>,
    pub updated_payment: Option<BookingPayment>,
    pub redemption: Option<CouponRedemption>,
    pub entries: Vec<TrackerEntry>,
    pub incentives: Vec<IncentiveEntry>,
    pub events: Vec<OutboxEvent>,
}

impl BookingChangeSet {
    pub fn new(booking: Booking, expected_version: Option<i32>) -> Self {
        Self {
            booking,
            expected_version,
            replace_items: None,
            replace_assignments: None,
            new_payment: None,
            updated_payment: None,
            redemption: None,
            entries: Vec::new(),
            incentives: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Persistence for bookings and everything hanging off them
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    async fn find_items(&self, booking_id: Uuid) -> BookingResult<Vec<BookingItem>>;

    async fn find_assignments(&self, booking_id: Uuid) -> BookingResult<Vec<AssignedUser>>;

    async fn find_user(&self, user_id: Uuid) -> BookingResult<Option<UserAccount>>;

    /// Most recent payment record by creation time
    async fn latest_payment(&self, booking_id: Uuid) -> BookingResult<Option<BookingPayment>>;

    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> BookingResult<Option<BookingPayment>>;

    /// Audit entries, newest first
    async fn find_actions(&self, booking_id: Uuid) -> BookingResult<Vec<TrackerEntry>>;

    /// Sum of incentives already recorded against the booking
    async fn incentive_total(&self, booking_id: Uuid) -> BookingResult<Decimal>;

    /// Number of bookings whose ref_id starts with `prefix`
    async fn count_ref_prefix(&self, prefix: &str) -> BookingResult<i64>;

    /// Apply a change set in one transaction and return the stored booking
    async fn commit(&self, changes: BookingChangeSet) -> BookingResult<Booking>;
}

// In-memory collaborators for service and HTTP tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthenticatedUser, TokenService};
use crate::bookings::{
    AssignedUser, Booking, BookingChangeSet, BookingError, BookingItem, BookingResult,
    BookingService, BookingStatus, BookingStore, CachedRolePolicy, IncentiveEntry,
    RoleStatusPolicySource, TrackerEntry, UserAccount,
};
use crate::catalog::{CatalogProduct, ProductCatalog, ProductKind, ProductRef};
use crate::coupons::{Coupon, CouponRedemption, CouponStore, DiscountKind};
use crate::invoice::InvoiceGenerator;
use crate::notifications::{
    NotificationError, NotificationSender, OutboxEvent, OutboxStatus, OutboxStore,
};
use crate::payments::{
    map_gateway_status, BookingPayment, LinkStatus, PaymentContact, PaymentGateway, PaymentLink,
};
use crate::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductRef, CatalogProduct>>,
}

impl InMemoryCatalog {
    pub fn add(
        &self,
        kind: ProductKind,
        name: &str,
        price: Option<Decimal>,
        offer_price: Option<Decimal>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.products.lock().unwrap().insert(
            ProductRef::new(kind, id),
            CatalogProduct {
                id,
                name: name.to_string(),
                price,
                offer_price,
            },
        );
        id
    }

    pub fn set_prices(&self, kind: ProductKind, id: Uuid, price: Decimal, offer_price: Decimal) {
        if let Some(product) = self.products.lock().unwrap().get_mut(&ProductRef::new(kind, id)) {
            product.price = Some(price);
            product.offer_price = Some(offer_price);
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn find_product(&self, product: ProductRef) -> BookingResult<Option<CatalogProduct>> {
        Ok(self.products.lock().unwrap().get(&product).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryCouponStore {
    coupons: Mutex<HashMap<Uuid, Coupon>>,
    redemptions: Mutex<Vec<CouponRedemption>>,
}

impl InMemoryCouponStore {
    pub fn add_coupon(
        &self,
        kind: DiscountKind,
        value: Decimal,
        max_discount_amount: Option<Decimal>,
    ) -> Coupon {
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code: format!("CODE{}", self.coupons.lock().unwrap().len() + 1),
            description: None,
            discount_type: kind,
            discount_value: value,
            max_discount_amount,
            valid_from: None,
            valid_to: None,
            usage_limit: None,
            per_user_limit: None,
            active: true,
            created_at: Utc::now(),
        };
        self.coupons.lock().unwrap().insert(coupon.id, coupon.clone());
        coupon
    }

    pub fn update(&self, id: Uuid, change: impl FnOnce(&mut Coupon)) {
        if let Some(coupon) = self.coupons.lock().unwrap().get_mut(&id) {
            change(coupon);
        }
    }

    pub fn deactivate(&self, id: Uuid) {
        self.update(id, |coupon| coupon.active = false);
    }

    pub fn redemptions(&self) -> Vec<CouponRedemption> {
        self.redemptions.lock().unwrap().clone()
    }

    /// Record a redemption the way the unique constraint would
    pub fn redeem(&self, redemption: CouponRedemption) -> BookingResult<()> {
        let mut redemptions = self.redemptions.lock().unwrap();
        if redemptions.iter().any(|existing| same_redemption(existing, &redemption)) {
            return Err(BookingError::DuplicateRedemption);
        }
        redemptions.push(redemption);
        Ok(())
    }

    fn would_duplicate(&self, redemption: &CouponRedemption) -> bool {
        self.redemptions
            .lock()
            .unwrap()
            .iter()
            .any(|existing| same_redemption(existing, redemption))
    }
}

fn same_redemption(a: &CouponRedemption, b: &CouponRedemption) -> bool {
    a.coupon_id == b.coupon_id && a.user_id == b.user_id && a.booking_id == b.booking_id
}

#[async_trait]
impl CouponStore for InMemoryCouponStore {
    async fn find_by_id(&self, id: Uuid) -> BookingResult<Option<Coupon>> {
        Ok(self.coupons.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> BookingResult<Option<Coupon>> {
        Ok(self
            .coupons
            .lock()
            .unwrap()
            .values()
            .find(|coupon| coupon.code.eq_ignore_ascii_case(code.trim()))
            .cloned())
    }

    async fn count_redemptions(
        &self,
        coupon_id: Uuid,
        user_id: Option<Uuid>,
        excluding_booking: Option<Uuid>,
    ) -> BookingResult<i64> {
        let count = self
            .redemptions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.coupon_id == coupon_id)
            .filter(|r| user_id.map_or(true, |user| r.user_id == user))
            .filter(|r| excluding_booking.map_or(true, |booking| r.booking_id != booking))
            .count();
        Ok(count as i64)
    }

    async fn has_redemption(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> BookingResult<bool> {
        Ok(self.redemptions.lock().unwrap().iter().any(|r| {
            r.coupon_id == coupon_id && r.user_id == user_id && r.booking_id == booking_id
        }))
    }
}

#[derive(Default)]
struct BookingTables {
    bookings: HashMap<Uuid, Booking>,
    items: Vec<BookingItem>,
    assignments: HashMap<Uuid, Vec<AssignedUser>>,
    users: HashMap<Uuid, UserAccount>,
    payments: Vec<BookingPayment>,
    entries: Vec<TrackerEntry>,
    incentives: Vec<IncentiveEntry>,
    events: Vec<OutboxEvent>,
    commits: usize,
}

/// Booking store whose commit is all-or-nothing, like the Postgres transaction
pub struct InMemoryBookingStore {
    tables: Mutex<BookingTables>,
    coupons: Arc<InMemoryCouponStore>,
}

impl InMemoryBookingStore {
    pub fn new(coupons: Arc<InMemoryCouponStore>) -> Self {
        Self {
            tables: Mutex::new(BookingTables::default()),
            coupons,
        }
    }

    pub fn add_user(&self, email: &str, role_name: Option<&str>) -> UserAccount {
        let user = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            mobile: Some("9000000000".to_string()),
            role_name: role_name.map(str::to_string),
        };
        self.tables.lock().unwrap().users.insert(user.id, user.clone());
        user
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.tables.lock().unwrap().bookings.get(&id).cloned()
    }

    /// Overwrite a stored booking directly, bypassing the version check
    pub fn put_booking(&self, booking: Booking) {
        self.tables.lock().unwrap().bookings.insert(booking.id, booking);
    }

    pub fn items(&self, booking_id: Uuid) -> Vec<BookingItem> {
        self.tables
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|item| item.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn payments(&self, booking_id: Uuid) -> Vec<BookingPayment> {
        self.tables
            .lock()
            .unwrap()
            .payments
            .iter()
            .filter(|payment| payment.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn add_payment(&self, payment: BookingPayment) {
        self.tables.lock().unwrap().payments.push(payment);
    }

    pub fn entries(&self, booking_id: Uuid) -> Vec<TrackerEntry> {
        self.tables
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|entry| entry.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn incentives(&self, booking_id: Uuid) -> Vec<IncentiveEntry> {
        self.tables
            .lock()
            .unwrap()
            .incentives
            .iter()
            .filter(|incentive| incentive.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn events(&self, booking_id: Uuid) -> Vec<OutboxEvent> {
        self.tables
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|event| event.booking_id == booking_id)
            .cloned()
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.tables.lock().unwrap().commits
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_booking(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        Ok(self.booking(id))
    }

    async fn find_items(&self, booking_id: Uuid) -> BookingResult<Vec<BookingItem>> {
        Ok(self.items(booking_id))
    }

    async fn find_assignments(&self, booking_id: Uuid) -> BookingResult<Vec<AssignedUser>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .assignments
            .get(&booking_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_user(&self, user_id: Uuid) -> BookingResult<Option<UserAccount>> {
        Ok(self.tables.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn latest_payment(&self, booking_id: Uuid) -> BookingResult<Option<BookingPayment>> {
        // max_by_key keeps the last of equal keys, so later pushes win ties
        Ok(self
            .payments(booking_id)
            .into_iter()
            .max_by_key(|payment| payment.created_at))
    }

    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> BookingResult<Option<BookingPayment>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .payments
            .iter()
            .find(|payment| payment.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn find_actions(&self, booking_id: Uuid) -> BookingResult<Vec<TrackerEntry>> {
        let mut entries = self.entries(booking_id);
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn incentive_total(&self, booking_id: Uuid) -> BookingResult<Decimal> {
        Ok(self
            .incentives(booking_id)
            .iter()
            .map(|incentive| incentive.amount)
            .sum())
    }

    async fn count_ref_prefix(&self, prefix: &str) -> BookingResult<i64> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|booking| booking.ref_id.starts_with(prefix))
            .count() as i64)
    }

    async fn commit(&self, changes: BookingChangeSet) -> BookingResult<Booking> {
        let mut tables = self.tables.lock().unwrap();

        // every check runs before the first write
        let mut booking = changes.booking;
        match changes.expected_version {
            None => {
                if tables.bookings.contains_key(&booking.id) {
                    return Err(BookingError::ConcurrentModification);
                }
            }
            Some(expected) => {
                let current = tables
                    .bookings
                    .get(&booking.id)
                    .map(|stored| stored.version)
                    .ok_or_else(|| BookingError::not_found("booking", booking.id))?;
                if current != expected {
                    return Err(BookingError::ConcurrentModification);
                }
                booking.version = expected + 1;
                booking.updated_at = Utc::now();
            }
        }
        if let Some(redemption) = &changes.redemption {
            if self.coupons.would_duplicate(redemption) {
                return Err(BookingError::DuplicateRedemption);
            }
        }

        if let Some(redemption) = changes.redemption {
            self.coupons.redeem(redemption)?;
        }
        if let Some(items) = changes.replace_items {
            tables.items.retain(|item| item.booking_id != booking.id);
            tables.items.extend(items);
        }
        if let Some(assigned) = changes.replace_assignments {
            tables.assignments.insert(booking.id, assigned);
        }
        if let Some(payment) = changes.new_payment {
            tables.payments.push(payment);
        }
        if let Some(updated) = changes.updated_payment {
            if let Some(stored) = tables.payments.iter_mut().find(|p| p.id == updated.id) {
                *stored = updated;
            }
        }
        tables.entries.extend(changes.entries);
        tables.incentives.extend(changes.incentives);
        tables.events.extend(changes.events);
        tables.bookings.insert(booking.id, booking.clone());
        tables.commits += 1;

        Ok(booking)
    }
}

#[derive(Default)]
pub struct InMemoryOutboxStore {
    events: Mutex<Vec<OutboxEvent>>,
}

impl InMemoryOutboxStore {
    pub fn push(&self, event: OutboxEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn get(&self, id: Uuid) -> Option<OutboxEvent> {
        self.events.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    fn update(&self, id: Uuid, change: impl FnOnce(&mut OutboxEvent)) {
        if let Some(event) = self.events.lock().unwrap().iter_mut().find(|e| e.id == id) {
            change(event);
        }
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, NotificationError> {
        let mut events = self.events.lock().unwrap();
        let mut claimed = Vec::new();
        for event in events.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            let due = match event.status {
                OutboxStatus::Pending => event.available_at <= now,
                OutboxStatus::Processing => event.available_at <= stale_before,
                OutboxStatus::Sent | OutboxStatus::Dead => false,
            };
            if due {
                event.status = OutboxStatus::Processing;
                event.available_at = now;
                claimed.push(event.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_sent(&self, id: Uuid) -> Result<(), NotificationError> {
        self.update(id, |event| {
            event.status = OutboxStatus::Sent;
            event.sent_at = Some(Utc::now());
            event.last_error = None;
        });
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), NotificationError> {
        self.update(id, |event| {
            event.status = OutboxStatus::Pending;
            event.attempts = attempts;
            event.available_at = available_at;
            event.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn mark_dead(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), NotificationError> {
        self.update(id, |event| {
            event.status = OutboxStatus::Dead;
            event.attempts = attempts;
            event.last_error = Some(error.to_string());
        });
        Ok(())
    }
}

/// Fails the first `failures` sends, then delivers
pub struct FlakySender {
    remaining_failures: Mutex<u32>,
    delivered: Mutex<Vec<Uuid>>,
}

impl FlakySender {
    pub fn failing(failures: u32) -> Self {
        Self {
            remaining_failures: Mutex::new(failures),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<Uuid> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for FlakySender {
    async fn send(&self, event: &OutboxEvent) -> Result<(), NotificationError> {
        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(NotificationError::Rejected(503));
        }
        self.delivered.lock().unwrap().push(event.id);
        Ok(())
    }
}

/// Gateway double: hands out sequential link ids and reports whatever status a test sets
#[derive(Default)]
pub struct FakeGateway {
    links: Mutex<Vec<(Uuid, Decimal)>>,
    statuses: Mutex<HashMap<String, (String, Option<String>)>>,
    unavailable: Mutex<bool>,
}

impl FakeGateway {
    pub fn set_link_status(&self, link_id: &str, status: &str, payment_id: Option<&str>) {
        self.statuses.lock().unwrap().insert(
            link_id.to_string(),
            (status.to_string(), payment_id.map(str::to_string)),
        );
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn created_links(&self) -> Vec<(Uuid, Decimal)> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_link(
        &self,
        booking_id: Uuid,
        amount: Decimal,
        _contact: &PaymentContact,
    ) -> anyhow::Result<(PaymentLink, Value)> {
        if *self.unavailable.lock().unwrap() {
            anyhow::bail!("gateway unavailable");
        }
        let mut links = self.links.lock().unwrap();
        links.push((booking_id, amount));
        let id = format!("plink_{}", links.len());
        let raw = json!({
            "id": id,
            "short_url": format!("https://pay.test/{}", id),
            "status": "created",
        });
        Ok((
            PaymentLink {
                id: id.clone(),
                short_url: format!("https://pay.test/{}", id),
                status: "created".to_string(),
            },
            raw,
        ))
    }

    async fn fetch_link_status(&self, gateway_order_id: &str) -> anyhow::Result<LinkStatus> {
        if *self.unavailable.lock().unwrap() {
            anyhow::bail!("gateway unavailable");
        }
        let (status, payment_id) = self
            .statuses
            .lock()
            .unwrap()
            .get(gateway_order_id)
            .cloned()
            .unwrap_or_else(|| ("created".to_string(), None));
        Ok(LinkStatus {
            status: map_gateway_status(&status),
            gateway_payment_id: payment_id.clone(),
            raw: json!({ "id": gateway_order_id, "status": status, "payment_id": payment_id }),
        })
    }
}

#[derive(Default)]
pub struct FakeInvoices {
    requested: Mutex<Vec<Uuid>>,
    failing: Mutex<bool>,
}

impl FakeInvoices {
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn requested(&self) -> Vec<Uuid> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceGenerator for FakeInvoices {
    async fn generate(&self, booking_id: Uuid) -> anyhow::Result<()> {
        self.requested.lock().unwrap().push(booking_id);
        if *self.failing.lock().unwrap() {
            anyhow::bail!("renderer crashed");
        }
        Ok(())
    }
}

/// Empty policy table, so the cache serves the default role seeds
pub struct DefaultPolicySource;

#[async_trait]
impl RoleStatusPolicySource for DefaultPolicySource {
    async fn load(&self) -> BookingResult<Vec<(String, BookingStatus)>> {
        Ok(Vec::new())
    }
}

/// Every collaborator wired together around one service
pub struct Fixture {
    pub catalog: Arc<InMemoryCatalog>,
    pub coupons: Arc<InMemoryCouponStore>,
    pub store: Arc<InMemoryBookingStore>,
    pub gateway: Arc<FakeGateway>,
    pub invoices: Arc<FakeInvoices>,
    pub service: Arc<BookingService>,
}

impl Fixture {
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryCatalog::default());
        let coupons = Arc::new(InMemoryCouponStore::default());
        let store = Arc::new(InMemoryBookingStore::new(coupons.clone()));
        let gateway = Arc::new(FakeGateway::default());
        let invoices = Arc::new(FakeInvoices::default());
        let service = Arc::new(BookingService::new(
            store.clone(),
            catalog.clone(),
            coupons.clone(),
            Arc::new(CachedRolePolicy::new(Arc::new(DefaultPolicySource))),
            gateway.clone(),
            invoices.clone(),
        ));

        Self {
            catalog,
            coupons,
            store,
            gateway,
            invoices,
            service,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            bookings: self.service.clone(),
            coupons: self.coupons.clone(),
            auth: AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_string(),
            },
            payment_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        }
    }

    pub fn customer(&self) -> AuthenticatedUser {
        let user = self.store.add_user("customer@lab.test", None);
        AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            is_staff: false,
        }
    }

    pub fn staff(&self) -> AuthenticatedUser {
        let user = self.store.add_user("crm@lab.test", Some("CRM"));
        AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            is_staff: true,
        }
    }
}

pub fn bearer(user: &AuthenticatedUser) -> String {
    let token = TokenService::new(TEST_JWT_SECRET)
        .generate_access_token(user.user_id, &user.email, user.is_staff)
        .unwrap();
    format!("Bearer {}", token)
}

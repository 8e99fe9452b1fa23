use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::{ProductKind, ProductRef};
use crate::coupons::CouponEvaluator;
use crate::validation::{validate_non_blank, validate_non_negative_amount};

use super::calculator::{CalculationResult, ClientTotals};
use super::error::{BookingError, BookingResult};

/// Operational workflow state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Open,
    Verified,
    RootManager,
    FieldAgentAssigned,
    PaymentCollected,
    SampleCollected,
    ReportUploaded,
    HealthManagerAssigned,
    DietitianAssigned,
    Completed,
    Cancelled,
    Rescheduled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Open => "open",
            BookingStatus::Verified => "verified",
            BookingStatus::RootManager => "root_manager",
            BookingStatus::FieldAgentAssigned => "field_agent_assigned",
            BookingStatus::PaymentCollected => "payment_collected",
            BookingStatus::SampleCollected => "sample_collected",
            BookingStatus::ReportUploaded => "report_uploaded",
            BookingStatus::HealthManagerAssigned => "health_manager_assigned",
            BookingStatus::DietitianAssigned => "dietitian_assigned",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(BookingStatus::Open),
            "verified" => Ok(BookingStatus::Verified),
            "root_manager" => Ok(BookingStatus::RootManager),
            "field_agent_assigned" => Ok(BookingStatus::FieldAgentAssigned),
            "payment_collected" => Ok(BookingStatus::PaymentCollected),
            "sample_collected" => Ok(BookingStatus::SampleCollected),
            "report_uploaded" => Ok(BookingStatus::ReportUploaded),
            "health_manager_assigned" => Ok(BookingStatus::HealthManagerAssigned),
            "dietitian_assigned" => Ok(BookingStatus::DietitianAssigned),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "rescheduled" => Ok(BookingStatus::Rescheduled),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Customer-facing projection of the operational status
    pub fn customer_status(&self) -> CustomerStatus {
        match self {
            BookingStatus::Open | BookingStatus::Rescheduled => CustomerStatus::Registered,
            BookingStatus::Verified
            | BookingStatus::RootManager
            | BookingStatus::FieldAgentAssigned => CustomerStatus::Verified,
            BookingStatus::PaymentCollected => CustomerStatus::PaymentCollected,
            BookingStatus::SampleCollected => CustomerStatus::SampleCollected,
            BookingStatus::ReportUploaded
            | BookingStatus::HealthManagerAssigned
            | BookingStatus::DietitianAssigned => CustomerStatus::ReportUploaded,
            BookingStatus::Completed => CustomerStatus::Completed,
            BookingStatus::Cancelled => CustomerStatus::Cancelled,
        }
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Open
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simplified status shown to customers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Registered,
    Verified,
    PaymentCollected,
    SampleCollected,
    ReportUploaded,
    Completed,
    Cancelled,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Registered => "registered",
            CustomerStatus::Verified => "verified",
            CustomerStatus::PaymentCollected => "payment_collected",
            CustomerStatus::SampleCollected => "sample_collected",
            CustomerStatus::ReportUploaded => "report_uploaded",
            CustomerStatus::Completed => "completed",
            CustomerStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for CustomerStatus {
    fn default() -> Self {
        CustomerStatus::Registered
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NotRequired,
    Pending,
    Initiated,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotRequired => "not_required",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Online,
    Upi,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }

    /// Collected by the field agent on the spot rather than through a payment link
    pub fn is_in_person(&self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Upi | PaymentMethod::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate root of a customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub ref_id: String,
    pub user_id: Uuid,
    pub address_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub base_total: Decimal,
    pub offer_total: Decimal,
    pub discount_amount: Decimal,
    pub coupon_discount: Decimal,
    pub admin_discount: Decimal,
    pub final_amount: Decimal,
    pub total_savings: Decimal,
    pub initial_amount: Decimal,
    pub status: BookingStatus,
    pub customer_status: CustomerStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time_slot: Option<String>,
    pub remarks: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh booking in its initial states with zeroed totals
    pub fn new(user_id: Uuid, ref_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ref_id,
            user_id,
            address_id: None,
            coupon_id: None,
            base_total: Decimal::ZERO,
            offer_total: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            coupon_discount: Decimal::ZERO,
            admin_discount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
            total_savings: Decimal::ZERO,
            initial_amount: Decimal::ZERO,
            status: BookingStatus::Open,
            customer_status: CustomerStatus::Registered,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            scheduled_date: None,
            scheduled_time_slot: None,
            remarks: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy validated totals onto the booking
    ///
    /// The coupon discount is clamped to [0, base_total] here, and every derived
    /// field is recomputed from the stored components so the total-consistency
    /// invariant holds on whatever gets persisted.
    pub fn apply_totals(&mut self, result: &CalculationResult) {
        let coupon_discount = CouponEvaluator::clamp_to_base(result.coupon_discount, result.base_total);
        let offer_saving = result.base_total - result.offer_total;

        self.coupon_id = result.coupon_id;
        self.base_total = result.base_total;
        self.offer_total = result.offer_total;
        self.coupon_discount = coupon_discount;
        self.admin_discount = result.admin_discount;
        self.discount_amount = offer_saving + coupon_discount + result.admin_discount;
        self.final_amount = (self.base_total - self.discount_amount).max(Decimal::ZERO);
        self.total_savings = self.base_total - self.final_amount;
    }

    pub fn totals_are_consistent(&self) -> bool {
        let expected = (self.base_total
            - (self.base_total - self.offer_total)
            - self.coupon_discount
            - self.admin_discount)
            .max(Decimal::ZERO);
        self.final_amount == expected && self.total_savings == self.base_total - self.final_amount
    }
}

/// Priced snapshot of one product for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookingItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub patient_id: Uuid,
    pub lab_test_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub product_name: String,
    pub base_price: Decimal,
    pub offer_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl BookingItem {
    /// The single product this item references
    pub fn product(&self) -> BookingResult<ProductRef> {
        match (self.lab_test_id, self.profile_id, self.package_id) {
            (Some(id), None, None) => Ok(ProductRef::new(ProductKind::LabTest, id)),
            (None, Some(id), None) => Ok(ProductRef::new(ProductKind::LabProfile, id)),
            (None, None, Some(id)) => Ok(ProductRef::new(ProductKind::LabPackage, id)),
            _ => Err(BookingError::InvalidItemReference),
        }
    }
}

/// A staff member attached to a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AssignedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role_name: Option<String>,
}

impl AssignedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role_name
            .as_deref()
            .map(|own| own.eq_ignore_ascii_case(role))
            .unwrap_or(false)
    }
}

/// User record as seen by the booking workflow (agents and customers)
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile: Option<String>,
    pub role_name: Option<String>,
}

impl UserAccount {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn as_assigned(&self) -> AssignedUser {
        AssignedUser {
            user_id: self.id,
            email: self.email.clone(),
            role_name: self.role_name.clone(),
        }
    }
}

/// One requested line item
///
/// Accepts either `{product_type, product_id}` or the legacy
/// `{lab_test | profile | package}` shape; exactly one reference is allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ItemRequest {
    pub product_type: Option<String>,
    pub product_id: Option<Uuid>,
    pub lab_test: Option<Uuid>,
    pub profile: Option<Uuid>,
    pub package: Option<Uuid>,
    pub patient: Uuid,
}

impl ItemRequest {
    pub fn product_ref(&self) -> BookingResult<ProductRef> {
        let legacy: Vec<ProductRef> = [
            self.lab_test.map(|id| ProductRef::new(ProductKind::LabTest, id)),
            self.profile.map(|id| ProductRef::new(ProductKind::LabProfile, id)),
            self.package.map(|id| ProductRef::new(ProductKind::LabPackage, id)),
        ]
        .into_iter()
        .flatten()
        .collect();

        match (&self.product_type, self.product_id) {
            (None, None) => match legacy.as_slice() {
                [single] => Ok(*single),
                _ => Err(BookingError::InvalidItemReference),
            },
            (Some(kind), Some(id)) if legacy.is_empty() => {
                Ok(ProductRef::new(ProductKind::parse(kind)?, id))
            }
            (Some(kind), None) if legacy.is_empty() => {
                // an unknown kind is reported as such before the missing id
                ProductKind::parse(kind)?;
                Err(BookingError::InvalidItemReference)
            }
            _ => Err(BookingError::InvalidItemReference),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CalculationRequest {
    pub items: Vec<ItemRequest>,
    pub coupon: Option<Uuid>,
    #[validate(custom = "validate_non_negative_amount")]
    pub admin_discount: Option<Decimal>,
    pub base_total: Option<Decimal>,
    pub offer_total: Option<Decimal>,
    pub final_amount: Option<Decimal>,
}

impl CalculationRequest {
    pub fn client_totals(&self) -> ClientTotals {
        ClientTotals {
            base_total: self.base_total,
            offer_total: self.offer_total,
            final_amount: self.final_amount,
            admin_discount: self.admin_discount,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    /// Owner of the booking; only honoured for staff callers
    pub user: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<ItemRequest>,
    pub coupon: Option<Uuid>,
    #[validate(custom = "validate_non_negative_amount")]
    pub admin_discount: Option<Decimal>,
    pub base_total: Option<Decimal>,
    pub offer_total: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub address: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time_slot: Option<String>,
    pub remarks: Option<String>,
}

impl CreateBookingRequest {
    pub fn client_totals(&self) -> ClientTotals {
        ClientTotals {
            base_total: self.base_total,
            offer_total: self.offer_total,
            final_amount: self.final_amount,
            admin_discount: self.admin_discount,
        }
    }
}

/// The single mutation a CRM partial update performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    UpdateStatus,
    UpdateAgent,
    UpdatePayment,
    UpdateSchedule,
    UpdateAddress,
    UpdateItems,
    UpdateDiscounts,
    AddRemark,
    UploadDocument,
}

impl MutationKind {
    /// Allowed even after the booking reached a terminal status
    pub fn allowed_when_closed(&self) -> bool {
        matches!(self, MutationKind::AddRemark | MutationKind::UploadDocument)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookingMutationRequest {
    pub action_type: MutationKind,
    #[validate(custom = "validate_non_blank")]
    pub remarks: String,
    pub status: Option<BookingStatus>,
    pub agents: Option<Vec<Uuid>>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time_slot: Option<String>,
    pub address: Option<Uuid>,
    pub items: Option<Vec<ItemRequest>>,
    pub coupon: Option<Uuid>,
    #[validate(custom = "validate_non_negative_amount")]
    pub admin_discount: Option<Decimal>,
    pub base_total: Option<Decimal>,
    pub offer_total: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub document_url: Option<String>,
    pub expected_version: Option<i32>,
}

impl BookingMutationRequest {
    pub fn new(action_type: MutationKind, remarks: impl Into<String>) -> Self {
        Self {
            action_type,
            remarks: remarks.into(),
            status: None,
            agents: None,
            payment_method: None,
            payment_status: None,
            scheduled_date: None,
            scheduled_time_slot: None,
            address: None,
            items: None,
            coupon: None,
            admin_discount: None,
            base_total: None,
            offer_total: None,
            final_amount: None,
            document_url: None,
            expected_version: None,
        }
    }

    pub fn client_totals(&self) -> ClientTotals {
        ClientTotals {
            base_total: self.base_total,
            offer_total: self.offer_total,
            final_amount: self.final_amount,
            admin_discount: self.admin_discount,
        }
    }
}

/// Sub-actions of a bulk edit; always applied in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    UpdateItems,
    UpdateDiscounts,
    UpdateAddress,
    UpdateSchedule,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::UpdateItems => "update_items",
            BulkAction::UpdateDiscounts => "update_discounts",
            BulkAction::UpdateAddress => "update_address",
            BulkAction::UpdateSchedule => "update_schedule",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, message = "At least one action is required"))]
    pub actions: Vec<BulkAction>,
    #[validate(custom = "validate_non_blank")]
    pub remarks: String,
    pub items: Option<Vec<ItemRequest>>,
    pub coupon: Option<Uuid>,
    #[validate(custom = "validate_non_negative_amount")]
    pub admin_discount: Option<Decimal>,
    pub base_total: Option<Decimal>,
    pub offer_total: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub address: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time_slot: Option<String>,
    pub expected_version: Option<i32>,
}

impl BulkUpdateRequest {
    pub fn client_totals(&self) -> ClientTotals {
        ClientTotals {
            base_total: self.base_total,
            offer_total: self.offer_total,
            final_amount: self.final_amount,
            admin_discount: self.admin_discount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientAction {
    Reschedule,
    Cancel,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClientBookingRequest {
    pub action: ClientAction,
    pub remarks: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time_slot: Option<String>,
}

/// Booking with its items and assigned staff
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub items: Vec<BookingItem>,
    pub assigned_users: Vec<AssignedUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            BookingStatus::Open,
            BookingStatus::FieldAgentAssigned,
            BookingStatus::HealthManagerAssigned,
            BookingStatus::Rescheduled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::from_str("shipped").is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let value = serde_json::to_value(BookingStatus::DietitianAssigned).unwrap();
        assert_eq!(value, "dietitian_assigned");
    }

    #[test]
    fn test_customer_projection() {
        assert_eq!(BookingStatus::Rescheduled.customer_status(), CustomerStatus::Registered);
        assert_eq!(BookingStatus::RootManager.customer_status(), CustomerStatus::Verified);
        assert_eq!(
            BookingStatus::DietitianAssigned.customer_status(),
            CustomerStatus::ReportUploaded
        );
        assert_eq!(
            BookingStatus::PaymentCollected.customer_status(),
            CustomerStatus::PaymentCollected
        );
        assert_eq!(BookingStatus::Cancelled.customer_status(), CustomerStatus::Cancelled);
    }

    #[test]
    fn test_in_person_methods() {
        assert!(PaymentMethod::Cash.is_in_person());
        assert!(PaymentMethod::Upi.is_in_person());
        assert!(PaymentMethod::Card.is_in_person());
        assert!(!PaymentMethod::Online.is_in_person());
        assert!(!PaymentMethod::Other.is_in_person());
    }

    fn item_request() -> ItemRequest {
        ItemRequest {
            patient: Uuid::new_v4(),
            ..Default::default()
        }
    }

    #[test]
    fn test_typed_item_reference() {
        let id = Uuid::new_v4();
        let request = ItemRequest {
            product_type: Some("lab_profile".to_string()),
            product_id: Some(id),
            ..item_request()
        };
        assert_eq!(
            request.product_ref().unwrap(),
            ProductRef::new(ProductKind::LabProfile, id)
        );
    }

    #[test]
    fn test_legacy_item_reference() {
        let id = Uuid::new_v4();
        let request = ItemRequest {
            package: Some(id),
            ..item_request()
        };
        assert_eq!(
            request.product_ref().unwrap(),
            ProductRef::new(ProductKind::LabPackage, id)
        );
    }

    #[test]
    fn test_zero_references_rejected() {
        assert!(matches!(
            item_request().product_ref(),
            Err(BookingError::InvalidItemReference)
        ));
    }

    #[test]
    fn test_two_legacy_references_rejected() {
        let request = ItemRequest {
            lab_test: Some(Uuid::new_v4()),
            profile: Some(Uuid::new_v4()),
            ..item_request()
        };
        assert!(matches!(
            request.product_ref(),
            Err(BookingError::InvalidItemReference)
        ));
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let request = ItemRequest {
            product_type: Some("lab_test".to_string()),
            product_id: Some(Uuid::new_v4()),
            package: Some(Uuid::new_v4()),
            ..item_request()
        };
        assert!(matches!(
            request.product_ref(),
            Err(BookingError::InvalidItemReference)
        ));
    }

    #[test]
    fn test_unknown_product_type_rejected() {
        let request = ItemRequest {
            product_type: Some("scan".to_string()),
            product_id: Some(Uuid::new_v4()),
            ..item_request()
        };
        assert!(matches!(
            request.product_ref(),
            Err(BookingError::InvalidProductKind(_))
        ));
    }

    #[test]
    fn test_stored_item_product() {
        let item = BookingItem {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            lab_test_id: None,
            profile_id: Some(Uuid::new_v4()),
            package_id: Some(Uuid::new_v4()),
            product_name: "Thyroid".to_string(),
            base_price: Decimal::ONE,
            offer_price: Decimal::ONE,
            created_at: Utc::now(),
        };
        assert!(item.product().is_err());
    }

    #[test]
    fn test_assigned_role_match_is_case_insensitive() {
        let user = AssignedUser {
            user_id: Uuid::new_v4(),
            email: "phlebo@lab.test".to_string(),
            role_name: Some("Phlebo".to_string()),
        };
        assert!(user.has_role("phlebo"));
        assert!(!user.has_role("Dietitian"));
    }
}

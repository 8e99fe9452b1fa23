// Booking calculation engine
// Recomputes every monetary total from authoritative prices and checks the
// caller's claimed totals against them. Nothing here persists anything.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::{resolve_price, ProductCatalog, ProductKind, ProductRef};
use crate::coupons::{Coupon, CouponEvaluator, CouponStore};

use super::error::{BookingError, BookingResult};
use super::models::{BookingItem, ItemRequest};

/// Absolute allowance between server and client totals, inclusive
pub const TOTAL_TOLERANCE: Decimal = Decimal::ONE;

/// Totals claimed by the caller; missing values count as zero
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientTotals {
    pub base_total: Option<Decimal>,
    pub offer_total: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub admin_discount: Option<Decimal>,
}

/// A resolved line: product, patient and the prices it is booked at
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricedLine {
    pub product_type: ProductKind,
    pub product_id: Uuid,
    #[serde(skip)]
    pub product_name: String,
    pub patient: Uuid,
    pub base_price: Decimal,
    pub offer_price: Decimal,
}

impl PricedLine {
    pub fn product(&self) -> ProductRef {
        ProductRef::new(self.product_type, self.product_id)
    }

    /// Reuse the prices captured on a stored item
    pub fn from_item(item: &BookingItem) -> BookingResult<Self> {
        let product = item.product()?;
        Ok(Self {
            product_type: product.kind,
            product_id: product.id,
            product_name: item.product_name.clone(),
            patient: item.patient_id,
            base_price: item.base_price,
            offer_price: item.offer_price,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalculationResult {
    pub base_total: Decimal,
    pub offer_total: Decimal,
    pub coupon_discount: Decimal,
    pub admin_discount: Decimal,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
    pub coupon_id: Option<Uuid>,
    pub items: Vec<PricedLine>,
    #[serde(skip)]
    pub coupon: Option<Coupon>,
}

/// Engine entry points; prices come from the catalog, coupons from the coupon store
pub struct BookingCalculator {
    catalog: Arc<dyn ProductCatalog>,
    coupons: Arc<dyn CouponStore>,
}

impl BookingCalculator {
    pub fn new(catalog: Arc<dyn ProductCatalog>, coupons: Arc<dyn CouponStore>) -> Self {
        Self { catalog, coupons }
    }

    /// Price the requested items against the live catalog and validate the client totals
    pub async fn calculate(
        &self,
        client: &ClientTotals,
        items: &[ItemRequest],
        coupon_id: Option<Uuid>,
    ) -> BookingResult<CalculationResult> {
        // reference shape errors are reported before any catalog lookup
        let products = items
            .iter()
            .map(|item| item.product_ref())
            .collect::<BookingResult<Vec<_>>>()?;

        let mut lines = Vec::with_capacity(items.len());
        for (item, product) in items.iter().zip(products) {
            let price = resolve_price(self.catalog.as_ref(), product).await?;
            lines.push(PricedLine {
                product_type: product.kind,
                product_id: product.id,
                product_name: price.name,
                patient: item.patient,
                base_price: price.base_price,
                offer_price: price.offer_price,
            });
        }

        self.finish(client, lines, coupon_id).await
    }

    /// Re-run coupon, discount and cross-check steps on already priced lines
    pub async fn recalculate_snapshot(
        &self,
        client: &ClientTotals,
        lines: Vec<PricedLine>,
        coupon_id: Option<Uuid>,
    ) -> BookingResult<CalculationResult> {
        self.finish(client, lines, coupon_id).await
    }

    async fn finish(
        &self,
        client: &ClientTotals,
        lines: Vec<PricedLine>,
        coupon_id: Option<Uuid>,
    ) -> BookingResult<CalculationResult> {
        let base_total: Decimal = lines.iter().map(|line| line.base_price).sum();
        let offer_total: Decimal = lines.iter().map(|line| line.offer_price).sum();

        let (coupon, coupon_discount) = match coupon_id {
            Some(id) => {
                let coupon = self
                    .coupons
                    .find_by_id(id)
                    .await?
                    .ok_or(BookingError::CouponNotFound)?;
                if !coupon.is_valid_now() {
                    return Err(BookingError::CouponExpiredOrInactive);
                }
                let discount = CouponEvaluator::discount_for(&coupon, base_total);
                (Some(coupon), discount)
            }
            None => (None, Decimal::ZERO),
        };

        // stored as NUMERIC(12,2); rounding here keeps final_amount consistent with the row
        let admin_discount = client
            .admin_discount
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if admin_discount < Decimal::ZERO || admin_discount > base_total {
            return Err(BookingError::InvalidAdminDiscount {
                admin_discount,
                base_total,
            });
        }

        let (total_discount, final_amount) =
            compute_totals(base_total, offer_total, coupon_discount, admin_discount);

        check_tolerance("base_total", base_total, client.base_total)?;
        check_tolerance("offer_total", offer_total, client.offer_total)?;
        check_tolerance("final_amount", final_amount, client.final_amount)?;

        debug!(
            "Calculated booking totals: base={}, offer={}, coupon={}, admin={}, final={}",
            base_total, offer_total, coupon_discount, admin_discount, final_amount
        );

        Ok(CalculationResult {
            base_total,
            offer_total,
            coupon_discount,
            admin_discount,
            total_discount,
            final_amount,
            coupon_id: coupon.as_ref().map(|c| c.id),
            items: lines,
            coupon,
        })
    }
}

/// (total_discount, final_amount) for the given components
pub fn compute_totals(
    base_total: Decimal,
    offer_total: Decimal,
    coupon_discount: Decimal,
    admin_discount: Decimal,
) -> (Decimal, Decimal) {
    let total_discount = (base_total - offer_total) + coupon_discount + admin_discount;
    let final_amount = (base_total - total_discount).max(Decimal::ZERO);
    (total_discount, final_amount)
}

pub fn check_tolerance(
    field: &'static str,
    server_value: Decimal,
    client_value: Option<Decimal>,
) -> BookingResult<()> {
    let client_value = client_value.unwrap_or(Decimal::ZERO);
    let within_tolerance = server_value
        .checked_sub(client_value)
        .map(|difference| difference.abs() <= TOTAL_TOLERANCE)
        .unwrap_or(false);
    if !within_tolerance {
        debug!(
            "Total mismatch on {}: server={}, client={}",
            field, server_value, client_value
        );
        return Err(BookingError::TotalMismatch {
            field,
            server_value,
            client_value,
        });
    }
    Ok(())
}

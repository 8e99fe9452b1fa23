use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::bookings::BookingError;

/// The three bookable product families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    LabTest,
    LabProfile,
    LabPackage,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::LabTest => "lab_test",
            ProductKind::LabProfile => "lab_profile",
            ProductKind::LabPackage => "lab_package",
        }
    }

    /// Parse a client-supplied product type; anything else is InvalidProductKind
    pub fn parse(value: &str) -> Result<Self, BookingError> {
        match value.trim().to_lowercase().as_str() {
            "lab_test" => Ok(ProductKind::LabTest),
            "lab_profile" => Ok(ProductKind::LabProfile),
            "lab_package" => Ok(ProductKind::LabPackage),
            _ => Err(BookingError::InvalidProductKind(value.to_string())),
        }
    }

    pub(crate) fn table_name(&self) -> &'static str {
        match self {
            ProductKind::LabTest => "lab_tests",
            ProductKind::LabProfile => "lab_profiles",
            ProductKind::LabPackage => "lab_packages",
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductRef {
    pub kind: ProductKind,
    pub id: Uuid,
}

impl ProductRef {
    pub fn new(kind: ProductKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// Raw catalog row; either price may be unset
#[derive(Debug, Clone, FromRow)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Option<Decimal>,
    pub offer_price: Option<Decimal>,
}

/// Effective prices of one product at the time of resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub name: String,
    pub base_price: Decimal,
    pub offer_price: Decimal,
}

impl From<CatalogProduct> for ResolvedPrice {
    /// A missing price counts as zero; a missing or zero offer falls back to the base price
    fn from(product: CatalogProduct) -> Self {
        let base_price = product.price.unwrap_or(Decimal::ZERO);
        let offer_price = product
            .offer_price
            .filter(|offer| !offer.is_zero())
            .unwrap_or(base_price);

        Self {
            name: product.name,
            base_price,
            offer_price,
        }
    }
}

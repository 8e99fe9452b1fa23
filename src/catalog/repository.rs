use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::bookings::{BookingError, BookingResult};

use super::models::{CatalogProduct, ProductRef, ResolvedPrice};

/// Read access to the product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, product: ProductRef) -> BookingResult<Option<CatalogProduct>>;
}

/// Resolve a product reference to its effective prices
pub async fn resolve_price(
    catalog: &dyn ProductCatalog,
    product: ProductRef,
) -> BookingResult<ResolvedPrice> {
    let row = catalog
        .find_product(product)
        .await?
        .ok_or(BookingError::ProductNotFound {
            kind: product.kind,
            id: product.id,
        })?;

    Ok(ResolvedPrice::from(row))
}

pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn find_product(&self, product: ProductRef) -> BookingResult<Option<CatalogProduct>> {
        debug!("Resolving {} {}", product.kind, product.id);

        // table name comes from a closed enum, never from input
        let sql = format!(
            "SELECT id, name, price, offer_price FROM {} WHERE id = $1",
            product.kind.table_name()
        );

        let row = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(product.id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}

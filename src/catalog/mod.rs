// Product catalog module
// Resolves lab tests, profiles and packages to their current prices

pub mod models;
pub mod repository;

pub use models::{CatalogProduct, ProductKind, ProductRef, ResolvedPrice};
pub use repository::{resolve_price, PgProductCatalog, ProductCatalog};

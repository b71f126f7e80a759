//! # Product Commands
//!
//! Catalog search and maintenance.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Seller types "sug"                                                     │
//! │       │                                                                 │
//! │       ├── list_catalog ──► CatalogState cache (no database round trip)  │
//! │       │                                                                 │
//! │       └── search_products ──► products WHERE name/sku LIKE '%sug%'      │
//! │                                                                         │
//! │  Both return ProductDto with the discounted shelf price and stock flags │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits go through the product's version: an edit based on a stale read is
//! rejected with `CONFLICT` instead of overwriting a concurrent sale.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CatalogState, ConfigState, DbState};
use duka_core::pricing::effective_price;
use duka_core::validation::{validate_new_product, validate_patch, validate_product, validate_search_query};
use duka_core::{Money, NewProduct, Product, ProductPatch};

/// Product as the register UI shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub buy_price: Money,
    pub sell_price: Money,
    /// Shelf price after discount.
    pub effective_price: Money,
    pub discount_bps: Option<u32>,
    pub quantity: i64,
    pub min_threshold: i64,
    pub in_stock: bool,
    pub low_stock: bool,
    /// Send back unchanged with an edit.
    pub version: i64,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            effective_price: effective_price(&p),
            in_stock: p.is_in_stock(),
            low_stock: p.is_low_stock(),
            id: p.id,
            sku: p.sku,
            name: p.name,
            category: p.category,
            buy_price: p.buy_price,
            sell_price: p.sell_price,
            discount_bps: p.discount_bps,
            quantity: p.quantity,
            min_threshold: p.min_threshold,
            version: p.version,
        }
    }
}

/// Searches the catalog by name or SKU.
///
/// ## Arguments
/// * `query` - Search term; empty lists everything
/// * `limit` - Maximum results to return (default: 20, max: 100)
pub async fn search_products(
    db: &DbState,
    config: &ConfigState,
    query: String,
    limit: Option<u32>,
) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(&query)?;
    let limit = limit.unwrap_or(20).min(100);

    debug!(query = %query, limit, "search_products command");

    let products = db.inner().products().search(&config.shop_id, &query, limit).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        query = %query,
        "search_products complete"
    );

    Ok(dtos)
}

/// Filters the in-memory catalog; for search-as-you-type.
pub fn list_catalog(catalog: &CatalogState, query: String, limit: Option<usize>) -> Vec<ProductDto> {
    catalog
        .filter(&query, limit.unwrap_or(50))
        .into_iter()
        .map(ProductDto::from)
        .collect()
}

pub async fn get_product(db: &DbState, config: &ConfigState, id: String) -> Result<ProductDto, ApiError> {
    debug!(id = %id, "get_product command");
    let product = db
        .inner()
        .products()
        .get_by_id(&config.shop_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(ProductDto::from(product))
}

pub async fn get_product_by_sku(
    db: &DbState,
    config: &ConfigState,
    sku: String,
) -> Result<ProductDto, ApiError> {
    debug!(sku = %sku, "get_product_by_sku command");
    let product = db
        .inner()
        .products()
        .get_by_sku(&config.shop_id, sku.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &sku))?;
    Ok(ProductDto::from(product))
}

pub async fn create_product(
    db: &DbState,
    config: &ConfigState,
    input: NewProduct,
) -> Result<ProductDto, ApiError> {
    debug!(name = %input.name, sku = %input.sku, "create_product command");

    validate_new_product(&input)?;
    let product = input.into_product(&config.shop_id, Utc::now());
    let stored = db.inner().products().insert(&product).await?;

    Ok(ProductDto::from(stored))
}

/// Applies a partial edit to the product as it was at `version`.
pub async fn edit_product(
    db: &DbState,
    config: &ConfigState,
    id: String,
    version: i64,
    patch: ProductPatch,
) -> Result<ProductDto, ApiError> {
    debug!(id = %id, version, "edit_product command");

    validate_patch(&patch)?;
    let mut product = db
        .inner()
        .products()
        .get_by_id(&config.shop_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    product.version = version;
    patch.apply(&mut product);
    product.updated_at = Utc::now();
    validate_product(&product)?;

    let stored = db.inner().products().update(&product).await?;
    Ok(ProductDto::from(stored))
}

/// Removes a product from the catalog. Its past sales are kept.
pub async fn delete_product(db: &DbState, config: &ConfigState, id: String) -> Result<(), ApiError> {
    debug!(id = %id, "delete_product command");
    db.inner().products().delete(&config.shop_id, &id).await?;
    Ok(())
}

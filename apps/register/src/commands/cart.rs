//! # Cart Commands
//!
//! Cart manipulation for the active seller session.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│  Sales   │       │
//! │  │  Cart    │     │          │     │ (commit) │     │ +Receipt │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                 add_single_unit     STOCK_CONFLICT                      │
//! │                 add_pack                 │                              │
//! │                 update_quantity          ▼                              │
//! │                 remove_line         review_cart ──► back to In Cart     │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stock check runs against the product row as it is in the database
//! right now, not against the catalog cache.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use duka_core::cart::ReviewIssue;
use duka_core::pricing::default_pack_price;
use duka_core::{Cart, CartLineItem, CartTotals, Money, Product, UnitType};

/// Cart response including lines and totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLineItem>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            lines: cart.lines().cloned().collect(),
            totals: cart.totals(),
        }
    }
}

/// A pack chosen in the pack dialog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPackRequest {
    pub product_id: String,
    pub unit_type: UnitType,
    pub units_per_pack: i64,
    /// Default: shelf price times pack size.
    pub price_per_pack: Option<Money>,
    #[serde(default = "one")]
    pub pack_quantity: i64,
}

fn one() -> i64 {
    1
}

/// Cart after a review, plus the products that still need the seller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub cart: CartResponse,
    pub issues: Vec<ReviewIssue>,
}

async fn fetch_product(db: &DbState, config: &ConfigState, product_id: &str) -> Result<Product, ApiError> {
    db.inner()
        .products()
        .get_by_id(&config.shop_id, product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))
}

/// Gets the current cart contents.
pub fn get_cart(cart: &CartState) -> CartResponse {
    debug!("get_cart command");
    cart.with_cart(|c| CartResponse::from(c))
}

/// Adds one base unit of a product.
///
/// ## Errors
/// - `OUT_OF_STOCK` when nothing is on hand
/// - `STOCK_EXCEEDED` when the cart already holds every unit
pub async fn add_single_unit(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    product_id: String,
) -> Result<CartResponse, ApiError> {
    debug!(product_id = %product_id, "add_single_unit command");

    let product = fetch_product(db, config, &product_id).await?;
    cart.with_cart_mut(|c| c.add_single_unit(&product))?;

    Ok(get_cart(cart))
}

/// Adds `pack_quantity` packs (a dozen, a crate, a carton, ...).
///
/// ```text
/// ┌─────────────────────────────────────────────────┐
/// │  Soda 500ml            10 on hand, 0 in cart    │
/// │  Unit: [Dozen]  Units/pack: [12]  Qty: [1]      │
/// │  Price/pack: [KSh 150.00]                       │
/// │                                                 │
/// │  ✗ Not enough stock: 2 short (max 0)            │
/// └─────────────────────────────────────────────────┘
/// ```
pub async fn add_pack(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    request: AddPackRequest,
) -> Result<CartResponse, ApiError> {
    debug!(
        product_id = %request.product_id,
        unit_type = %request.unit_type,
        units_per_pack = request.units_per_pack,
        pack_quantity = request.pack_quantity,
        "add_pack command"
    );

    let product = fetch_product(db, config, &request.product_id).await?;
    let price_per_pack = request
        .price_per_pack
        .unwrap_or_else(|| default_pack_price(&product, request.units_per_pack));

    cart.with_cart_mut(|c| {
        c.add_pack(
            &product,
            request.unit_type,
            request.units_per_pack,
            price_per_pack,
            request.pack_quantity,
        )
    })?;

    Ok(get_cart(cart))
}

/// Sets a line's pack quantity. Zero or less removes the line, even when the
/// product has since been deleted.
pub async fn update_quantity(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    line_id: String,
    pack_quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(line_id = %line_id, pack_quantity, "update_quantity command");

    if pack_quantity <= 0 {
        cart.with_cart_mut(|c| c.remove_line_item(&line_id))?;
        return Ok(get_cart(cart));
    }

    let product_id = cart
        .with_cart(|c| c.get(&line_id).map(|l| l.product.product_id.clone()))
        .ok_or_else(|| ApiError::not_found("Cart line", &line_id))?;
    let product = fetch_product(db, config, &product_id).await?;

    cart.with_cart_mut(|c| c.update_quantity(&line_id, pack_quantity, &product))?;

    Ok(get_cart(cart))
}

pub fn remove_line(cart: &CartState, line_id: String) -> Result<CartResponse, ApiError> {
    debug!(line_id = %line_id, "remove_line command");
    cart.with_cart_mut(|c| c.remove_line_item(&line_id))?;
    Ok(get_cart(cart))
}

pub fn clear_cart(cart: &CartState) -> CartResponse {
    debug!("clear_cart command");
    cart.clear();
    get_cart(cart)
}

/// Re-checks every cart product against the database after a
/// `STOCK_CONFLICT`. Products that still fit are re-stamped so the next
/// checkout can pass.
pub async fn review_cart(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
) -> Result<ReviewResponse, ApiError> {
    let product_ids = cart.with_cart(|c| c.product_ids());
    debug!(products = product_ids.len(), "review_cart command");

    let mut fresh = Vec::with_capacity(product_ids.len());
    for product_id in &product_ids {
        if let Some(product) = db.inner().products().get_by_id(&config.shop_id, product_id).await? {
            fresh.push(product);
        }
    }

    let issues = cart.with_cart_mut(|c| Ok(c.review(&fresh)))?;

    Ok(ReviewResponse {
        cart: get_cart(cart),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{setup, stock};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_pack_rejected_when_short() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let soda = stock(&db, "Soda 500ml", 1000, 1500, 10).await;

        let err = add_pack(
            &db,
            &cart,
            &config,
            AddPackRequest {
                product_id: soda.id.clone(),
                unit_type: UnitType::dozen(),
                units_per_pack: 12,
                price_per_pack: None,
                pack_quantity: 1,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::StockExceeded);
        assert_eq!(err.max_allowed, Some(0));
        assert!(get_cart(&cart).lines.is_empty());
    }

    #[tokio::test]
    async fn test_pack_price_defaults_to_shelf_price() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let eggs = stock(&db, "Eggs", 1200, 1500, 30).await;

        let response = add_pack(
            &db,
            &cart,
            &config,
            AddPackRequest {
                product_id: eggs.id.clone(),
                unit_type: UnitType::new("Tray"),
                units_per_pack: 30,
                price_per_pack: None,
                pack_quantity: 1,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.totals.total_units, 30);
        assert_eq!(response.totals.total, Money::from_minor(45_000));
    }

    #[tokio::test]
    async fn test_ceiling_spans_singles_and_packs() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let soda = stock(&db, "Soda 500ml", 1000, 1500, 13).await;

        add_pack(
            &db,
            &cart,
            &config,
            AddPackRequest {
                product_id: soda.id.clone(),
                unit_type: UnitType::dozen(),
                units_per_pack: 12,
                price_per_pack: Some(Money::from_minor(16_000)),
                pack_quantity: 1,
            },
        )
        .await
        .unwrap();
        add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap();

        let err = add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StockExceeded);
        assert_eq!(get_cart(&cart).totals.total_units, 13);
    }

    #[tokio::test]
    async fn test_update_quantity_and_remove() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let soda = stock(&db, "Soda 500ml", 1000, 1500, 5).await;

        let response = add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap();
        let line_id = response.lines[0].line_id.clone();

        let err = update_quantity(&db, &cart, &config, line_id.clone(), 6).await.unwrap_err();
        assert_eq!(err.max_allowed, Some(5));

        let response = update_quantity(&db, &cart, &config, line_id.clone(), 5).await.unwrap();
        assert_eq!(response.totals.total_units, 5);

        // product deleted underneath: zero still removes the line
        db.inner().products().delete("shop-1", &soda.id).await.unwrap();
        let response = update_quantity(&db, &cart, &config, line_id, 0).await.unwrap();
        assert!(response.lines.is_empty());
    }

    #[tokio::test]
    async fn test_review_reports_short_and_missing() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let soda = stock(&db, "Soda 500ml", 1000, 1500, 5).await;
        let bread = stock(&db, "Bread", 4000, 5500, 3).await;

        for _ in 0..4 {
            add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap();
        }
        add_single_unit(&db, &cart, &config, bread.id.clone()).await.unwrap();

        db.inner().products().adjust_stock("shop-1", &soda.id, -3).await.unwrap();
        db.inner().products().delete("shop-1", &bread.id).await.unwrap();

        let review = review_cart(&db, &cart, &config).await.unwrap();
        assert_eq!(review.issues.len(), 2);
        assert!(review.issues.iter().any(|i| matches!(
            i,
            ReviewIssue::Short { available: 2, reserved: 4, .. }
        )));
        assert!(review
            .issues
            .iter()
            .any(|i| matches!(i, ReviewIssue::Missing { .. })));
        // nothing is dropped for the seller
        assert_eq!(review.cart.totals.total_units, 5);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let err = add_single_unit(&db, &cart, &config, "nope".to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}

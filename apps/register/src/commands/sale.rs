//! # Sale Commands
//!
//! Checkout and sale history.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout                                             │
//! │                                                                         │
//! │  cart (copy) ──► duka_core::checkout::settle ──► Settlement             │
//! │                        │                          (sales, decrements,   │
//! │                        │                           receipt)             │
//! │                        ▼                                                │
//! │            db.settlements().commit  ── one transaction ──               │
//! │                        │                                                │
//! │          ┌─────────────┴──────────────┐                                 │
//! │          ▼                            ▼                                 │
//! │   OK: clear cart slot,         STOCK_CONFLICT: cart kept,               │
//! │       return Receipt           seller runs review_cart                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payment method is attested by the seller and never verified.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use duka_core::aggregation::day_bounds;
use duka_core::checkout::{settle, CheckoutContext};
use duka_core::{PaymentMethod, Receipt, Sale};
use duka_db::SaleFilter;

/// Settles the cart and records every line as a sale.
///
/// Returns `None` for an empty cart. On any error the cart is kept as it
/// was, so the seller can review and retry.
pub async fn checkout(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    payment_method: PaymentMethod,
) -> Result<Option<Receipt>, ApiError> {
    debug!(payment_method = %payment_method, "checkout command");

    let settled = cart.with_cart(|c| c.clone());
    let ctx = CheckoutContext {
        shop_id: config.shop_id.clone(),
        shop_name: config.shop_name.clone(),
        seller: config.seller(),
        payment_method,
        now: Utc::now(),
        offset: config.offset(),
    };

    let Some(settlement) = settle(&settled, &ctx) else {
        debug!("Checkout of an empty cart, nothing to do");
        return Ok(None);
    };

    if let Err(e) = db.inner().settlements().commit(&config.shop_id, &settlement).await {
        warn!(receipt_id = %settlement.receipt_id, error = %e, "Checkout failed, cart kept");
        return Err(e.into());
    }

    cart.clear_if_unchanged(&settled);

    info!(
        receipt_id = %settlement.receipt_id,
        lines = settlement.sales.len(),
        total = %config.format_currency(settlement.total()),
        "Checkout complete"
    );
    Ok(Some(settlement.receipt))
}

/// Deletes one sale and puts its units back on the shelf.
pub async fn delete_sale(db: &DbState, config: &ConfigState, sale_id: String) -> Result<Sale, ApiError> {
    debug!(sale_id = %sale_id, "delete_sale command");
    Ok(db.inner().sales().delete(&config.shop_id, &sale_id).await?)
}

/// All sales of one receipt, in line order.
pub async fn receipt_sales(
    db: &DbState,
    config: &ConfigState,
    receipt_id: String,
) -> Result<Vec<Sale>, ApiError> {
    let sales = db
        .inner()
        .sales()
        .list(&config.shop_id, &SaleFilter::receipt(receipt_id.clone()))
        .await?;
    if sales.is_empty() {
        return Err(ApiError::not_found("Receipt", &receipt_id));
    }
    Ok(sales)
}

/// Sales of one local business day.
pub async fn sales_for_day(
    db: &DbState,
    config: &ConfigState,
    date: NaiveDate,
) -> Result<Vec<Sale>, ApiError> {
    let (from, to) = day_bounds(date, date, config.offset());
    Ok(db
        .inner()
        .sales()
        .list(&config.shop_id, &SaleFilter::between(from, to))
        .await?)
}

//! # Checkout / Settlement
//!
//! Turns a cart into sale records, stock decrements and a receipt.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart (N lines)                                                         │
//! │     │                                                                   │
//! │     ▼  settle()  ← pure, this module                                    │
//! │  Settlement                                                             │
//! │     ├── sales[N]        one Sale per line, shared receipt_id/timestamp │
//! │     ├── decrements[N]   one per Sale, with the version the line saw    │
//! │     └── receipt         projection of the whole cart                   │
//! │     │                                                                   │
//! │     ▼  duka-db SettlementRepository::commit()                           │
//! │  BEGIN                                                                  │
//! │     UPDATE products ... WHERE id = ? AND version = ?   (per product)   │
//! │     INSERT INTO sales ...                              (per line)      │
//! │  COMMIT  ──► cart cleared by the session                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per line:
//! ```text
//! total_units = pack_quantity × units_per_pack
//! total_price = pack_quantity × price_per_pack
//! total_cost  = buy_price × total_units
//! profit      = total_price − total_cost
//! unit_price  = price_per_pack ÷ units_per_pack   (display only)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::cart::{Cart, CartLineItem};
use crate::money::Money;
use crate::types::{PaymentMethod, Sale, SaleMetadata, Seller, UnitType};

// =============================================================================
// Inputs
// =============================================================================

/// Everything a checkout needs besides the cart.
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    pub shop_id: String,
    pub shop_name: String,
    pub seller: Seller,
    pub payment_method: PaymentMethod,
    pub now: DateTime<Utc>,
    /// Offset of the shop's local time, for receipt ids and dates.
    pub offset: FixedOffset,
}

// =============================================================================
// Outputs
// =============================================================================

/// Reduce a product's stock by the units of one sale.
///
/// `expected_version` is the product version the cart line was validated
/// against; the store applies the decrement only if it still matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDecrement {
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub units: i64,
    pub expected_version: i64,
}

/// All decrements of one product within a checkout, summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDecrement {
    pub product_id: String,
    pub product_name: String,
    pub units: i64,
    pub expected_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub product_name: String,
    pub unit_type: UnitType,
    pub units_per_pack: i64,
    pub pack_quantity: i64,
    pub price_per_pack: Money,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Printable projection of a completed checkout. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub shop_name: String,
    pub receipt_id: String,
    /// Local date and time, `YYYY-MM-DD HH:MM`.
    pub date: String,
    pub items: Vec<ReceiptItem>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub seller_name: String,
}

/// The result of settling a cart, ready to be committed atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub receipt_id: String,
    pub timestamp: DateTime<Utc>,
    pub sales: Vec<Sale>,
    pub decrements: Vec<StockDecrement>,
    pub receipt: Receipt,
}

impl Settlement {
    /// Decrements summed per product, in product id order.
    pub fn decrements_by_product(&self) -> Vec<ProductDecrement> {
        let mut grouped: BTreeMap<&str, ProductDecrement> = BTreeMap::new();
        for d in &self.decrements {
            grouped
                .entry(d.product_id.as_str())
                .and_modify(|g| g.units += d.units)
                .or_insert_with(|| ProductDecrement {
                    product_id: d.product_id.clone(),
                    product_name: d.product_name.clone(),
                    units: d.units,
                    expected_version: d.expected_version,
                });
        }
        grouped.into_values().collect()
    }

    pub fn total(&self) -> Money {
        self.sales.iter().map(|s| s.total_price).sum()
    }
}

// =============================================================================
// Settle
// =============================================================================

/// Settles a cart. Returns `None` for an empty cart.
///
/// The cart itself is not touched; the caller clears it once the settlement
/// has been committed.
pub fn settle(cart: &Cart, ctx: &CheckoutContext) -> Option<Settlement> {
    if cart.is_empty() {
        return None;
    }

    let receipt_id = generate_receipt_id(ctx.now, ctx.offset);
    let mut sales = Vec::with_capacity(cart.len());
    let mut decrements = Vec::with_capacity(cart.len());
    let mut items = Vec::with_capacity(cart.len());

    for line in cart.lines() {
        let sale = sale_from_line(line, &receipt_id, ctx);
        decrements.push(StockDecrement {
            sale_id: sale.id.clone(),
            product_id: sale.product_id.clone(),
            product_name: sale.product_name.clone(),
            units: sale.quantity,
            expected_version: line.product.version,
        });
        items.push(ReceiptItem {
            product_name: line.product.name.clone(),
            unit_type: line.unit_type.clone(),
            units_per_pack: line.units_per_pack,
            pack_quantity: line.pack_quantity,
            price_per_pack: line.price_per_pack,
            unit_price: line.unit_price(),
            line_total: line.line_total(),
        });
        sales.push(sale);
    }

    let total: Money = sales.iter().map(|s| s.total_price).sum();
    let receipt = Receipt {
        shop_name: ctx.shop_name.clone(),
        receipt_id: receipt_id.clone(),
        date: ctx
            .now
            .with_timezone(&ctx.offset)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        items,
        total,
        payment_method: ctx.payment_method,
        seller_name: ctx.seller.name.clone(),
    };

    info!(
        receipt_id = %receipt_id,
        lines = sales.len(),
        total = total.minor(),
        "Cart settled"
    );

    Some(Settlement {
        receipt_id,
        timestamp: ctx.now,
        sales,
        decrements,
        receipt,
    })
}

/// Converts one cart line to its Sale.
pub fn sale_from_line(line: &CartLineItem, receipt_id: &str, ctx: &CheckoutContext) -> Sale {
    let quantity = line.total_units();
    let total_price = line.line_total();
    let total_cost = line.product.buy_price.multiply_quantity(quantity);

    Sale {
        id: uuid::Uuid::new_v4().to_string(),
        shop_id: ctx.shop_id.clone(),
        product_id: line.product.product_id.clone(),
        product_name: line.product.name.clone(),
        quantity,
        unit_price: line.unit_price(),
        total_price,
        total_cost,
        profit: total_price - total_cost,
        timestamp: ctx.now,
        seller_id: ctx.seller.id.clone(),
        seller_name: ctx.seller.name.clone(),
        receipt_id: receipt_id.to_string(),
        payment_method: ctx.payment_method,
        metadata: SaleMetadata {
            unit_type: line.unit_type.clone(),
            pack_size: line.units_per_pack,
            pack_price: line.price_per_pack,
            pack_quantity: line.pack_quantity,
        },
    }
}

/// Generates a receipt id: `RCP-YYYYMMDD-HHMMSS-XXXX`, in shop-local time.
///
/// The suffix is random so two registers checking out in the same second
/// get different ids.
pub fn generate_receipt_id(now: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = now.with_timezone(&offset);
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("RCP-{}-{}", local.format("%Y%m%d-%H%M%S"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewProduct, Product};
    use chrono::TimeZone;

    fn product(name: &str, buy: i64, sell: i64, quantity: i64, discount_bps: Option<u32>) -> Product {
        NewProduct {
            name: name.to_string(),
            sku: name.to_uppercase().replace(' ', "-"),
            category: String::new(),
            buy_price: Money::from_minor(buy),
            sell_price: Money::from_minor(sell),
            quantity,
            min_threshold: 0,
            discount_bps,
        }
        .into_product("shop-1", Utc::now())
    }

    fn ctx() -> CheckoutContext {
        CheckoutContext {
            shop_id: "shop-1".to_string(),
            shop_name: "Mama Duka".to_string(),
            seller: Seller::new("seller-1", "Amina"),
            payment_method: PaymentMethod::Cash,
            now: Utc.with_ymd_and_hms(2026, 3, 1, 21, 30, 5).unwrap(),
            offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        }
    }

    #[test]
    fn test_empty_cart_settles_to_nothing() {
        assert!(settle(&Cart::new(), &ctx()).is_none());
    }

    #[test]
    fn test_three_singles_settle_to_one_sale() {
        let soda = product("Soda", 1000, 1500, 10, None);
        let mut cart = Cart::new();
        for _ in 0..3 {
            cart.add_single_unit(&soda).unwrap();
        }

        let settlement = settle(&cart, &ctx()).unwrap();

        assert_eq!(settlement.sales.len(), 1);
        let sale = &settlement.sales[0];
        assert_eq!(sale.quantity, 3);
        assert_eq!(sale.total_price.minor(), 4500);
        assert_eq!(sale.total_cost.minor(), 3000);
        assert_eq!(sale.profit.minor(), 1500);
        assert_eq!(sale.unit_price.minor(), 1500);
        assert_eq!(settlement.decrements[0].units, 3);
        assert_eq!(soda.quantity - settlement.decrements[0].units, 7);
    }

    #[test]
    fn test_discounted_single_settles_at_effective_price() {
        let soda = product("Soda", 1000, 1500, 10, Some(2000));
        let mut cart = Cart::new();
        cart.add_single_unit(&soda).unwrap();

        let settlement = settle(&cart, &ctx()).unwrap();

        assert_eq!(settlement.total().minor(), 1200);
        assert_eq!(settlement.sales[0].profit.minor(), 200);
    }

    #[test]
    fn test_mixed_cart_round_trip() {
        let soda = product("Soda", 1000, 1500, 100, None);
        let sugar = product("Sugar", 280, 350, 50, Some(1000));
        let mut cart = Cart::new();
        cart.add_single_unit(&soda).unwrap();
        cart.add_pack(&soda, UnitType::dozen(), 12, Money::from_minor(15_000), 2)
            .unwrap();
        cart.add_pack(&soda, UnitType::new("Crate"), 24, Money::from_minor(10_001), 1)
            .unwrap();
        cart.add_single_unit(&sugar).unwrap();
        cart.add_single_unit(&sugar).unwrap();

        let settlement = settle(&cart, &ctx()).unwrap();

        assert_eq!(settlement.sales.len(), cart.len());
        assert_eq!(settlement.total(), cart.total());
        assert_eq!(settlement.receipt.total, cart.total());
        let units: i64 = settlement.sales.iter().map(|s| s.quantity).sum();
        assert_eq!(units, cart.totals().total_units);

        for sale in &settlement.sales {
            assert_eq!(sale.profit, sale.total_price - sale.total_cost);
            assert_eq!(sale.receipt_id, settlement.receipt_id);
            assert_eq!(sale.timestamp, settlement.timestamp);
        }

        let crate_sale = settlement
            .sales
            .iter()
            .find(|s| s.metadata.unit_type.as_str() == "Crate")
            .unwrap();
        assert_eq!(crate_sale.metadata.pack_size, 24);
        assert_eq!(crate_sale.unit_price.minor(), 417);
        assert_eq!(crate_sale.total_price.minor(), 10_001);
        assert_eq!(crate_sale.total_cost.minor(), 24_000);
        assert!(crate_sale.profit.is_negative());
    }

    #[test]
    fn test_decrements_grouped_per_product() {
        let soda = product("Soda", 1000, 1500, 100, None);
        let sugar = product("Sugar", 280, 350, 50, None);
        let mut cart = Cart::new();
        cart.add_single_unit(&soda).unwrap();
        cart.add_pack(&soda, UnitType::dozen(), 12, Money::from_minor(15_000), 1)
            .unwrap();
        cart.add_single_unit(&sugar).unwrap();

        let settlement = settle(&cart, &ctx()).unwrap();
        let grouped = settlement.decrements_by_product();

        assert_eq!(settlement.decrements.len(), 3);
        assert_eq!(grouped.len(), 2);
        let soda_group = grouped.iter().find(|g| g.product_id == soda.id).unwrap();
        assert_eq!(soda_group.units, 13);
        assert_eq!(soda_group.expected_version, soda.version);
    }

    #[test]
    fn test_receipt_projection() {
        let soda = product("Soda", 1000, 1500, 10, None);
        let mut cart = Cart::new();
        cart.add_single_unit(&soda).unwrap();
        let mut context = ctx();
        context.payment_method = PaymentMethod::MobileMoney;

        let receipt = settle(&cart, &context).unwrap().receipt;

        assert_eq!(receipt.shop_name, "Mama Duka");
        assert_eq!(receipt.seller_name, "Amina");
        assert_eq!(receipt.payment_method, PaymentMethod::MobileMoney);
        assert_eq!(receipt.date, "2026-03-02 00:30");
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].line_total.minor(), 1500);
    }

    #[test]
    fn test_receipt_id_uses_local_time() {
        let c = ctx();
        let id = generate_receipt_id(c.now, c.offset);

        assert!(id.starts_with("RCP-20260302-003005-"));
        assert_eq!(id.len(), "RCP-20260302-003005-XXXX".len());
        assert!(id[20..].chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}

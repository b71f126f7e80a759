//! # Pricing Engine
//!
//! Effective prices for single units and packs.
//!
//! ```text
//! sell_price ──► discount (bps) ──► effective_price ──► Single line price
//!
//! sell_price × units_per_pack ──► default_pack_price ──► pack dialog default
//!                                         │
//!                            operator may override; the override does
//!                            NOT inherit the percentage discount
//! ```
//!
//! All functions are pure and infallible.

use crate::money::Money;
use crate::types::Product;

/// Price of one base unit after the product's percentage discount.
///
/// ```rust
/// # use duka_core::money::Money;
/// # use duka_core::pricing::discounted;
/// assert_eq!(discounted(Money::from_minor(1500), Some(2000)).minor(), 1200);
/// assert_eq!(discounted(Money::from_minor(1500), None).minor(), 1500);
/// ```
pub fn effective_price(product: &Product) -> Money {
    discounted(product.sell_price, product.discount_bps)
}

/// Applies an optional discount to a shelf price.
pub fn discounted(sell_price: Money, discount_bps: Option<u32>) -> Money {
    match discount_bps {
        Some(bps) if bps > 0 => sell_price.apply_percentage_discount(bps),
        _ => sell_price,
    }
}

/// Default price of a pack: the undiscounted shelf price times the pack size.
pub fn default_pack_price(product: &Product, units_per_pack: i64) -> Money {
    product.sell_price.multiply_quantity(units_per_pack.max(1))
}

/// Per-base-unit price of a pack, for sale records and receipts.
///
/// Rounded to the nearest minor unit; totals are always computed from the
/// pack price, never from this value.
pub fn effective_unit_price(price_per_pack: Money, units_per_pack: i64) -> Money {
    price_per_pack.divide_rounded(units_per_pack)
}

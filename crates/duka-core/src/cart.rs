//! # Cart Engine
//!
//! The in-session cart of one seller: multi-unit line items and the
//! per-product stock ceiling.
//!
//! ## Line Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineKey = (product_id, unit_type, units_per_pack, price_per_pack)     │
//! │                                                                         │
//! │  add_single_unit(soda)            → (soda, Single, 1, 1200)   qty 1    │
//! │  add_single_unit(soda)            → (soda, Single, 1, 1200)   qty 2    │
//! │  add_pack(soda, Dozen, 12, 15000) → (soda, Dozen, 12, 15000)  qty 1    │
//! │  add_pack(soda, Dozen, 12, 14000) → (soda, Dozen, 12, 14000)  qty 1    │
//! │                                                                         │
//! │  Same configuration merges, any difference is its own line.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Ceiling
//! For every product, `Σ pack_quantity × units_per_pack` over all of its
//! lines never exceeds the stock the lines were last validated against.
//! Every operation checks before it mutates, so a rejected operation leaves
//! the cart exactly as it was.
//!
//! ## Durability
//! [`Cart::snapshot`] produces a versioned envelope the session writes
//! through on every mutation; [`Cart::restore`] rebuilds the cart at session
//! start and falls back to an empty cart on anything it cannot trust.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{effective_price, effective_unit_price};
use crate::types::{Product, UnitType};
use crate::validation::{validate_count, validate_pack};
use crate::{MAX_CART_LINES, MAX_PACK_QUANTITY};

/// Format version of [`CartSnapshot`].
pub const CART_SNAPSHOT_VERSION: u32 = 1;

// =============================================================================
// Line Key
// =============================================================================

/// Structural identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey {
    pub product_id: String,
    pub unit_type: UnitType,
    pub units_per_pack: i64,
    pub price_per_pack: Money,
}

impl LineKey {
    pub fn new(
        product_id: impl Into<String>,
        unit_type: UnitType,
        units_per_pack: i64,
        price_per_pack: Money,
    ) -> Self {
        LineKey {
            product_id: product_id.into(),
            unit_type,
            units_per_pack,
            price_per_pack,
        }
    }

    /// Stable string form handed to the UI.
    pub fn line_id(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.product_id,
            self.unit_type,
            self.units_per_pack,
            self.price_per_pack.minor()
        )
    }
}

// =============================================================================
// Cart Line Item
// =============================================================================

/// What the cart knows about a product: frozen at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    /// Cost of one base unit, carried to the Sale at checkout.
    pub buy_price: Money,
    /// Stock on hand when the product's lines were last validated.
    pub stock_on_hand: i64,
    /// Product version when the product's lines were last validated.
    pub version: i64,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        ProductSnapshot {
            product_id: product.id.clone(),
            name: product.name.clone(),
            sku: product.sku.clone(),
            buy_price: product.buy_price,
            stock_on_hand: product.quantity,
            version: product.version,
        }
    }
}

/// One row in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub line_id: String,
    pub product: ProductSnapshot,
    pub unit_type: UnitType,
    pub units_per_pack: i64,
    pub price_per_pack: Money,
    pub pack_quantity: i64,
}

impl CartLineItem {
    fn new(key: &LineKey, product: &Product) -> Self {
        CartLineItem {
            line_id: key.line_id(),
            product: ProductSnapshot::from(product),
            unit_type: key.unit_type.clone(),
            units_per_pack: key.units_per_pack,
            price_per_pack: key.price_per_pack,
            pack_quantity: 0,
        }
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(
            self.product.product_id.clone(),
            self.unit_type.clone(),
            self.units_per_pack,
            self.price_per_pack,
        )
    }

    /// Base units reserved by this line.
    #[inline]
    pub fn total_units(&self) -> i64 {
        self.pack_quantity * self.units_per_pack
    }

    /// Amount charged for this line.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_per_pack.multiply_quantity(self.pack_quantity)
    }

    /// Per-base-unit price, display only.
    #[inline]
    pub fn unit_price(&self) -> Money {
        effective_unit_price(self.price_per_pack, self.units_per_pack)
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Summary shown under the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_units: i64,
    pub total: Money,
}

// =============================================================================
// Review
// =============================================================================

/// Why a product's lines could not be re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReviewIssue {
    /// The product is gone from the catalog.
    Missing { product_id: String, name: String },
    /// The cart reserves more than is now on hand.
    Short {
        product_id: String,
        name: String,
        available: i64,
        reserved: i64,
    },
}

// =============================================================================
// Cart
// =============================================================================

/// The active cart.
///
/// ## Invariants
/// - Lines are unique by [`LineKey`]
/// - `pack_quantity >= 1` on every line
/// - Per product, reserved units ≤ the stock its lines were validated against
/// - All lines of one product carry the same [`ProductSnapshot`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<LineKey, CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds one base unit at the product's effective price.
    ///
    /// ## Errors
    /// - [`CoreError::OutOfStock`] when nothing is on hand
    /// - [`CoreError::StockExceeded`] when one more unit would exceed stock
    ///   (`max_allowed` in base units)
    ///
    /// ```rust
    /// # use duka_core::cart::Cart;
    /// # use duka_core::money::Money;
    /// # use duka_core::types::NewProduct;
    /// let soda = NewProduct {
    ///     name: "Soda".into(), sku: "SODA".into(), category: String::new(),
    ///     buy_price: Money::from_minor(1000), sell_price: Money::from_minor(1500),
    ///     quantity: 10, min_threshold: 0, discount_bps: None,
    /// }.into_product("shop-1", chrono::Utc::now());
    ///
    /// let mut cart = Cart::new();
    /// for _ in 0..3 {
    ///     cart.add_single_unit(&soda).unwrap();
    /// }
    /// assert_eq!(cart.len(), 1);
    /// assert_eq!(cart.total().minor(), 4500);
    /// ```
    pub fn add_single_unit(&mut self, product: &Product) -> CoreResult<String> {
        if product.quantity <= 0 {
            return Err(CoreError::OutOfStock {
                product: product.name.clone(),
            });
        }

        let reserved = self.reserved_units(&product.id);
        if reserved + 1 > product.quantity {
            return Err(CoreError::StockExceeded {
                product: product.name.clone(),
                available: product.quantity,
                reserved,
                requested: 1,
                max_allowed: (product.quantity - reserved).max(0),
            });
        }

        let key = LineKey::new(
            product.id.clone(),
            UnitType::single(),
            1,
            effective_price(product),
        );
        self.merge(key, product, 1)
    }

    /// Adds `pack_quantity` packs of `units_per_pack` base units each.
    ///
    /// ## Errors
    /// - [`CoreError::Validation`] for a malformed pack
    /// - [`CoreError::OutOfStock`] when nothing is on hand
    /// - [`CoreError::StockExceeded`] when the packs would exceed stock
    ///   (`max_allowed` in packs of this size)
    pub fn add_pack(
        &mut self,
        product: &Product,
        unit_type: UnitType,
        units_per_pack: i64,
        price_per_pack: Money,
        pack_quantity: i64,
    ) -> CoreResult<String> {
        validate_pack(unit_type.as_str(), units_per_pack, price_per_pack, pack_quantity)?;

        if product.quantity <= 0 {
            return Err(CoreError::OutOfStock {
                product: product.name.clone(),
            });
        }

        let reserved = self.reserved_units(&product.id);
        let requested = units_per_pack * pack_quantity;
        if requested + reserved > product.quantity {
            return Err(CoreError::StockExceeded {
                product: product.name.clone(),
                available: product.quantity,
                reserved,
                requested,
                max_allowed: (product.quantity - reserved).max(0) / units_per_pack,
            });
        }

        let key = LineKey::new(product.id.clone(), unit_type, units_per_pack, price_per_pack);
        self.merge(key, product, pack_quantity)
    }

    /// Sets a line's pack quantity, checked against `product`'s current stock
    /// with every *other* line of the product as the baseline.
    ///
    /// `new_pack_quantity <= 0` removes the line. On failure the line keeps
    /// its prior quantity and the error's `max_allowed` is the largest pack
    /// quantity that would fit.
    pub fn update_quantity(
        &mut self,
        line_id: &str,
        new_pack_quantity: i64,
        product: &Product,
    ) -> CoreResult<()> {
        let key = self.key_of(line_id)?;

        if new_pack_quantity <= 0 {
            self.lines.remove(&key);
            debug!(line_id, "Cart line removed by zero quantity");
            return Ok(());
        }

        if key.product_id != product.id {
            return Err(ValidationError::InvalidFormat {
                field: "product".to_string(),
                reason: format!("line {} does not belong to product {}", line_id, product.id),
            }
            .into());
        }
        validate_count("pack_quantity", new_pack_quantity, MAX_PACK_QUANTITY)?;

        let current = self.lines.get(&key).map(|l| l.total_units()).unwrap_or(0);
        let others = self.reserved_units(&product.id) - current;
        let requested = new_pack_quantity * key.units_per_pack;
        if others + requested > product.quantity {
            return Err(CoreError::StockExceeded {
                product: product.name.clone(),
                available: product.quantity,
                reserved: others,
                requested,
                max_allowed: (product.quantity - others).max(0) / key.units_per_pack,
            });
        }

        if let Some(line) = self.lines.get_mut(&key) {
            line.pack_quantity = new_pack_quantity;
        }
        self.restamp(product);
        debug!(line_id, new_pack_quantity, "Cart line quantity updated");
        Ok(())
    }

    /// Removes a line. No stock checks apply.
    pub fn remove_line_item(&mut self, line_id: &str) -> CoreResult<CartLineItem> {
        let key = self.key_of(line_id)?;
        let removed = self
            .lines
            .remove(&key)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        debug!(line_id, "Cart line removed");
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Re-validates every product in the cart against fresh catalog rows.
    ///
    /// Products whose lines still fit are re-stamped with the fresh stock and
    /// version; the rest are reported and left untouched for the seller to
    /// fix.
    pub fn review(&mut self, catalog: &[Product]) -> Vec<ReviewIssue> {
        let mut issues = Vec::new();

        for product_id in self.product_ids() {
            let name = self
                .lines_for(&product_id)
                .next()
                .map(|l| l.product.name.clone())
                .unwrap_or_default();

            match catalog.iter().find(|p| p.id == product_id) {
                None => issues.push(ReviewIssue::Missing { product_id, name }),
                Some(product) => {
                    let reserved = self.reserved_units(&product.id);
                    if reserved > product.quantity {
                        issues.push(ReviewIssue::Short {
                            product_id,
                            name: product.name.clone(),
                            available: product.quantity,
                            reserved,
                        });
                    } else {
                        self.restamp(product);
                    }
                }
            }
        }

        issues
    }

    fn merge(&mut self, key: LineKey, product: &Product, pack_quantity: i64) -> CoreResult<String> {
        if !self.lines.contains_key(&key) && self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line = self
            .lines
            .entry(key.clone())
            .or_insert_with(|| CartLineItem::new(&key, product));
        line.pack_quantity += pack_quantity;
        let line_id = line.line_id.clone();
        let now_packs = line.pack_quantity;

        self.restamp(product);
        debug!(
            line_id = %line_id,
            pack_quantity = now_packs,
            reserved = self.reserved_units(&product.id),
            "Cart line added"
        );
        Ok(line_id)
    }

    /// Stamps every line of `product` with its current snapshot.
    fn restamp(&mut self, product: &Product) {
        let snapshot = ProductSnapshot::from(product);
        for line in self
            .lines
            .values_mut()
            .filter(|l| l.product.product_id == product.id)
        {
            line.product = snapshot.clone();
        }
    }

    fn key_of(&self, line_id: &str) -> CoreResult<LineKey> {
        self.lines
            .iter()
            .find(|(_, line)| line.line_id == line_id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Base units reserved for a product across all of its lines.
    pub fn reserved_units(&self, product_id: &str) -> i64 {
        self.lines_for(product_id).map(|l| l.total_units()).sum()
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLineItem> {
        self.lines.values()
    }

    pub fn lines_for<'a>(&'a self, product_id: &'a str) -> impl Iterator<Item = &'a CartLineItem> {
        self.lines
            .values()
            .filter(move |l| l.product.product_id == product_id)
    }

    pub fn get(&self, line_id: &str) -> Option<&CartLineItem> {
        self.lines.values().find(|l| l.line_id == line_id)
    }

    pub fn product_ids(&self) -> BTreeSet<String> {
        self.lines
            .keys()
            .map(|k| k.product_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Amount charged: `Σ pack_quantity × price_per_pack`.
    pub fn total(&self) -> Money {
        self.lines.values().map(|l| l.line_total()).sum()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            line_count: self.lines.len(),
            total_units: self.lines.values().map(|l| l.total_units()).sum(),
            total: self.total(),
        }
    }

    // -------------------------------------------------------------------------
    // Snapshot / Restore
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            version: CART_SNAPSHOT_VERSION,
            lines: self.lines.values().cloned().collect(),
        }
    }

    /// Rebuilds a cart from a persisted blob.
    ///
    /// Never fails: a blob that does not parse, has an unknown version or
    /// breaks a cart invariant is discarded and an empty cart returned.
    pub fn restore(blob: &str) -> Cart {
        let parsed = serde_json::from_str::<CartSnapshot>(blob)
            .map_err(|e| e.to_string())
            .and_then(Cart::from_snapshot);

        match parsed {
            Ok(cart) => {
                debug!(lines = cart.len(), "Cart restored from snapshot");
                cart
            }
            Err(reason) => {
                warn!(%reason, "Discarding malformed cart snapshot");
                Cart::new()
            }
        }
    }

    fn from_snapshot(snapshot: CartSnapshot) -> Result<Cart, String> {
        if snapshot.version != CART_SNAPSHOT_VERSION {
            return Err(format!("unsupported snapshot version {}", snapshot.version));
        }
        if snapshot.lines.len() > MAX_CART_LINES {
            return Err(format!("{} lines exceeds the cart limit", snapshot.lines.len()));
        }

        let mut cart = Cart::new();
        for mut line in snapshot.lines {
            validate_pack(
                line.unit_type.as_str(),
                line.units_per_pack,
                line.price_per_pack,
                line.pack_quantity,
            )
            .map_err(|e| e.to_string())?;

            let key = line.key();
            line.line_id = key.line_id();
            if cart.lines.insert(key, line).is_some() {
                return Err("duplicate cart line".to_string());
            }
        }

        for product_id in cart.product_ids() {
            let mut lines = cart.lines_for(&product_id);
            let first = lines.next().map(|l| l.product.clone());
            if let Some(first) = first {
                if lines.any(|l| l.product != first) {
                    return Err(format!("inconsistent snapshot for product {}", product_id));
                }
                if cart.reserved_units(&product_id) > first.stock_on_hand {
                    return Err(format!("reservation exceeds stock for product {}", product_id));
                }
            }
        }

        Ok(cart)
    }
}

/// Persisted form of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub version: u32,
    pub lines: Vec<CartLineItem>,
}

impl CartSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

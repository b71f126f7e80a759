//! # Domain Types
//!
//! Core domain types used throughout Duka POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   ExpenseLog    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  receipt_id     │   │  date (local)   │       │
//! │  │  buy/sell price │   │  quantity/units │   │  category       │       │
//! │  │  quantity       │   │  total/cost     │   │  amount         │       │
//! │  │  version stamp  │   │  pack metadata  │   │  purchase meta  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   DailyRecord   │   │ PaymentMethod   │   │    UnitType     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  (shop, date)   │   │  Cash           │   │  Single         │       │
//! │  │  opening bal.   │   │  MobileMoney    │   │  Dozen / Crate  │       │
//! │  └─────────────────┘   │  Card           │   │  custom         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is scoped to one shop (tenant) through `shop_id`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, BPS_SCALE};

// =============================================================================
// Unit Type
// =============================================================================

/// How a product is sold on a cart line: as single base units or as a named
/// pack ("Dozen", "Crate", "Carton", or any label the shop uses).
///
/// Labels are trimmed; comparison is exact after trimming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitType(String);

impl UnitType {
    pub const SINGLE: &'static str = "Single";
    pub const DOZEN: &'static str = "Dozen";
    pub const CRATE: &'static str = "Crate";
    pub const CARTON: &'static str = "Carton";

    pub fn new(label: impl AsRef<str>) -> Self {
        UnitType(label.as_ref().trim().to_string())
    }

    pub fn single() -> Self {
        UnitType(Self::SINGLE.to_string())
    }

    pub fn dozen() -> Self {
        UnitType(Self::DOZEN.to_string())
    }

    pub fn is_single(&self) -> bool {
        self.0 == Self::SINGLE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in a shop's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Shop (tenant) this product belongs to.
    pub shop_id: String,

    /// Display name shown to the seller and on receipts.
    pub name: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    pub category: String,

    /// Cost of one base unit.
    pub buy_price: Money,

    /// Shelf price of one base unit, before discount.
    pub sell_price: Money,

    /// Base units on hand.
    pub quantity: i64,

    /// Low-stock alert level in base units.
    pub min_threshold: i64,

    /// Percentage discount in basis points (2000 = 20%).
    pub discount_bps: Option<u32>,

    /// Stamp bumped on every write to this product.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Discount in basis points, zero when unset.
    #[inline]
    pub fn discount(&self) -> u32 {
        self.discount_bps.unwrap_or(0)
    }

    #[inline]
    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// At or below the alert level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_threshold
    }

    /// Value of the stock on hand at buy price.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.buy_price.multiply_quantity(self.quantity)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub category: String,
    pub buy_price: Money,
    pub sell_price: Money,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_threshold: i64,
    #[serde(default)]
    pub discount_bps: Option<u32>,
}

impl NewProduct {
    /// Builds the full product with a fresh id and `version = 0`.
    pub fn into_product(self, shop_id: &str, now: DateTime<Utc>) -> Product {
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            category: self.category.trim().to_string(),
            buy_price: self.buy_price,
            sell_price: self.sell_price,
            quantity: self.quantity,
            min_threshold: self.min_threshold,
            discount_bps: self.discount_bps,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a product. `None` leaves a field unchanged.
///
/// `discount_bps: Some(None)` clears the discount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub buy_price: Option<Money>,
    pub sell_price: Option<Money>,
    pub quantity: Option<i64>,
    pub min_threshold: Option<i64>,
    #[ts(optional = nullable)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_bps: Option<Option<u32>>,
}

impl ProductPatch {
    /// Applies the patch in place. Does not touch `version` or timestamps.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(category) = &self.category {
            product.category = category.trim().to_string();
        }
        if let Some(buy_price) = self.buy_price {
            product.buy_price = buy_price;
        }
        if let Some(sell_price) = self.sell_price {
            product.sell_price = sell_price;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        if let Some(min_threshold) = self.min_threshold {
            product.min_threshold = min_threshold;
        }
        if let Some(discount) = self.discount_bps {
            product.discount_bps = discount;
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ProductPatch::default()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Attested by the seller, never verified.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "mobile_money" | "mobile-money" | "momo" => Ok(PaymentMethod::MobileMoney),
            "card" => Ok(PaymentMethod::Card),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown method '{}', expected cash, mobile_money or card", other),
            }),
        }
    }
}

// =============================================================================
// Seller
// =============================================================================

/// The authenticated seller operating the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: String,
    pub name: String,
}

impl Seller {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Seller {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// How the line was sold, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleMetadata {
    pub unit_type: UnitType,
    /// Base units per pack (1 for singles).
    pub pack_size: i64,
    pub pack_price: Money,
    pub pack_quantity: i64,
}

/// One settled cart line.
///
/// Uses the snapshot pattern: product name and buy price are frozen at the
/// time of sale, so later catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub shop_id: String,
    pub product_id: String,
    pub product_name: String,
    /// Total base units sold.
    pub quantity: i64,
    /// Effective price per base unit (for reporting only).
    pub unit_price: Money,
    pub total_price: Money,
    pub total_cost: Money,
    pub profit: Money,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub seller_id: String,
    pub seller_name: String,
    pub receipt_id: String,
    pub payment_method: PaymentMethod,
    pub metadata: SaleMetadata,
}

// =============================================================================
// Expenses & Purchases
// =============================================================================

/// Expense category label, stored upper-case ("STOCK", "TRANSPORT", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseCategory(String);

impl ExpenseCategory {
    /// Stock purchases; counted as `stock_purchases`, never as other expenses.
    pub const STOCK: &'static str = "STOCK";
    pub const TRANSPORT: &'static str = "TRANSPORT";
    pub const SALARY: &'static str = "SALARY";
    pub const RENT: &'static str = "RENT";
    pub const UTILITIES: &'static str = "UTILITIES";
    pub const OTHER: &'static str = "OTHER";

    pub fn new(label: impl AsRef<str>) -> Self {
        ExpenseCategory(label.as_ref().trim().to_uppercase())
    }

    pub fn stock() -> Self {
        ExpenseCategory(Self::STOCK.to_string())
    }

    pub fn is_stock(&self) -> bool {
        self.0 == Self::STOCK
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Details of a stock purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetails {
    /// Catalog product restocked by this purchase, if any.
    pub product_id: Option<String>,
    pub product_name: String,
    /// Base units bought.
    pub quantity: i64,
    pub unit_price: Money,
    pub total_cost: Money,
    pub amount_paid: Money,
    /// Still owed to the supplier.
    pub amount_remained: Money,
}

/// Structured expense metadata, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseMetadata {
    Purchase(PurchaseDetails),
}

/// A money outflow recorded against a local business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseLog {
    pub id: String,
    pub shop_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub description: String,
    pub metadata: Option<ExpenseMetadata>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ExpenseLog {
    /// Purchase details when this entry is a stock purchase.
    pub fn purchase(&self) -> Option<&PurchaseDetails> {
        match &self.metadata {
            Some(ExpenseMetadata::Purchase(details)) if self.category.is_stock() => Some(details),
            _ => None,
        }
    }
}

/// Input for a plain (non-purchase) expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Money,
    #[serde(default)]
    pub description: String,
}

impl NewExpense {
    pub fn into_expense(self, shop_id: &str, now: DateTime<Utc>) -> ExpenseLog {
        ExpenseLog {
            id: uuid::Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            date: self.date,
            category: self.category,
            amount: self.amount,
            description: self.description.trim().to_string(),
            metadata: None,
            created_at: now,
        }
    }
}

/// Input for a stock purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Defaults to the full cost when not given.
    pub amount_paid: Option<Money>,
    #[serde(default)]
    pub description: String,
}

impl NewPurchase {
    /// Builds the STOCK expense entry; `amount` is the full cost, regardless
    /// of how much was paid up front.
    pub fn into_expense(self, shop_id: &str, now: DateTime<Utc>) -> ExpenseLog {
        let total_cost = self.unit_price.multiply_quantity(self.quantity);
        let amount_paid = self.amount_paid.unwrap_or(total_cost);
        let description = if self.description.trim().is_empty() {
            format!("Purchase: {} x{}", self.product_name.trim(), self.quantity)
        } else {
            self.description.trim().to_string()
        };

        ExpenseLog {
            id: uuid::Uuid::new_v4().to_string(),
            shop_id: shop_id.to_string(),
            date: self.date,
            category: ExpenseCategory::stock(),
            amount: total_cost,
            description,
            metadata: Some(ExpenseMetadata::Purchase(PurchaseDetails {
                product_id: self.product_id,
                product_name: self.product_name.trim().to_string(),
                quantity: self.quantity,
                unit_price: self.unit_price,
                total_cost,
                amount_paid,
                amount_remained: total_cost - amount_paid,
            })),
            created_at: now,
        }
    }
}

/// Partial edit of an expense entry.
///
/// Purchases can be re-dated or re-described, but their amount follows the
/// purchase details and is not editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub amount: Option<Money>,
    pub description: Option<String>,
}

impl ExpensePatch {
    pub fn apply(&self, expense: &mut ExpenseLog) {
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(description) = &self.description {
            expense.description = description.trim().to_string();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.amount.is_none() && self.description.is_none()
    }
}

// =============================================================================
// Daily Record
// =============================================================================

/// Per-shop, per-day ledger header. Only the opening balance is entered by
/// hand; purchase and expense totals are derived from the expense stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub shop_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub opening_balance: Money,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Converts a 0–100 percentage to basis points.
pub fn percent_to_bps(percent: f64) -> u32 {
    (percent * 100.0).round().clamp(0.0, BPS_SCALE as f64) as u32
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        NewProduct {
            name: " Soda 500ml ".to_string(),
            sku: "SODA-500".to_string(),
            category: "Drinks".to_string(),
            buy_price: Money::from_minor(1000),
            sell_price: Money::from_minor(1500),
            quantity: 10,
            min_threshold: 3,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now())
    }

    #[test]
    fn test_new_product_trims_and_starts_at_version_zero() {
        let p = product();
        assert_eq!(p.name, "Soda 500ml");
        assert_eq!(p.version, 0);
        assert_eq!(p.stock_value().minor(), 10_000);
        assert!(!p.is_low_stock());
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut p = product();
        let patch = ProductPatch {
            sell_price: Some(Money::from_minor(1700)),
            discount_bps: Some(Some(1000)),
            ..Default::default()
        };
        patch.apply(&mut p);
        assert_eq!(p.sell_price.minor(), 1700);
        assert_eq!(p.discount(), 1000);
        assert_eq!(p.buy_price.minor(), 1000);

        ProductPatch {
            discount_bps: Some(None),
            ..Default::default()
        }
        .apply(&mut p);
        assert_eq!(p.discount_bps, None);
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Mobile_Money".parse::<PaymentMethod>().unwrap(), PaymentMethod::MobileMoney);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::MobileMoney.to_string(), "mobile_money");
    }

    #[test]
    fn test_purchase_expense_shape() {
        let expense = NewPurchase {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            product_id: Some("p-1".to_string()),
            product_name: "Soda 500ml".to_string(),
            quantity: 24,
            unit_price: Money::from_minor(900),
            amount_paid: Some(Money::from_minor(20_000)),
            description: String::new(),
        }
        .into_expense("shop-1", Utc::now());

        assert!(expense.category.is_stock());
        assert_eq!(expense.amount.minor(), 21_600);
        let details = expense.purchase().unwrap();
        assert_eq!(details.amount_remained.minor(), 1_600);
        assert_eq!(expense.description, "Purchase: Soda 500ml x24");

        let json = serde_json::to_value(&expense.metadata).unwrap();
        assert_eq!(json["type"], "PURCHASE");
        assert_eq!(json["productName"], "Soda 500ml");
    }

    #[test]
    fn test_labels_are_normalized() {
        assert_eq!(UnitType::new("  Crate ").as_str(), "Crate");
        assert!(UnitType::new("Single").is_single());
        assert_eq!(ExpenseCategory::new("transport").as_str(), "TRANSPORT");
        assert!(ExpenseCategory::new(" stock").is_stock());
    }

    #[test]
    fn test_percent_to_bps() {
        assert_eq!(percent_to_bps(20.0), 2000);
        assert_eq!(percent_to_bps(8.25), 825);
        assert_eq!(percent_to_bps(150.0), 10_000);
        assert_eq!(percent_to_bps(-3.0), 0);
    }
}

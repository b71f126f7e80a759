//! # Validation Module
//!
//! Input validation for catalog edits, cart operations and ledger entries.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Register UI                                                   │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Register commands + cart engine (Rust)                       │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── NOT NULL / UNIQUE(shop_id, sku) / CHECK(quantity >= 0)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use duka_core::validation::{validate_sku, validate_pack};
//! use duka_core::money::Money;
//!
//! validate_sku("SODA-500").unwrap();
//! validate_pack("Dozen", 12, Money::from_minor(15000), 1).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::{Money, BPS_SCALE};
use crate::types::{ExpensePatch, NewExpense, NewProduct, NewPurchase, Product, ProductPatch};
use crate::{MAX_PACK_QUANTITY, MAX_PRICE, MAX_UNITS_PER_PACK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use duka_core::validation::validate_sku;
///
/// assert!(validate_sku("SODA-500").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1–200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 200)
}

/// Validates a catalog search query. Empty is allowed and lists everything.
///
/// Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock level in base units. Zero is allowed.
pub fn validate_stock_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a price. Zero is allowed (free items, giveaway packs), anything
/// above [`MAX_PRICE`] is not.
///
/// ```rust
/// use duka_core::money::Money;
/// use duka_core::validation::validate_price;
///
/// assert!(validate_price("sell_price", Money::from_minor(1500)).is_ok());
/// assert!(validate_price("sell_price", Money::zero()).is_ok());
/// assert!(validate_price("sell_price", Money::from_minor(-1)).is_err());
/// assert!(validate_price("sell_price", Money::from_minor(i64::MAX / 2)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if price.minor() > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE,
        });
    }
    Ok(())
}

/// Validates a discount in basis points (0–10000, i.e. 0–100 %).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps as i64 > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }
    Ok(())
}

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates the configuration of a pack being added to the cart.
///
/// ## Rules
/// - `unit_type` must not be blank
/// - `units_per_pack` in `1..=MAX_UNITS_PER_PACK`
/// - `pack_quantity` in `1..=MAX_PACK_QUANTITY`
/// - `price_per_pack` in `0..=MAX_PRICE`
///
/// ## User Workflow
/// ```text
/// Seller opens the pack dialog for "Soda 500ml"
///      │
///      ├── unit: "Crate", units per pack: 24, price: 30000, qty: 2
///      │
///      ▼
/// validate_pack(...) ← THIS FUNCTION
///      │
///      ├── bad input? → ValidationError (cart untouched)
///      │
///      └── OK → stock ceiling check in Cart::add_pack
/// ```
pub fn validate_pack(
    unit_type: &str,
    units_per_pack: i64,
    price_per_pack: Money,
    pack_quantity: i64,
) -> ValidationResult<()> {
    if unit_type.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "unit_type".to_string(),
        });
    }

    validate_count("units_per_pack", units_per_pack, MAX_UNITS_PER_PACK)?;
    validate_count("pack_quantity", pack_quantity, MAX_PACK_QUANTITY)?;
    validate_price("price_per_pack", price_per_pack)
}

/// Validates a positive count bounded by `max`.
pub fn validate_count(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a product about to be written (after create or patch).
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_sku(&product.sku)?;
    validate_price("buy_price", product.buy_price)?;
    validate_price("sell_price", product.sell_price)?;
    validate_stock_quantity("quantity", product.quantity)?;
    validate_stock_quantity("min_threshold", product.min_threshold)?;
    if let Some(bps) = product.discount_bps {
        validate_discount_bps(bps)?;
    }
    Ok(())
}

pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_sku(&input.sku)?;
    validate_price("buy_price", input.buy_price)?;
    validate_price("sell_price", input.sell_price)?;
    validate_stock_quantity("quantity", input.quantity)?;
    validate_stock_quantity("min_threshold", input.min_threshold)?;
    if let Some(bps) = input.discount_bps {
        validate_discount_bps(bps)?;
    }
    Ok(())
}

/// Rejects empty patches; field rules are checked on the patched product.
pub fn validate_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::Required {
            field: "patch".to_string(),
        });
    }
    Ok(())
}

pub fn validate_new_expense(input: &NewExpense) -> ValidationResult<()> {
    required_text("category", input.category.as_str(), 50)?;
    if input.category.is_stock() {
        return Err(ValidationError::InvalidFormat {
            field: "category".to_string(),
            reason: "stock purchases must be recorded as purchases".to_string(),
        });
    }
    if !input.amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Rejects empty patches and non-positive amounts.
pub fn validate_expense_patch(patch: &ExpensePatch) -> ValidationResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::Required {
            field: "patch".to_string(),
        });
    }
    if let Some(amount) = patch.amount {
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            });
        }
    }
    Ok(())
}

/// ## Rules
/// - product name required
/// - quantity positive
/// - unit price not negative
/// - amount paid between zero and the total cost
pub fn validate_new_purchase(input: &NewPurchase) -> ValidationResult<()> {
    validate_product_name(&input.product_name)?;
    if input.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    validate_price("unit_price", input.unit_price)?;

    if let Some(paid) = input.amount_paid {
        let total = input.unit_price.multiply_quantity(input.quantity);
        if paid.is_negative() || paid > total {
            return Err(ValidationError::OutOfRange {
                field: "amount_paid".to_string(),
                min: 0,
                max: total.minor(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use duka_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

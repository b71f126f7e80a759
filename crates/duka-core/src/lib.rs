//! # duka-core: Pure Business Logic for Duka POS
//!
//! The cart, pricing, settlement and reporting rules of the register, as
//! pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register UI                                  │   │
//! │  │    Catalog ──► Cart ──► Pay ──► Receipt      Reports            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-register (session, commands)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ duka-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ │   │
//! │  │   │ pricing │ │  cart   │ │checkout │ │aggregat- │ │  money  │ │   │
//! │  │   │discount │ │ceilings │ │ Sales + │ │  ion     │ │ types   │ │   │
//! │  │   │ packs   │ │snapshot │ │ receipt │ │daily/ROI │ │ valid.  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-db (SQLite)                             │   │
//! │  │        repositories, change feed, transactional settlement      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, ExpenseLog, DailyRecord)
//! - [`money`] - Integer money in minor units
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`pricing`] - Effective unit and pack prices
//! - [`cart`] - Multi-unit cart with per-product stock ceilings
//! - [`checkout`] - Cart → Sales, stock decrements, receipt
//! - [`aggregation`] - Daily summaries, profitability, capital and ROI
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::cart::Cart;
//! use duka_core::{Money, NewProduct, UnitType};
//!
//! let soda = NewProduct {
//!     name: "Soda 500ml".into(),
//!     sku: "SODA-500".into(),
//!     category: "Drinks".into(),
//!     buy_price: Money::from_minor(1000),
//!     sell_price: Money::from_minor(1500),
//!     quantity: 10,
//!     min_threshold: 2,
//!     discount_bps: None,
//! }
//! .into_product("shop-1", chrono::Utc::now());
//!
//! let mut cart = Cart::new();
//! cart.add_single_unit(&soda).unwrap();
//!
//! // a dozen needs 12 units, only 9 are left
//! assert!(cart
//!     .add_pack(&soda, UnitType::dozen(), 12, Money::from_minor(15000), 1)
//!     .is_err());
//! assert_eq!(cart.total().minor(), 1500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLineItem, CartTotals, LineKey};
pub use checkout::{Receipt, Settlement};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Largest pack the pack dialog accepts (base units per pack).
pub const MAX_UNITS_PER_PACK: i64 = 10_000;

/// Largest pack quantity on one line.
pub const MAX_PACK_QUANTITY: i64 = 9_999;

/// Largest unit or pack price, in minor units.
///
/// A full cart at this price stays below `i64::MAX`:
/// `MAX_CART_LINES * MAX_PACK_QUANTITY * MAX_PRICE < 10^18`.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

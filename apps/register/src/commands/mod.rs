//! # Register Commands
//!
//! Everything the register UI can ask of the backend.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── product.rs  ◄─── Catalog search, CRUD
//! ├── cart.rs     ◄─── Singles, packs, quantities, review
//! ├── sale.rs     ◄─── Checkout, receipts, sale deletion
//! ├── ledger.rs   ◄─── Opening balances, expenses, stock purchases
//! ├── report.rs   ◄─── Daily summary, profitability, dead stock, ROI
//! └── config.rs   ◄─── Configuration retrieval
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI action ("+ Dozen" on Soda 500ml)                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  commands::cart::add_pack(&db, &cart, &config, request)                 │
//! │         │                                                               │
//! │         ├── duka_db:   fresh product row (stock, version)               │
//! │         ├── duka_core: Cart::add_pack (ceiling check)                   │
//! │         └── CartState: write-through to the seller's slot               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Result<CartResponse, ApiError>  (JSON, camelCase)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection (Option B)
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs the cart
//! fn get_cart(cart: &CartState)
//!
//! // Needs database and cart
//! async fn add_single_unit(db: &DbState, cart: &CartState, config: &ConfigState, ...)
//!
//! // Only needs the catalog cache
//! fn list_catalog(catalog: &CatalogState, ...)
//! ```

pub mod cart;
pub mod config;
pub mod ledger;
pub mod product;
pub mod report;
pub mod sale;

//! # Repository Module
//!
//! Per-entity persistence for Duka POS.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register command                                                       │
//! │       │   db.products().search(shop_id, "soda", 20)                     │
//! │       ▼                                                                 │
//! │  Repository  (pool + change feed)                                       │
//! │  ├── list / get                 read only                              │
//! │  ├── insert / update / delete   write ──► COMMIT ──► ChangeEvent       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query is scoped by `shop_id`. Writes that span tables (checkout,
//! sale deletion, purchases) share connection-level helpers so they can run
//! inside one transaction.
//!
//! - [`ProductRepository`] - catalog CRUD, search and stock adjustments
//! - [`SaleRepository`] - sale history and reversal
//! - [`ExpenseRepository`] - expenses and stock purchases
//! - [`DailyRecordRepository`] - opening balances
//! - [`SettlementRepository`] - atomic checkout commit

pub mod daily_record;
pub mod expense;
pub mod product;
pub mod sale;
pub mod settlement;

pub use daily_record::DailyRecordRepository;
pub use expense::{ExpenseFilter, ExpenseRepository};
pub use product::ProductRepository;
pub use sale::{SaleFilter, SaleRepository};
pub use settlement::SettlementRepository;

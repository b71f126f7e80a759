//! # duka-db: Persistence for Duka POS
//!
//! SQLite storage through `sqlx`, organised as one repository per entity
//! over a shared pool, plus an in-process change feed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  duka-register (commands, cart session, catalog cache)                  │
//! │       │                                      ▲                          │
//! │       ▼                                      │ ChangeSubscription       │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    duka-db (THIS CRATE)                          │   │
//! │  │  Database ── pool.rs       repositories     migrations           │   │
//! │  │  SqlitePool                products         001_initial_schema   │   │
//! │  │  ChangeFeed ── feed.rs     sales                                 │   │
//! │  │                            expenses                              │   │
//! │  │                            daily_records                         │   │
//! │  │                            settlements (checkout)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file under the register's data directory                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("duka.db")).await?;
//! let products = db.products().search("shop-1", "soda", 20).await?;
//! db.settlements().commit("shop-1", &settlement).await?;
//! ```

pub mod error;
pub mod feed;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription, Entity};
pub use pool::{Database, DbConfig};
pub use repository::{
    DailyRecordRepository, ExpenseFilter, ExpenseRepository, ProductRepository, SaleFilter,
    SaleRepository, SettlementRepository,
};

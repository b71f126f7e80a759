//! # State Module
//!
//! Separate state types instead of one `AppState`: each command takes only
//! the state it needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │   DbState    │  │  CartState   │  │ CatalogState │  │ ConfigState│  │
//! │  │              │  │              │  │              │  │            │  │
//! │  │  Database    │  │  Mutex<Cart> │  │  RwLock<     │  │  shop,     │  │
//! │  │  (pool +     │  │  + durable   │  │   Vec<Product│  │  seller,   │  │
//! │  │   feed)      │  │    slot      │  │  >>          │  │  offset    │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘  │
//! │                                                                         │
//! │  DbState: pool is thread-safe                                          │
//! │  CartState: one mutex per seller session                               │
//! │  CatalogState: written only by the watch task                          │
//! │  ConfigState: read-only after startup                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod catalog;
mod config;
mod db;

pub use cart::{CartState, CartStore, FileCartStore, MemoryCartStore};
pub use catalog::CatalogState;
pub use config::{ConfigError, ConfigState, CONFIG_FILE_NAME, DATABASE_FILE_NAME};
pub use db::DbState;

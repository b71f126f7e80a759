//! # Duka Register Library
//!
//! The seller-facing register: configuration, the seller's cart session and
//! the commands a register UI calls.
//!
//! ## Module Organization
//! ```text
//! duka_register/
//! ├── lib.rs          ◄─── You are here (bootstrap & tracing)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Cart session + durable slot
//! │   ├── catalog.rs  ◄─── Product cache fed by the change feed
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── product.rs  ◄─── Catalog search/CRUD
//! │   ├── cart.rs     ◄─── Singles, packs, quantities
//! │   ├── sale.rs     ◄─── Checkout and sale history
//! │   ├── ledger.rs   ◄─── Opening balance, expenses, purchases
//! │   ├── report.rs   ◄─── Daily summary, profitability, ROI
//! │   └── config.rs   ◄─── Configuration retrieval
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Option B: Multiple State Types)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌────────────┐ ┌──────────────┐ ┌──────────────┐ ┌─────────────────┐  │
//! │  │  DbState   │ │  CartState   │ │ CatalogState │ │  ConfigState    │  │
//! │  │ pool+feed  │ │ seller cart  │ │ product cache│ │ shop, seller,   │  │
//! │  │            │ │ + file slot  │ │ (watch task) │ │ currency, offset│  │
//! │  └────────────┘ └──────────────┘ └──────────────┘ └─────────────────┘  │
//! │                                                                         │
//! │  Each command takes only the state it needs.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duka_db::{Database, DbConfig, DbError};
use state::{CartState, CatalogState, ConfigError, ConfigState, DbState, FileCartStore};

/// Why the register could not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A running register session: every state object the commands need.
#[derive(Debug)]
pub struct Register {
    pub db: DbState,
    pub cart: CartState,
    pub config: ConfigState,
    pub catalog: Arc<CatalogState>,
    catalog_watch: JoinHandle<()>,
}

impl Register {
    /// Opens the register for the configured shop and seller.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. Data directory ───► created if missing                              │
    /// │  2. Database ─────────► SQLite (WAL), pending migrations applied        │
    /// │  3. Cart ─────────────► restored from <data_dir>/carts/<shop>--<seller> │
    /// │  4. Catalog ──────────► listed once, then kept fresh by the change feed │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn bootstrap(config: ConfigState) -> Result<Self, StartupError> {
        let data_dir = config.data_dir()?;
        std::fs::create_dir_all(&data_dir).map_err(|source| StartupError::DataDir {
            path: data_dir.clone(),
            source,
        })?;

        let db_path = config.database_path()?;
        info!(db_path = %db_path.display(), "Opening database");
        let db = Database::new(DbConfig::new(db_path)).await?;

        Self::open(config, db, &data_dir).await
    }

    /// Builds the session over an already opened database.
    pub async fn open(config: ConfigState, db: Database, data_dir: &Path) -> Result<Self, StartupError> {
        let cart = CartState::restore(FileCartStore::for_session(
            data_dir,
            &config.shop_id,
            &config.seller_id,
        ));

        let catalog = Arc::new(CatalogState::new());
        let count = catalog.refresh(&db, &config.shop_id).await?;
        let catalog_watch = catalog.watch(db.clone(), config.shop_id.clone());

        info!(
            shop_id = %config.shop_id,
            seller_id = %config.seller_id,
            products = count,
            "Register ready"
        );

        Ok(Register {
            db: DbState::new(db),
            cart,
            config,
            catalog,
            catalog_watch,
        })
    }

    /// Stops the catalog watch and closes the pool.
    pub async fn shutdown(self) {
        self.catalog_watch.abort();
        self.db.inner().close().await;
        info!("Register closed");
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=duka=trace` - Show trace for duka crates only
/// - Default: `info,duka=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,duka=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

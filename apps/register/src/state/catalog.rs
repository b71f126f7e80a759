//! # Catalog State
//!
//! A read cache of the shop's products for search-as-you-type and stock
//! badges, kept fresh by the database change feed.
//!
//! ```text
//! Database::subscribe(shop_id)
//!      │  Product/* or Resync
//!      ▼
//! watch task ──► db.products().list(shop_id) ──► RwLock<Vec<Product>>
//! ```
//!
//! Cart commands do not trust this cache for stock checks; they read the
//! product row. Checkout's version guard catches anything stale either way.

use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use duka_core::Product;
use duka_db::{Database, DbResult, Entity};

#[derive(Debug, Default)]
pub struct CatalogState {
    products: RwLock<Vec<Product>>,
}

impl CatalogState {
    pub fn new() -> Self {
        CatalogState::default()
    }

    /// Re-lists the shop's products into the cache.
    pub async fn refresh(&self, db: &Database, shop_id: &str) -> DbResult<usize> {
        let products = db.products().list(shop_id).await?;
        let count = products.len();
        *self.products.write().expect("catalog lock poisoned") = products;
        debug!(shop_id, count, "Catalog refreshed");
        Ok(count)
    }

    pub fn all(&self) -> Vec<Product> {
        self.products.read().expect("catalog lock poisoned").clone()
    }

    pub fn get(&self, product_id: &str) -> Option<Product> {
        self.products
            .read()
            .expect("catalog lock poisoned")
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
    }

    /// Case-insensitive name/SKU filter over the cache.
    pub fn filter(&self, query: &str, limit: usize) -> Vec<Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .read()
            .expect("catalog lock poisoned")
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.sku.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Spawns the task that re-lists products on every product change.
    ///
    /// Subscribes before returning, so no change committed after this call
    /// is missed. The task ends when the feed closes.
    pub fn watch(self: &Arc<Self>, db: Database, shop_id: String) -> JoinHandle<()> {
        let mut changes = db.subscribe(shop_id.clone());
        let catalog = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(event) = changes.recv().await {
                if !event.touches(Entity::Product) {
                    continue;
                }
                if let Err(e) = catalog.refresh(&db, &shop_id).await {
                    warn!(shop_id = %shop_id, error = %e, "Catalog refresh failed");
                }
            }
            debug!(shop_id = %shop_id, "Catalog watch ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duka_core::{Money, NewProduct};
    use duka_db::DbConfig;
    use std::time::Duration;

    fn product(name: &str, sku: &str) -> Product {
        NewProduct {
            name: name.to_string(),
            sku: sku.to_string(),
            category: String::new(),
            buy_price: Money::from_minor(100),
            sell_price: Money::from_minor(150),
            quantity: 5,
            min_threshold: 1,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now())
    }

    #[tokio::test]
    async fn test_watch_refreshes_on_product_changes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = Arc::new(CatalogState::new());
        catalog.refresh(&db, "shop-1").await.unwrap();
        let handle = catalog.watch(db.clone(), "shop-1".to_string());

        let soda = db.products().insert(&product("Soda", "SODA")).await.unwrap();
        db.products().insert(&product("Sugar", "SUGAR")).await.unwrap();

        let mut seen = 0;
        for _ in 0..50 {
            seen = catalog.all().len();
            if seen == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen, 2);
        assert_eq!(catalog.filter("sug", 10).len(), 1);
        assert!(catalog.get(&soda.id).is_some());

        handle.abort();
    }
}

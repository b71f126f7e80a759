//! # Product Repository
//!
//! Catalog persistence: list/search, CRUD and stock adjustments.
//!
//! ## Version Stamp
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every write to a product row does   version = version + 1             │
//! │                                                                         │
//! │  edit (update)       WHERE id = ? AND version = <version read>         │
//! │  checkout decrement  WHERE id = ? AND version = <version in cart>      │
//! │  purchase / reversal WHERE id = ?            (delta, always applies)   │
//! │                                                                         │
//! │  A guarded write that touches 0 rows means someone else wrote first.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Entity};
use duka_core::{Money, Product};

const PRODUCT_COLUMNS: &str = "id, shop_id, name, sku, category, buy_price, sell_price, quantity, \
     min_threshold, discount_bps, version, created_at, updated_at";

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: String,
    shop_id: String,
    name: String,
    sku: String,
    category: String,
    buy_price: i64,
    sell_price: i64,
    quantity: i64,
    min_threshold: i64,
    discount_bps: Option<i64>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            sku: row.sku,
            category: row.category,
            buy_price: Money::from_minor(row.buy_price),
            sell_price: Money::from_minor(row.sell_price),
            quantity: row.quantity,
            min_threshold: row.min_threshold,
            discount_bps: row.discount_bps.and_then(|bps| u32::try_from(bps).ok()),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ProductRepository { pool, feed }
    }

    /// Lists a shop's catalog, by name.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 ORDER BY name, sku"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(shop_id, count = rows.len(), "Listed products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Searches name and SKU (case-insensitive substring). Empty lists all.
    pub async fn search(&self, shop_id: &str, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(shop_id, query, limit, "Searching products");

        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE shop_id = ?1 \
               AND (name LIKE ?2 ESCAPE '\\' OR sku LIKE ?2 ESCAPE '\\') \
             ORDER BY name, sku \
             LIMIT ?3"
        ))
        .bind(shop_id)
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, shop_id, id).await
    }

    pub async fn get_by_sku(&self, shop_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 AND sku = ?2"
        ))
        .bind(shop_id)
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already used in this shop
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(shop_id = %product.shop_id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, shop_id, name, sku, category,
                buy_price, sell_price, quantity, min_threshold, discount_bps,
                version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.buy_price.minor())
        .bind(product.sell_price.minor())
        .bind(product.quantity)
        .bind(product.min_threshold)
        .bind(product.discount_bps.map(i64::from))
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        self.feed.publish(ChangeEvent::new(
            &product.shop_id,
            Entity::Product,
            ChangeKind::Insert,
            &product.id,
        ));
        Ok(product.clone())
    }

    /// Writes an edited product.
    ///
    /// `product.version` must be the version that was read; the stored row is
    /// only replaced if nobody wrote in between.
    ///
    /// ## Returns
    /// * `Ok(Product)` - stored product, with its new version
    /// * `Err(DbError::Conflict)` - the row changed since it was read
    /// * `Err(DbError::NotFound)` - the product is gone
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, version = product.version, "Updating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                sku = ?4,
                category = ?5,
                buy_price = ?6,
                sell_price = ?7,
                quantity = ?8,
                min_threshold = ?9,
                discount_bps = ?10,
                updated_at = ?11,
                version = version + 1
            WHERE shop_id = ?1 AND id = ?2 AND version = ?12
            "#,
        )
        .bind(&product.shop_id)
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.buy_price.minor())
        .bind(product.sell_price.minor())
        .bind(product.quantity)
        .bind(product.min_threshold)
        .bind(product.discount_bps.map(i64::from))
        .bind(now)
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(&product.shop_id, &product.id).await? {
                Some(_) => Err(DbError::Conflict {
                    entity: "Product".to_string(),
                    id: product.id.clone(),
                }),
                None => Err(DbError::not_found("Product", &product.id)),
            };
        }

        self.feed.publish(ChangeEvent::new(
            &product.shop_id,
            Entity::Product,
            ChangeKind::Update,
            &product.id,
        ));

        Ok(Product {
            version: product.version + 1,
            updated_at: now,
            ..product.clone()
        })
    }

    /// Adds `delta` base units to stock (negative to remove).
    ///
    /// Always applies; stock never goes below zero.
    pub async fn adjust_stock(&self, shop_id: &str, id: &str, delta: i64) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;
        adjust_stock(&mut tx, shop_id, id, delta).await?;
        let product = fetch_product(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        tx.commit().await?;

        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::Product, ChangeKind::Update, id));
        Ok(product)
    }

    /// Deletes a product. Past sales keep their snapshot of it.
    pub async fn delete(&self, shop_id: &str, id: &str) -> DbResult<()> {
        debug!(shop_id, id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE shop_id = ?1 AND id = ?2")
            .bind(shop_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::Product, ChangeKind::Delete, id));
        Ok(())
    }

    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with transactional repositories)
// =============================================================================

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 AND id = ?2"
    ))
    .bind(shop_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Product::from))
}

/// Delta stock update that floors at zero and bumps the version.
///
/// Returns `false` when the product no longer exists.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
    delta: i64,
) -> DbResult<bool> {
    debug!(shop_id, id, delta, "Adjusting stock");

    let current: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM products WHERE shop_id = ?1 AND id = ?2")
            .bind(shop_id)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(current) = current else {
        return Ok(false);
    };
    if current + delta < 0 {
        warn!(
            id,
            current,
            delta,
            "Stock adjustment would go negative, flooring at zero"
        );
    }

    sqlx::query(
        r#"
        UPDATE products SET
            quantity = MAX(quantity + ?3, 0),
            version = version + 1,
            updated_at = ?4
        WHERE shop_id = ?1 AND id = ?2
        "#,
    )
    .bind(shop_id)
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(true)
}

/// Version-guarded decrement used by checkout.
///
/// Returns `false` when the version moved or stock is short.
pub(crate) async fn decrement_if_version(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
    units: i64,
    expected_version: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            quantity = quantity - ?3,
            version = version + 1,
            updated_at = ?5
        WHERE shop_id = ?1 AND id = ?2 AND version = ?4 AND quantity >= ?3
        "#,
    )
    .bind(shop_id)
    .bind(id)
    .bind(units)
    .bind(expected_version)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use duka_core::{NewProduct, ProductPatch};

    fn soda(shop_id: &str) -> Product {
        NewProduct {
            name: "Soda 500ml".to_string(),
            sku: "SODA-500".to_string(),
            category: "Drinks".to_string(),
            buy_price: Money::from_minor(1000),
            sell_price: Money::from_minor(1500),
            quantity: 10,
            min_threshold: 2,
            discount_bps: None,
        }
        .into_product(shop_id, Utc::now())
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let product = soda("shop-1");
        db.products().insert(&product).await.unwrap();

        let fetched = db.products().get_by_id("shop-1", &product.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Soda 500ml");
        assert_eq!(fetched.buy_price.minor(), 1000);
        assert_eq!(fetched.version, 0);

        // other shops cannot see it
        assert!(db.products().get_by_id("shop-2", &product.id).await.unwrap().is_none());
        assert!(db.products().get_by_sku("shop-1", "SODA-500").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_sku_per_shop() {
        let db = db().await;
        db.products().insert(&soda("shop-1")).await.unwrap();

        let err = db.products().insert(&soda("shop-1")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // same SKU in another shop is fine
        db.products().insert(&soda("shop-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_detects_stale_writes() {
        let db = db().await;
        let product = db.products().insert(&soda("shop-1")).await.unwrap();

        let mut edited = product.clone();
        ProductPatch {
            sell_price: Some(Money::from_minor(1600)),
            discount_bps: Some(Some(500)),
            ..Default::default()
        }
        .apply(&mut edited);
        let stored = db.products().update(&edited).await.unwrap();
        assert_eq!(stored.version, 1);

        let fetched = db.products().get_by_id("shop-1", &product.id).await.unwrap().unwrap();
        assert_eq!(fetched.sell_price.minor(), 1600);
        assert_eq!(fetched.discount_bps, Some(500));

        // writing the stale copy again conflicts
        let err = db.products().update(&edited).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_search_and_list() {
        let db = db().await;
        db.products().insert(&soda("shop-1")).await.unwrap();
        let mut sugar = soda("shop-1");
        sugar.id = uuid::Uuid::new_v4().to_string();
        sugar.name = "Sugar 1kg".to_string();
        sugar.sku = "SUGAR-1KG".to_string();
        db.products().insert(&sugar).await.unwrap();

        assert_eq!(db.products().list("shop-1").await.unwrap().len(), 2);
        assert_eq!(db.products().search("shop-1", "sug", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("shop-1", "500", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("shop-1", "", 10).await.unwrap().len(), 2);
        assert_eq!(db.products().count("shop-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_floors_at_zero() {
        let db = db().await;
        let product = db.products().insert(&soda("shop-1")).await.unwrap();

        let p = db.products().adjust_stock("shop-1", &product.id, 5).await.unwrap();
        assert_eq!(p.quantity, 15);
        assert_eq!(p.version, 1);

        let p = db.products().adjust_stock("shop-1", &product.id, -20).await.unwrap();
        assert_eq!(p.quantity, 0);
    }

    #[tokio::test]
    async fn test_delete_publishes_change() {
        let db = db().await;
        let product = db.products().insert(&soda("shop-1")).await.unwrap();
        let mut sub = db.subscribe("shop-1");

        db.products().delete("shop-1", &product.id).await.unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.id, product.id);
        assert!(matches!(
            db.products().delete("shop-1", &product.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}

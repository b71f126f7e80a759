//! # Sale Repository
//!
//! Sales are written only by checkout (see [`super::settlement`]) and are
//! immutable afterwards. The one administrative operation is deletion, which
//! puts the sold units back on the shelf in the same transaction.
//!
//! ```text
//! delete(sale)
//!   BEGIN
//!     DELETE FROM sales WHERE id = ?
//!     UPDATE products SET quantity = quantity + sale.quantity   (if still listed)
//!   COMMIT ──► Sale/Delete + Product/Update events
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Entity};
use crate::repository::product::adjust_stock;
use duka_core::{Money, PaymentMethod, Sale, SaleMetadata, UnitType};

const SALE_COLUMNS: &str = "id, shop_id, product_id, product_name, quantity, unit_price, \
     total_price, total_cost, profit, timestamp, seller_id, seller_name, receipt_id, \
     payment_method, unit_type, pack_size, pack_price, pack_quantity";

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    shop_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price: i64,
    total_price: i64,
    total_cost: i64,
    profit: i64,
    timestamp: DateTime<Utc>,
    seller_id: String,
    seller_name: String,
    receipt_id: String,
    payment_method: PaymentMethod,
    unit_type: String,
    pack_size: i64,
    pack_price: i64,
    pack_quantity: i64,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            shop_id: row.shop_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            total_price: Money::from_minor(row.total_price),
            total_cost: Money::from_minor(row.total_cost),
            profit: Money::from_minor(row.profit),
            timestamp: row.timestamp,
            seller_id: row.seller_id,
            seller_name: row.seller_name,
            receipt_id: row.receipt_id,
            payment_method: row.payment_method,
            metadata: SaleMetadata {
                unit_type: UnitType::new(row.unit_type),
                pack_size: row.pack_size,
                pack_price: Money::from_minor(row.pack_price),
                pack_quantity: row.pack_quantity,
            },
        }
    }
}

/// Filter for [`SaleRepository::list`]. Empty matches every sale of the shop.
///
/// `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub seller_id: Option<String>,
    pub product_id: Option<String>,
    pub receipt_id: Option<String>,
}

impl SaleFilter {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        SaleFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    pub fn receipt(receipt_id: impl Into<String>) -> Self {
        SaleFilter {
            receipt_id: Some(receipt_id.into()),
            ..Default::default()
        }
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        SaleRepository { pool, feed }
    }

    /// Lists sales oldest first.
    pub async fn list(&self, shop_id: &str, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE shop_id = "));
        qb.push_bind(shop_id.to_string());

        if let Some(from) = filter.from {
            qb.push(" AND timestamp >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND timestamp < ").push_bind(to);
        }
        if let Some(seller_id) = &filter.seller_id {
            qb.push(" AND seller_id = ").push_bind(seller_id.clone());
        }
        if let Some(product_id) = &filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id.clone());
        }
        if let Some(receipt_id) = &filter.receipt_id {
            qb.push(" AND receipt_id = ").push_bind(receipt_id.clone());
        }
        qb.push(" ORDER BY timestamp, receipt_id, id");

        let rows: Vec<SaleRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        debug!(shop_id, count = rows.len(), "Listed sales");
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, shop_id, id).await
    }

    /// Deletes a sale and returns its units to stock.
    ///
    /// If the product has since been deleted the sale is still removed and
    /// the reversal is skipped.
    pub async fn delete(&self, shop_id: &str, id: &str) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        sqlx::query("DELETE FROM sales WHERE shop_id = ?1 AND id = ?2")
            .bind(shop_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let restocked = adjust_stock(&mut tx, shop_id, &sale.product_id, sale.quantity).await?;
        if !restocked {
            warn!(sale_id = id, product_id = %sale.product_id, "Product gone, stock not reversed");
        }

        tx.commit().await?;
        info!(
            sale_id = id,
            receipt_id = %sale.receipt_id,
            units = sale.quantity,
            "Sale deleted and stock reversed"
        );

        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::Sale, ChangeKind::Delete, id));
        if restocked {
            self.feed.publish(ChangeEvent::new(
                shop_id,
                Entity::Product,
                ChangeKind::Update,
                &sale.product_id,
            ));
        }
        Ok(sale)
    }

    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, shop_id: &str, id: &str) -> DbResult<Option<Sale>> {
    let row: Option<SaleRow> = sqlx::query_as(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE shop_id = ?1 AND id = ?2"
    ))
    .bind(shop_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Sale::from))
}

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, receipt_id = %sale.receipt_id, "Inserting sale");

    sqlx::query(&format!(
        "INSERT INTO sales ({SALE_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
    ))
    .bind(&sale.id)
    .bind(&sale.shop_id)
    .bind(&sale.product_id)
    .bind(&sale.product_name)
    .bind(sale.quantity)
    .bind(sale.unit_price.minor())
    .bind(sale.total_price.minor())
    .bind(sale.total_cost.minor())
    .bind(sale.profit.minor())
    .bind(sale.timestamp)
    .bind(&sale.seller_id)
    .bind(&sale.seller_name)
    .bind(&sale.receipt_id)
    .bind(sale.payment_method)
    .bind(sale.metadata.unit_type.as_str())
    .bind(sale.metadata.pack_size)
    .bind(sale.metadata.pack_price.minor())
    .bind(sale.metadata.pack_quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

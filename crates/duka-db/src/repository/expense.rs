//! # Expense Repository
//!
//! Money outflows, including stock purchases.
//!
//! A purchase is an expense in the STOCK category whose `metadata` column
//! holds the JSON purchase details. When the purchase names a catalog
//! product, recording it restocks that product and deleting it takes the
//! units back out, each in the same transaction as the expense row.
//!
//! ```text
//! insert(purchase)                      delete(purchase)
//!   BEGIN                                 BEGIN
//!     INSERT INTO expenses                  DELETE FROM expenses
//!     quantity += details.quantity          quantity -= details.quantity (floor 0)
//!   COMMIT                                COMMIT
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Entity};
use crate::repository::product::adjust_stock;
use duka_core::{ExpenseCategory, ExpenseLog, ExpenseMetadata, ExpensePatch, Money};

const EXPENSE_COLUMNS: &str =
    "id, shop_id, date, category, amount, description, metadata, created_at";

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: String,
    shop_id: String,
    date: NaiveDate,
    category: String,
    amount: i64,
    description: String,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExpenseRow {
    fn into_expense(self) -> DbResult<ExpenseLog> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<ExpenseMetadata>)
            .transpose()?;

        Ok(ExpenseLog {
            id: self.id,
            shop_id: self.shop_id,
            date: self.date,
            category: ExpenseCategory::new(self.category),
            amount: Money::from_minor(self.amount),
            description: self.description,
            metadata,
            created_at: self.created_at,
        })
    }
}

/// Filter for [`ExpenseRepository::list`]. Both dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
}

impl ExpenseFilter {
    pub fn on(date: NaiveDate) -> Self {
        ExpenseFilter {
            from: Some(date),
            to: Some(date),
            category: None,
        }
    }
}

/// Repository for expense and purchase database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ExpenseRepository { pool, feed }
    }

    /// Lists expenses by date, oldest first.
    pub async fn list(&self, shop_id: &str, filter: &ExpenseFilter) -> DbResult<Vec<ExpenseLog>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE shop_id = "));
        qb.push_bind(shop_id.to_string());

        if let Some(from) = filter.from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND date <= ").push_bind(to);
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.as_str().to_string());
        }
        qb.push(" ORDER BY date, created_at, id");

        let rows: Vec<ExpenseRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        debug!(shop_id, count = rows.len(), "Listed expenses");
        rows.into_iter().map(ExpenseRow::into_expense).collect()
    }

    pub async fn get_by_id(&self, shop_id: &str, id: &str) -> DbResult<Option<ExpenseLog>> {
        let mut conn = self.pool.acquire().await?;
        fetch_expense(&mut conn, shop_id, id).await
    }

    /// Records an expense. A purchase naming a catalog product also restocks it.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the purchased product does not exist;
    ///   nothing is written
    pub async fn insert(&self, expense: &ExpenseLog) -> DbResult<ExpenseLog> {
        debug!(
            shop_id = %expense.shop_id,
            category = %expense.category,
            amount = expense.amount.minor(),
            "Inserting expense"
        );

        let metadata = expense
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO expenses ({EXPENSE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(&expense.id)
        .bind(&expense.shop_id)
        .bind(expense.date)
        .bind(expense.category.as_str())
        .bind(expense.amount.minor())
        .bind(&expense.description)
        .bind(metadata)
        .bind(expense.created_at)
        .execute(&mut *tx)
        .await?;

        let restocked = match restock_target(expense) {
            Some((product_id, units)) => {
                if !adjust_stock(&mut tx, &expense.shop_id, product_id, units).await? {
                    return Err(DbError::not_found("Product", product_id));
                }
                Some(product_id)
            }
            None => None,
        };

        tx.commit().await?;

        if let Some(product_id) = restocked {
            info!(
                expense_id = %expense.id,
                product_id,
                "Purchase recorded and stock increased"
            );
            self.feed.publish(ChangeEvent::new(
                &expense.shop_id,
                Entity::Product,
                ChangeKind::Update,
                product_id,
            ));
        }
        self.feed.publish(ChangeEvent::new(
            &expense.shop_id,
            Entity::Expense,
            ChangeKind::Insert,
            &expense.id,
        ));
        Ok(expense.clone())
    }

    /// Applies a partial edit.
    ///
    /// ## Returns
    /// * `Err(DbError::ConstraintViolation)` - amount edit on a purchase
    /// * `Err(DbError::NotFound)` - no such expense
    pub async fn update(&self, shop_id: &str, id: &str, patch: &ExpensePatch) -> DbResult<ExpenseLog> {
        debug!(shop_id, id, "Updating expense");

        let mut tx = self.pool.begin().await?;
        let mut expense = fetch_expense(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))?;

        if expense.purchase().is_some() && patch.amount.is_some() {
            return Err(DbError::ConstraintViolation {
                message: "purchase amount follows its details and cannot be edited".to_string(),
            });
        }
        patch.apply(&mut expense);

        sqlx::query(
            "UPDATE expenses SET date = ?3, amount = ?4, description = ?5 \
             WHERE shop_id = ?1 AND id = ?2",
        )
        .bind(shop_id)
        .bind(id)
        .bind(expense.date)
        .bind(expense.amount.minor())
        .bind(&expense.description)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::Expense, ChangeKind::Update, id));
        Ok(expense)
    }

    /// Deletes an expense. Deleting a purchase takes its units back out of
    /// stock, flooring at zero if some were already sold.
    pub async fn delete(&self, shop_id: &str, id: &str) -> DbResult<ExpenseLog> {
        let mut tx = self.pool.begin().await?;

        let expense = fetch_expense(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))?;

        sqlx::query("DELETE FROM expenses WHERE shop_id = ?1 AND id = ?2")
            .bind(shop_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut unstocked = None;
        if let Some((product_id, units)) = restock_target(&expense) {
            if adjust_stock(&mut tx, shop_id, product_id, -units).await? {
                unstocked = Some(product_id.to_string());
            } else {
                warn!(expense_id = id, product_id, "Product gone, purchase stock not reversed");
            }
        }

        tx.commit().await?;
        debug!(shop_id, id, category = %expense.category, "Expense deleted");

        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::Expense, ChangeKind::Delete, id));
        if let Some(product_id) = unstocked {
            self.feed.publish(ChangeEvent::new(
                shop_id,
                Entity::Product,
                ChangeKind::Update,
                product_id,
            ));
        }
        Ok(expense)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `(product_id, units)` a purchase moves into stock, if it names a product.
fn restock_target(expense: &ExpenseLog) -> Option<(&str, i64)> {
    let details = expense.purchase()?;
    let product_id = details.product_id.as_deref()?;
    Some((product_id, details.quantity))
}

async fn fetch_expense(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<ExpenseLog>> {
    let row: Option<ExpenseRow> = sqlx::query_as(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE shop_id = ?1 AND id = ?2"
    ))
    .bind(shop_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(ExpenseRow::into_expense).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use duka_core::{NewExpense, NewProduct, NewPurchase, Product};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    async fn db_with_sugar() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sugar = NewProduct {
            name: "Sugar 1kg".to_string(),
            sku: "SUGAR-1KG".to_string(),
            category: "Groceries".to_string(),
            buy_price: Money::from_minor(300),
            sell_price: Money::from_minor(400),
            quantity: 5,
            min_threshold: 2,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now());
        let sugar = db.products().insert(&sugar).await.unwrap();
        (db, sugar)
    }

    fn purchase(product: &Product, quantity: i64) -> ExpenseLog {
        NewPurchase {
            date: day(),
            product_id: Some(product.id.clone()),
            product_name: product.name.clone(),
            quantity,
            unit_price: Money::from_minor(300),
            amount_paid: Some(Money::from_minor(1000)),
            description: String::new(),
        }
        .into_expense("shop-1", Utc::now())
    }

    #[tokio::test]
    async fn test_purchase_restocks_and_round_trips_metadata() {
        let (db, sugar) = db_with_sugar().await;
        let entry = purchase(&sugar, 10);
        db.expenses().insert(&entry).await.unwrap();

        let stocked = db.products().get_by_id("shop-1", &sugar.id).await.unwrap().unwrap();
        assert_eq!(stocked.quantity, 15);

        let listed = db.expenses().list("shop-1", &ExpenseFilter::on(day())).await.unwrap();
        assert_eq!(listed.len(), 1);
        let details = listed[0].purchase().unwrap();
        assert_eq!(details.total_cost.minor(), 3000);
        assert_eq!(details.amount_remained.minor(), 2000);
        assert_eq!(listed[0].description, "Purchase: Sugar 1kg x10");
    }

    #[tokio::test]
    async fn test_purchase_of_unknown_product_writes_nothing() {
        let (db, sugar) = db_with_sugar().await;
        let mut ghost = sugar.clone();
        ghost.id = uuid::Uuid::new_v4().to_string();

        let err = db.expenses().insert(&purchase(&ghost, 3)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db
            .expenses()
            .list("shop-1", &ExpenseFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_deleting_purchase_floors_stock() {
        let (db, sugar) = db_with_sugar().await;
        let entry = purchase(&sugar, 10);
        db.expenses().insert(&entry).await.unwrap();
        db.products().adjust_stock("shop-1", &sugar.id, -12).await.unwrap();

        let deleted = db.expenses().delete("shop-1", &entry.id).await.unwrap();
        assert_eq!(deleted.id, entry.id);

        let product = db.products().get_by_id("shop-1", &sugar.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 0);
        assert!(db.expenses().get_by_id("shop-1", &entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_plain_expense_but_not_purchase_amount() {
        let (db, sugar) = db_with_sugar().await;
        let rent = NewExpense {
            date: day(),
            category: ExpenseCategory::new("rent"),
            amount: Money::from_minor(5000),
            description: "March rent".to_string(),
        }
        .into_expense("shop-1", Utc::now());
        db.expenses().insert(&rent).await.unwrap();

        let patch = ExpensePatch {
            amount: Some(Money::from_minor(5500)),
            ..Default::default()
        };
        let updated = db.expenses().update("shop-1", &rent.id, &patch).await.unwrap();
        assert_eq!(updated.amount.minor(), 5500);
        assert_eq!(updated.category.as_str(), "RENT");

        let entry = purchase(&sugar, 2);
        db.expenses().insert(&entry).await.unwrap();
        let err = db.expenses().update("shop-1", &entry.id, &patch).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation { .. }));

        let filter = ExpenseFilter {
            category: Some(ExpenseCategory::stock()),
            ..Default::default()
        };
        assert_eq!(db.expenses().list("shop-1", &filter).await.unwrap().len(), 1);
    }
}

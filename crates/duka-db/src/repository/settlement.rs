//! # Settlement Repository
//!
//! Commits a checkout as one all-or-nothing transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(settlement)                                                     │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   for each product in the cart (grouped):                               │
//! │     UPDATE products SET quantity = quantity - units, version + 1        │
//! │      WHERE id = ? AND version = <cart version> AND quantity >= units    │
//! │     0 rows? ──► ROLLBACK, Err(StockConflict)   (cart stays intact)      │
//! │   for each line:                                                        │
//! │     INSERT INTO sales (...)                                             │
//! │  COMMIT ──► Sale/Insert + Product/Update events                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller clears the cart only after `commit` returns `Ok`.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Entity};
use crate::repository::product::decrement_if_version;
use crate::repository::sale::insert_sale;
use duka_core::Settlement;

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        SettlementRepository { pool, feed }
    }

    /// Writes every sale and stock decrement of a settlement, or nothing.
    ///
    /// ## Returns
    /// * `Err(DbError::StockConflict)` - a product changed or ran short since
    ///   the cart last saw it; review the cart and retry
    pub async fn commit(&self, shop_id: &str, settlement: &Settlement) -> DbResult<()> {
        let decrements = settlement.decrements_by_product();
        let mut tx = self.pool.begin().await?;

        for dec in &decrements {
            let applied = decrement_if_version(
                &mut tx,
                shop_id,
                &dec.product_id,
                dec.units,
                dec.expected_version,
                settlement.timestamp,
            )
            .await?;

            if !applied {
                warn!(
                    receipt_id = %settlement.receipt_id,
                    product_id = %dec.product_id,
                    expected_version = dec.expected_version,
                    units = dec.units,
                    "Stock changed since cart was validated, rolling back checkout"
                );
                tx.rollback().await?;
                return Err(DbError::StockConflict {
                    product: dec.product_name.clone(),
                });
            }
        }

        for sale in &settlement.sales {
            if let Err(err) = insert_sale(&mut tx, sale).await {
                error!(
                    receipt_id = %settlement.receipt_id,
                    sale_id = %sale.id,
                    error = %err,
                    "Sale insert failed, rolling back checkout"
                );
                return Err(err);
            }
        }

        tx.commit().await?;
        info!(
            shop_id,
            receipt_id = %settlement.receipt_id,
            sales = settlement.sales.len(),
            total = settlement.total().minor(),
            "Checkout committed"
        );

        self.feed.publish_all(
            settlement
                .sales
                .iter()
                .map(|sale| ChangeEvent::new(shop_id, Entity::Sale, ChangeKind::Insert, &sale.id))
                .chain(decrements.iter().map(|dec| {
                    ChangeEvent::new(shop_id, Entity::Product, ChangeKind::Update, &dec.product_id)
                })),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::SaleFilter;
    use chrono::{FixedOffset, Utc};
    use duka_core::checkout::{settle, CheckoutContext};
    use duka_core::{Cart, Money, NewProduct, PaymentMethod, Product, Seller, UnitType};

    fn soda() -> Product {
        NewProduct {
            name: "Soda 500ml".to_string(),
            sku: "SODA-500".to_string(),
            category: "Drinks".to_string(),
            buy_price: Money::from_minor(1000),
            sell_price: Money::from_minor(1500),
            quantity: 30,
            min_threshold: 2,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now())
    }

    fn ctx() -> CheckoutContext {
        CheckoutContext {
            shop_id: "shop-1".to_string(),
            shop_name: "Mama Duka".to_string(),
            seller: Seller::new("seller-1", "Amina"),
            payment_method: PaymentMethod::MobileMoney,
            now: Utc::now(),
            offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_commit_writes_sales_and_decrements_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&soda()).await.unwrap();
        let mut sub = db.subscribe("shop-1");

        let mut cart = Cart::new();
        cart.add_single_unit(&product).unwrap();
        cart.add_pack(&product, UnitType::dozen(), 12, Money::from_minor(15_000), 2)
            .unwrap();
        let settlement = settle(&cart, &ctx()).unwrap();

        db.settlements().commit("shop-1", &settlement).await.unwrap();

        let stored = db.products().get_by_id("shop-1", &product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 30 - 1 - 24);
        assert_eq!(stored.version, product.version + 1);

        let sales = db
            .sales()
            .list("shop-1", &SaleFilter::receipt(&settlement.receipt_id))
            .await
            .unwrap();
        assert_eq!(sales.len(), 2);
        let total: i64 = sales.iter().map(|s| s.total_price.minor()).sum();
        assert_eq!(total, cart.total().minor());
        assert!(sales.iter().all(|s| s.profit == s.total_price - s.total_cost));
        assert!(sales.iter().all(|s| s.payment_method == PaymentMethod::MobileMoney));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.entity, Entity::Sale);
    }

    #[tokio::test]
    async fn test_stale_version_rolls_back_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&soda()).await.unwrap();

        let mut cart = Cart::new();
        cart.add_single_unit(&product).unwrap();
        let settlement = settle(&cart, &ctx()).unwrap();

        // another register sells first
        db.products().adjust_stock("shop-1", &product.id, -1).await.unwrap();

        let err = db.settlements().commit("shop-1", &settlement).await.unwrap_err();
        assert!(matches!(err, DbError::StockConflict { ref product } if product == "Soda 500ml"));

        assert_eq!(db.sales().count("shop-1").await.unwrap(), 0);
        let stored = db.products().get_by_id("shop-1", &product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 29);
    }

    #[tokio::test]
    async fn test_deleting_sale_restocks() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&soda()).await.unwrap();

        let mut cart = Cart::new();
        cart.add_pack(&product, UnitType::new("Crate"), 24, Money::from_minor(30_000), 1)
            .unwrap();
        let settlement = settle(&cart, &ctx()).unwrap();
        db.settlements().commit("shop-1", &settlement).await.unwrap();

        let sale_id = settlement.sales[0].id.clone();
        let deleted = db.sales().delete("shop-1", &sale_id).await.unwrap();
        assert_eq!(deleted.quantity, 24);
        assert_eq!(deleted.metadata.pack_size, 24);

        let stored = db.products().get_by_id("shop-1", &product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 30);
        assert!(db.sales().get_by_id("shop-1", &sale_id).await.unwrap().is_none());
    }
}

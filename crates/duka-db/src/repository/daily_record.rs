//! # Daily Record Repository
//!
//! One row per shop per local business day. Only the opening balance is
//! stored; everything else in a daily summary is derived from sales and
//! expenses.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, Entity};
use duka_core::{DailyRecord, Money};

#[derive(Debug, FromRow)]
struct DailyRecordRow {
    id: String,
    shop_id: String,
    date: NaiveDate,
    opening_balance: i64,
    updated_at: DateTime<Utc>,
}

impl From<DailyRecordRow> for DailyRecord {
    fn from(row: DailyRecordRow) -> Self {
        DailyRecord {
            id: row.id,
            shop_id: row.shop_id,
            date: row.date,
            opening_balance: Money::from_minor(row.opening_balance),
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DailyRecordRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl DailyRecordRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        DailyRecordRepository { pool, feed }
    }

    pub async fn get(&self, shop_id: &str, date: NaiveDate) -> DbResult<Option<DailyRecord>> {
        let row: Option<DailyRecordRow> = sqlx::query_as(
            "SELECT id, shop_id, date, opening_balance, updated_at \
             FROM daily_records WHERE shop_id = ?1 AND date = ?2",
        )
        .bind(shop_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DailyRecord::from))
    }

    /// Records in an inclusive date range, oldest first.
    pub async fn list(
        &self,
        shop_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<DailyRecord>> {
        let rows: Vec<DailyRecordRow> = sqlx::query_as(
            "SELECT id, shop_id, date, opening_balance, updated_at \
             FROM daily_records WHERE shop_id = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date",
        )
        .bind(shop_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DailyRecord::from).collect())
    }

    /// Sets a day's opening balance, creating the record on first use.
    pub async fn upsert_opening_balance(
        &self,
        shop_id: &str,
        date: NaiveDate,
        opening_balance: Money,
    ) -> DbResult<DailyRecord> {
        debug!(shop_id, %date, opening_balance = opening_balance.minor(), "Setting opening balance");

        let row: DailyRecordRow = sqlx::query_as(
            r#"
            INSERT INTO daily_records (id, shop_id, date, opening_balance, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (shop_id, date) DO UPDATE SET
                opening_balance = excluded.opening_balance,
                updated_at = excluded.updated_at
            RETURNING id, shop_id, date, opening_balance, updated_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(shop_id)
        .bind(date)
        .bind(opening_balance.minor())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let record = DailyRecord::from(row);
        self.feed.publish(ChangeEvent::new(
            shop_id,
            Entity::DailyRecord,
            ChangeKind::Update,
            &record.id,
        ));
        Ok(record)
    }

    pub async fn delete(&self, shop_id: &str, date: NaiveDate) -> DbResult<()> {
        let id: Option<String> = sqlx::query_scalar(
            "DELETE FROM daily_records WHERE shop_id = ?1 AND date = ?2 RETURNING id",
        )
        .bind(shop_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let id = id.ok_or_else(|| DbError::not_found("DailyRecord", date.to_string()))?;
        self.feed
            .publish(ChangeEvent::new(shop_id, Entity::DailyRecord, ChangeKind::Delete, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_keeps_one_record_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let first = db
            .daily_records()
            .upsert_opening_balance("shop-1", day, Money::from_minor(10_000))
            .await
            .unwrap();
        let second = db
            .daily_records()
            .upsert_opening_balance("shop-1", day, Money::from_minor(12_000))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.opening_balance.minor(), 12_000);

        let next = day.succ_opt().unwrap();
        db.daily_records()
            .upsert_opening_balance("shop-1", next, Money::from_minor(9_000))
            .await
            .unwrap();
        db.daily_records()
            .upsert_opening_balance("shop-2", day, Money::from_minor(1))
            .await
            .unwrap();

        let records = db.daily_records().list("shop-1", day, next).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, day);
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        assert!(db.daily_records().delete("shop-1", day).await.is_err());
        db.daily_records()
            .upsert_opening_balance("shop-1", day, Money::zero())
            .await
            .unwrap();
        db.daily_records().delete("shop-1", day).await.unwrap();
        assert!(db.daily_records().get("shop-1", day).await.unwrap().is_none());
    }
}

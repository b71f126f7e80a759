//! # Report Commands
//!
//! Read-only views over sales, expenses and stock.
//!
//! ## Business Day
//! ```text
//! Shop at UTC+03:00, date 2024-03-15
//!
//!   local   2024-03-15 00:00 ───────────────► 2024-03-16 00:00
//!   UTC     2024-03-14 21:00 ───────────────► 2024-03-15 21:00
//!                         sales with timestamp in [start, end)
//! ```
//!
//! Expenses are already keyed by local date and need no conversion.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use duka_core::aggregation::{self, day_bounds, DailySummary, FinancialOverview, ProductProfit};
use duka_core::{Product, Sale};
use duka_db::{ExpenseFilter, SaleFilter};

async fn sales_between(
    db: &DbState,
    config: &ConfigState,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Sale>, ApiError> {
    let (start, end) = day_bounds(from, to, config.offset());
    Ok(db
        .inner()
        .sales()
        .list(&config.shop_id, &SaleFilter::between(start, end))
        .await?)
}

async fn all_sales(db: &DbState, config: &ConfigState) -> Result<Vec<Sale>, ApiError> {
    Ok(db.inner().sales().list(&config.shop_id, &SaleFilter::default()).await?)
}

/// Revenue, cost, profit, closing balance and growth for one local day.
pub async fn daily_summary(
    db: &DbState,
    config: &ConfigState,
    date: NaiveDate,
) -> Result<DailySummary, ApiError> {
    debug!(%date, "daily_summary command");

    let sales = sales_between(db, config, date, date).await?;
    let expenses = db
        .inner()
        .expenses()
        .list(&config.shop_id, &ExpenseFilter::on(date))
        .await?;
    let opening_balance = db
        .inner()
        .daily_records()
        .get(&config.shop_id, date)
        .await?
        .map(|r| r.opening_balance)
        .unwrap_or_default();

    Ok(aggregation::daily_summary(
        date,
        &sales,
        &expenses,
        opening_balance,
        config.offset(),
    ))
}

/// One summary per day in `from..=to`.
pub async fn daily_series(
    db: &DbState,
    config: &ConfigState,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailySummary>, ApiError> {
    debug!(%from, %to, "daily_series command");
    if from > to {
        return Err(ApiError::validation("from must not be after to"));
    }
    if (to - from).num_days() > 366 {
        return Err(ApiError::validation("range must be at most 366 days"));
    }

    let sales = sales_between(db, config, from, to).await?;
    let expenses = db
        .inner()
        .expenses()
        .list(
            &config.shop_id,
            &ExpenseFilter {
                from: Some(from),
                to: Some(to),
                category: None,
            },
        )
        .await?;
    let records = db.inner().daily_records().list(&config.shop_id, from, to).await?;

    Ok(aggregation::daily_series(
        from,
        to,
        &sales,
        &expenses,
        &records,
        config.offset(),
    ))
}

/// All-time profit per product, most profitable first.
pub async fn product_profitability(
    db: &DbState,
    config: &ConfigState,
    limit: Option<usize>,
) -> Result<Vec<ProductProfit>, ApiError> {
    let mut ranked = aggregation::product_profitability(&all_sales(db, config).await?);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    Ok(ranked)
}

/// Products with stock on hand that have never sold.
pub async fn dead_stock(db: &DbState, config: &ConfigState) -> Result<Vec<Product>, ApiError> {
    let products = db.inner().products().list(&config.shop_id).await?;
    let sales = all_sales(db, config).await?;
    Ok(aggregation::dead_stock(&products, &sales))
}

pub async fn low_stock(db: &DbState, config: &ConfigState) -> Result<Vec<Product>, ApiError> {
    let products = db.inner().products().list(&config.shop_id).await?;
    Ok(aggregation::low_stock(&products))
}

/// Whole-ledger capital, growth and ROI against the configured starting
/// capital.
pub async fn financial_overview(
    db: &DbState,
    config: &ConfigState,
) -> Result<FinancialOverview, ApiError> {
    debug!("financial_overview command");

    let sales = all_sales(db, config).await?;
    let expenses = db
        .inner()
        .expenses()
        .list(&config.shop_id, &ExpenseFilter::default())
        .await?;
    let products = db.inner().products().list(&config.shop_id).await?;

    Ok(aggregation::financial_overview(
        &sales,
        &expenses,
        &products,
        config.initial_capital,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_single_unit;
    use crate::commands::ledger::{record_expense, set_opening_balance};
    use crate::commands::sale::checkout;
    use crate::commands::test_support::{setup, stock};
    use crate::state::CartState;
    use chrono::Utc;
    use duka_core::aggregation::local_date;
    use duka_core::{ExpenseCategory, Money, NewExpense, PaymentMethod};

    #[tokio::test]
    async fn test_daily_summary_from_checkouts_and_expenses() {
        let (db, config) = setup().await;
        let cart = CartState::in_memory();
        let today = local_date(Utc::now(), config.offset());

        let soda = stock(&db, "Soda 500ml", 1000, 1500, 10).await;
        let bread = stock(&db, "Bread", 4000, 5500, 10).await;
        stock(&db, "Matches", 100, 200, 50).await;

        set_opening_balance(&db, &config, today, Money::from_minor(100_000)).await.unwrap();

        add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap();
        add_single_unit(&db, &cart, &config, soda.id.clone()).await.unwrap();
        checkout(&db, &cart, &config, PaymentMethod::Cash).await.unwrap();
        add_single_unit(&db, &cart, &config, bread.id.clone()).await.unwrap();
        checkout(&db, &cart, &config, PaymentMethod::MobileMoney).await.unwrap();

        record_expense(
            &db,
            &config,
            NewExpense {
                date: today,
                category: ExpenseCategory::new("TRANSPORT"),
                amount: Money::from_minor(500),
                description: String::new(),
            },
        )
        .await
        .unwrap();

        let summary = daily_summary(&db, &config, today).await.unwrap();
        assert_eq!(summary.sales_revenue, Money::from_minor(8_500));
        assert_eq!(summary.total_cost, Money::from_minor(6_000));
        assert_eq!(summary.net_profit, Money::from_minor(2_000));
        assert_eq!(summary.closing_balance, Money::from_minor(8_000));
        assert_eq!(summary.opening_balance, Money::from_minor(100_000));
        assert!((summary.capital_growth + 92.0).abs() < 1e-9);
        assert_eq!(summary.transaction_count, 2);

        let ranked = product_profitability(&db, &config, Some(1)).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].product_name, "Bread");

        let dead = dead_stock(&db, &config).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].name, "Matches");

        let series = daily_series(&db, &config, today.pred_opt().unwrap(), today).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].sales_revenue, Money::zero());
        assert_eq!(series[1].sales_revenue, Money::from_minor(8_500));
    }

    #[tokio::test]
    async fn test_empty_day_and_overview() {
        let (db, mut config) = setup().await;
        config.initial_capital = Money::from_minor(1_000_000);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let summary = daily_summary(&db, &config, date).await.unwrap();
        assert_eq!(summary.closing_balance, Money::zero());
        assert_eq!(summary.capital_growth, 0.0);

        let overview = financial_overview(&db, &config).await.unwrap();
        assert_eq!(overview.current_capital, Money::from_minor(1_000_000));
        assert_eq!(overview.roi, 0.0);

        let err = daily_series(&db, &config, date, date.pred_opt().unwrap()).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}

//! # Daily Aggregation Engine
//!
//! Financial rollups derived from the sale and expense streams.
//!
//! Nothing here holds state: every summary is recomputed from the ledger on
//! each read, so it can never drift from it.
//!
//! ## Daily Summary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales on local day D ─────► sales_revenue = Σ total_price             │
//! │                         └──► total_cost    = Σ total_cost              │
//! │                                                                         │
//! │  expenses dated D ─────────► stock_purchases (category STOCK)          │
//! │                         └──► other_expenses  (everything else)         │
//! │                                                                         │
//! │  net_profit      = sales_revenue − total_cost − other_expenses         │
//! │  closing_balance = sales_revenue − stock_purchases − other_expenses    │
//! │  capital_growth  = (closing − opening) / opening × 100   (0 if base 0) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Local day" is the shop's calendar day at a fixed UTC offset, so a sale
//! at 22:30 UTC in a UTC+3 shop counts toward the next date.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{DailyRecord, ExpenseLog, PaymentMethod, Product, Sale};

// =============================================================================
// Helpers
// =============================================================================

/// The shop-local calendar date of a timestamp.
pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// UTC instants bounding local dates `from..=to`, as `[start, end)`.
///
/// Use these to fetch the sales of a local-day range from storage.
///
/// ```rust
/// # use duka_core::aggregation::day_bounds;
/// # use chrono::{FixedOffset, NaiveDate};
/// let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let (start, end) = day_bounds(date, date, FixedOffset::east_opt(3 * 3600).unwrap());
/// assert_eq!(start.to_rfc3339(), "2026-02-28T21:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2026-03-01T21:00:00+00:00");
/// ```
pub fn day_bounds(from: NaiveDate, to: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_of = |date: NaiveDate| {
        let local = date.and_time(NaiveTime::MIN);
        (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
    };
    let end = to.succ_opt().map(start_of).unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start_of(from), end)
}

/// `(value − base) / base × 100`, or `0.0` when `base` is zero.
///
/// ```rust
/// # use duka_core::aggregation::growth_percent;
/// # use duka_core::money::Money;
/// assert_eq!(growth_percent(Money::from_minor(1500), Money::from_minor(1000)), 50.0);
/// assert_eq!(growth_percent(Money::from_minor(1500), Money::zero()), 0.0);
/// ```
pub fn growth_percent(value: Money, base: Money) -> f64 {
    ratio_percent(value - base, base)
}

/// `part / base × 100`, or `0.0` when `base` is zero.
pub fn ratio_percent(part: Money, base: Money) -> f64 {
    if base.is_zero() {
        return 0.0;
    }
    part.as_f64() / base.as_f64() * 100.0
}

/// Splits expenses into (stock purchases, other expenses).
fn split_expenses<'a>(expenses: impl Iterator<Item = &'a ExpenseLog>) -> (Money, Money) {
    expenses.fold((Money::zero(), Money::zero()), |(stock, other), e| {
        if e.category.is_stock() {
            (stock + e.amount, other)
        } else {
            (stock, other + e.amount)
        }
    })
}

// =============================================================================
// Breakdowns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub seller_id: String,
    pub seller_name: String,
    pub sale_count: usize,
    pub transaction_count: usize,
    pub revenue: Money,
    pub profit: Money,
}

/// Per-seller totals, highest revenue first.
pub fn seller_breakdown<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Vec<SellerSummary> {
    let mut by_seller: BTreeMap<&str, (SellerSummary, HashSet<&str>)> = BTreeMap::new();

    for sale in sales {
        let (summary, receipts) = by_seller.entry(sale.seller_id.as_str()).or_insert_with(|| {
            (
                SellerSummary {
                    seller_id: sale.seller_id.clone(),
                    seller_name: sale.seller_name.clone(),
                    sale_count: 0,
                    transaction_count: 0,
                    revenue: Money::zero(),
                    profit: Money::zero(),
                },
                HashSet::new(),
            )
        });
        summary.sale_count += 1;
        summary.revenue += sale.total_price;
        summary.profit += sale.profit;
        receipts.insert(sale.receipt_id.as_str());
    }

    let mut out: Vec<SellerSummary> = by_seller
        .into_values()
        .map(|(mut summary, receipts)| {
            summary.transaction_count = receipts.len();
            summary
        })
        .collect();
    out.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.seller_name.cmp(&b.seller_name)));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment_method: PaymentMethod,
    pub sale_count: usize,
    pub revenue: Money,
}

/// Revenue per payment method, in method order (cash, mobile money, card).
pub fn payment_breakdown<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Vec<PaymentSummary> {
    let mut by_method: BTreeMap<PaymentMethod, PaymentSummary> = BTreeMap::new();
    for sale in sales {
        let entry = by_method
            .entry(sale.payment_method)
            .or_insert_with(|| PaymentSummary {
                payment_method: sale.payment_method,
                sale_count: 0,
                revenue: Money::zero(),
            });
        entry.sale_count += 1;
        entry.revenue += sale.total_price;
    }
    by_method.into_values().collect()
}

// =============================================================================
// Daily Summary
// =============================================================================

/// One local business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub opening_balance: Money,
    pub sales_revenue: Money,
    pub total_cost: Money,
    /// Revenue minus cost of goods, before expenses.
    pub gross_profit: Money,
    pub stock_purchases: Money,
    pub other_expenses: Money,
    pub net_profit: Money,
    pub closing_balance: Money,
    /// Percent; the day's opening balance is the base.
    pub capital_growth: f64,
    /// Distinct receipts.
    pub transaction_count: usize,
    pub units_sold: i64,
    pub seller_breakdown: Vec<SellerSummary>,
    pub payment_breakdown: Vec<PaymentSummary>,
}

/// Summarizes one local day.
///
/// `sales` and `expenses` may span any period; only entries on `date` count.
pub fn daily_summary(
    date: NaiveDate,
    sales: &[Sale],
    expenses: &[ExpenseLog],
    opening_balance: Money,
    offset: FixedOffset,
) -> DailySummary {
    let day_sales: Vec<&Sale> = sales
        .iter()
        .filter(|s| local_date(s.timestamp, offset) == date)
        .collect();

    let sales_revenue: Money = day_sales.iter().map(|s| s.total_price).sum();
    let total_cost: Money = day_sales.iter().map(|s| s.total_cost).sum();
    let (stock_purchases, other_expenses) =
        split_expenses(expenses.iter().filter(|e| e.date == date));

    let closing_balance = sales_revenue - stock_purchases - other_expenses;
    let transaction_count = day_sales
        .iter()
        .map(|s| s.receipt_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    DailySummary {
        date,
        opening_balance,
        sales_revenue,
        total_cost,
        gross_profit: sales_revenue - total_cost,
        stock_purchases,
        other_expenses,
        net_profit: sales_revenue - total_cost - other_expenses,
        closing_balance,
        capital_growth: growth_percent(closing_balance, opening_balance),
        transaction_count,
        units_sold: day_sales.iter().map(|s| s.quantity).sum(),
        seller_breakdown: seller_breakdown(day_sales.iter().copied()),
        payment_breakdown: payment_breakdown(day_sales.iter().copied()),
    }
}

/// One summary per date in `from..=to`, using each day's opening balance
/// from `records` (zero when a day has none).
pub fn daily_series(
    from: NaiveDate,
    to: NaiveDate,
    sales: &[Sale],
    expenses: &[ExpenseLog],
    records: &[DailyRecord],
    offset: FixedOffset,
) -> Vec<DailySummary> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            let opening = records
                .iter()
                .find(|r| r.date == date)
                .map(|r| r.opening_balance)
                .unwrap_or_default();
            daily_summary(date, sales, expenses, opening, offset)
        })
        .collect()
}

// =============================================================================
// Product Analysis
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfit {
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: Money,
    pub profit: Money,
}

/// All-time profit grouped by product name, most profitable first.
pub fn product_profitability(sales: &[Sale]) -> Vec<ProductProfit> {
    let mut by_name: BTreeMap<&str, ProductProfit> = BTreeMap::new();
    for sale in sales {
        let entry = by_name
            .entry(sale.product_name.as_str())
            .or_insert_with(|| ProductProfit {
                product_name: sale.product_name.clone(),
                units_sold: 0,
                revenue: Money::zero(),
                profit: Money::zero(),
            });
        entry.units_sold += sale.quantity;
        entry.revenue += sale.total_price;
        entry.profit += sale.profit;
    }

    let mut ranked: Vec<ProductProfit> = by_name.into_values().collect();
    // stable sort keeps name order among equal profits
    ranked.sort_by(|a, b| b.profit.cmp(&a.profit));
    ranked
}

/// Products with stock on hand and no recorded sale.
pub fn dead_stock(products: &[Product], sales: &[Sale]) -> Vec<Product> {
    let sold: BTreeSet<&str> = sales.iter().map(|s| s.product_id.as_str()).collect();
    products
        .iter()
        .filter(|p| p.quantity > 0 && !sold.contains(p.id.as_str()))
        .cloned()
        .collect()
}

/// Products at or below their alert level, emptiest first.
pub fn low_stock(products: &[Product]) -> Vec<Product> {
    let mut low: Vec<Product> = products.iter().filter(|p| p.is_low_stock()).cloned().collect();
    low.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
    low
}

// =============================================================================
// Financial Overview
// =============================================================================

/// Whole-ledger position of the shop against its starting capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOverview {
    pub initial_capital: Money,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub gross_profit: Money,
    pub stock_purchases: Money,
    pub other_expenses: Money,
    pub net_profit: Money,
    /// Stock on hand valued at buy price.
    pub inventory_value: Money,
    /// Still owed to suppliers across all purchases.
    pub supplier_debt: Money,
    pub current_capital: Money,
    pub capital_growth: f64,
    pub roi: f64,
}

pub fn financial_overview(
    sales: &[Sale],
    expenses: &[ExpenseLog],
    products: &[Product],
    initial_capital: Money,
) -> FinancialOverview {
    let total_revenue: Money = sales.iter().map(|s| s.total_price).sum();
    let total_cost: Money = sales.iter().map(|s| s.total_cost).sum();
    let (stock_purchases, other_expenses) = split_expenses(expenses.iter());
    let net_profit = total_revenue - total_cost - other_expenses;
    let current_capital = initial_capital + total_revenue - stock_purchases - other_expenses;

    FinancialOverview {
        initial_capital,
        total_revenue,
        total_cost,
        gross_profit: total_revenue - total_cost,
        stock_purchases,
        other_expenses,
        net_profit,
        inventory_value: products.iter().map(|p| p.stock_value()).sum(),
        supplier_debt: expenses
            .iter()
            .filter_map(|e| e.purchase())
            .map(|p| p.amount_remained)
            .sum(),
        current_capital,
        capital_growth: growth_percent(current_capital, initial_capital),
        roi: ratio_percent(net_profit, initial_capital),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpenseCategory, NewExpense, NewProduct, NewPurchase, SaleMetadata, UnitType};
    use chrono::TimeZone;

    fn eat() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn sale(
        name: &str,
        total: i64,
        cost: i64,
        at: DateTime<Utc>,
        seller: &str,
        receipt: &str,
        method: PaymentMethod,
    ) -> Sale {
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            shop_id: "shop-1".to_string(),
            product_id: format!("id-{}", name),
            product_name: name.to_string(),
            quantity: 1,
            unit_price: Money::from_minor(total),
            total_price: Money::from_minor(total),
            total_cost: Money::from_minor(cost),
            profit: Money::from_minor(total - cost),
            timestamp: at,
            seller_id: seller.to_lowercase(),
            seller_name: seller.to_string(),
            receipt_id: receipt.to_string(),
            payment_method: method,
            metadata: SaleMetadata {
                unit_type: UnitType::single(),
                pack_size: 1,
                pack_price: Money::from_minor(total),
                pack_quantity: 1,
            },
        }
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn expense(date: NaiveDate, category: &str, amount: i64) -> ExpenseLog {
        NewExpense {
            date,
            category: ExpenseCategory::new(category),
            amount: Money::from_minor(amount),
            description: String::new(),
        }
        .into_expense("shop-1", Utc::now())
    }

    fn product(name: &str, quantity: i64, min_threshold: i64) -> Product {
        let mut p = NewProduct {
            name: name.to_string(),
            sku: name.to_uppercase(),
            category: String::new(),
            buy_price: Money::from_minor(100),
            sell_price: Money::from_minor(150),
            quantity,
            min_threshold,
            discount_bps: None,
        }
        .into_product("shop-1", Utc::now());
        p.id = format!("id-{}", name);
        p
    }

    #[test]
    fn test_two_sales_same_day_net_profit() {
        let sales = vec![
            sale("Soda", 1000, 600, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Bread", 2000, 1200, at(1, 12), "Amina", "R2", PaymentMethod::Cash),
        ];

        let summary = daily_summary(day(1), &sales, &[], Money::zero(), eat());

        assert_eq!(summary.sales_revenue.minor(), 3000);
        assert_eq!(summary.total_cost.minor(), 1800);
        assert_eq!(summary.net_profit.minor(), 1200);
        assert_eq!(summary.closing_balance.minor(), 3000);
        assert_eq!(summary.transaction_count, 2);
    }

    #[test]
    fn test_local_day_boundary() {
        // 22:00 UTC on the 1st is 01:00 on the 2nd at UTC+3
        let sales = vec![sale("Soda", 1000, 600, at(1, 22), "Amina", "R1", PaymentMethod::Cash)];

        assert_eq!(
            daily_summary(day(1), &sales, &[], Money::zero(), eat()).sales_revenue,
            Money::zero()
        );
        assert_eq!(
            daily_summary(day(2), &sales, &[], Money::zero(), eat())
                .sales_revenue
                .minor(),
            1000
        );
        assert_eq!(local_date(at(1, 22), eat()), day(2));

        let (start, end) = day_bounds(day(2), day(2), eat());
        assert_eq!(start, at(1, 21));
        assert_eq!(end, at(2, 21));
        assert!(start <= at(1, 22) && at(1, 22) < end);
    }

    #[test]
    fn test_expenses_split_and_balances() {
        let sales = vec![sale("Soda", 10_000, 6_000, at(1, 9), "Amina", "R1", PaymentMethod::Cash)];
        let expenses = vec![
            expense(day(1), "STOCK", 4_000),
            expense(day(1), "transport", 500),
            expense(day(2), "RENT", 9_999),
        ];

        let s = daily_summary(day(1), &sales, &expenses, Money::from_minor(5_000), eat());

        assert_eq!(s.stock_purchases.minor(), 4_000);
        assert_eq!(s.other_expenses.minor(), 500);
        assert_eq!(s.net_profit.minor(), 10_000 - 6_000 - 500);
        assert_eq!(s.closing_balance.minor(), 10_000 - 4_000 - 500);
        // (5500 - 5000) / 5000
        assert!((s.capital_growth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_capital_growth_zero_base_is_finite() {
        let sales = vec![sale("Soda", 1000, 600, at(1, 9), "Amina", "R1", PaymentMethod::Cash)];
        let s = daily_summary(day(1), &sales, &[], Money::zero(), eat());
        assert_eq!(s.capital_growth, 0.0);
        assert!(s.capital_growth.is_finite());

        let overview = financial_overview(&sales, &[], &[], Money::zero());
        assert_eq!(overview.capital_growth, 0.0);
        assert_eq!(overview.roi, 0.0);
    }

    #[test]
    fn test_seller_and_payment_breakdown() {
        let sales = vec![
            sale("Soda", 1000, 600, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Bread", 500, 300, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Soda", 4000, 2400, at(1, 9), "Baraka", "R2", PaymentMethod::MobileMoney),
        ];

        let s = daily_summary(day(1), &sales, &[], Money::zero(), eat());

        assert_eq!(s.transaction_count, 2);
        assert_eq!(s.seller_breakdown.len(), 2);
        assert_eq!(s.seller_breakdown[0].seller_name, "Baraka");
        let amina = &s.seller_breakdown[1];
        assert_eq!(amina.sale_count, 2);
        assert_eq!(amina.transaction_count, 1);
        assert_eq!(amina.revenue.minor(), 1500);
        assert_eq!(amina.profit.minor(), 600);

        assert_eq!(s.payment_breakdown.len(), 2);
        assert_eq!(s.payment_breakdown[0].payment_method, PaymentMethod::Cash);
        assert_eq!(s.payment_breakdown[0].revenue.minor(), 1500);
        assert_eq!(s.payment_breakdown[1].revenue.minor(), 4000);
    }

    #[test]
    fn test_daily_series_uses_each_days_opening_balance() {
        let sales = vec![
            sale("Soda", 1000, 600, at(1, 9), "Amina", "R1", PaymentMethod::Cash),
            sale("Soda", 3000, 1800, at(3, 9), "Amina", "R2", PaymentMethod::Cash),
        ];
        let records = vec![DailyRecord {
            id: "r".to_string(),
            shop_id: "shop-1".to_string(),
            date: day(3),
            opening_balance: Money::from_minor(2000),
            updated_at: Utc::now(),
        }];

        let series = daily_series(day(1), day(3), &sales, &[], &records, eat());

        assert_eq!(series.len(), 3);
        assert_eq!(series[1].sales_revenue, Money::zero());
        assert_eq!(series[2].opening_balance.minor(), 2000);
        assert!((series[2].capital_growth - 50.0).abs() < 1e-9);
        assert!(daily_series(day(3), day(1), &sales, &[], &records, eat()).is_empty());
    }

    #[test]
    fn test_product_profitability_ranking() {
        let sales = vec![
            sale("Bread", 500, 300, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Soda", 1000, 600, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Soda", 1000, 600, at(2, 8), "Amina", "R2", PaymentMethod::Cash),
            sale("Eggs", 300, 500, at(2, 8), "Amina", "R2", PaymentMethod::Cash),
        ];

        let ranked = product_profitability(&sales);

        let names: Vec<&str> = ranked.iter().map(|p| p.product_name.as_str()).collect();
        assert_eq!(names, vec!["Soda", "Bread", "Eggs"]);
        assert_eq!(ranked[0].profit.minor(), 800);
        assert_eq!(ranked[0].units_sold, 2);
        assert!(ranked[2].profit.is_negative());
    }

    #[test]
    fn test_dead_and_low_stock() {
        let products = vec![
            product("Soda", 10, 2),
            product("Candles", 5, 1),
            product("Matches", 0, 3),
            product("Salt", 2, 2),
        ];
        let sales = vec![sale("Soda", 1000, 600, at(1, 8), "Amina", "R1", PaymentMethod::Cash)];

        let dead: Vec<String> = dead_stock(&products, &sales).into_iter().map(|p| p.name).collect();
        assert_eq!(dead, vec!["Candles", "Salt"]);

        let low: Vec<String> = low_stock(&products).into_iter().map(|p| p.name).collect();
        assert_eq!(low, vec!["Matches", "Salt"]);
    }

    #[test]
    fn test_financial_overview() {
        let sales = vec![
            sale("Soda", 10_000, 6_000, at(1, 8), "Amina", "R1", PaymentMethod::Cash),
            sale("Soda", 5_000, 3_000, at(2, 8), "Amina", "R2", PaymentMethod::Card),
        ];
        let purchase = NewPurchase {
            date: day(1),
            product_id: None,
            product_name: "Soda".to_string(),
            quantity: 10,
            unit_price: Money::from_minor(600),
            amount_paid: Some(Money::from_minor(4_000)),
            description: String::new(),
        }
        .into_expense("shop-1", Utc::now());
        let expenses = vec![purchase, expense(day(2), "SALARY", 1_000)];
        let products = vec![product("Soda", 10, 2)];

        let o = financial_overview(&sales, &expenses, &products, Money::from_minor(20_000));

        assert_eq!(o.total_revenue.minor(), 15_000);
        assert_eq!(o.gross_profit.minor(), 6_000);
        assert_eq!(o.stock_purchases.minor(), 6_000);
        assert_eq!(o.other_expenses.minor(), 1_000);
        assert_eq!(o.net_profit.minor(), 5_000);
        assert_eq!(o.inventory_value.minor(), 1_000);
        assert_eq!(o.supplier_debt.minor(), 2_000);
        assert_eq!(o.current_capital.minor(), 20_000 + 15_000 - 6_000 - 1_000);
        assert!((o.capital_growth - 40.0).abs() < 1e-9);
        assert!((o.roi - 25.0).abs() < 1e-9);
    }
}

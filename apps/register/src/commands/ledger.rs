//! # Ledger Commands
//!
//! The day's money outside of sales: the opening balance, plain expenses
//! and stock purchases.
//!
//! ```text
//! record_purchase ──► STOCK expense (full cost) ──► product stock += quantity
//! record_expense  ──► TRANSPORT / RENT / ...    ──► other_expenses
//! set_opening_balance ──► daily_records(shop, date)
//! ```

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use duka_core::validation::{validate_expense_patch, validate_new_expense, validate_new_purchase};
use duka_core::{DailyRecord, ExpenseCategory, ExpenseLog, ExpensePatch, Money, NewExpense, NewPurchase};
use duka_db::ExpenseFilter;

pub async fn set_opening_balance(
    db: &DbState,
    config: &ConfigState,
    date: NaiveDate,
    opening_balance: Money,
) -> Result<DailyRecord, ApiError> {
    debug!(%date, opening_balance = %opening_balance, "set_opening_balance command");

    if opening_balance.is_negative() {
        return Err(ApiError::validation("opening_balance must not be negative"));
    }

    Ok(db
        .inner()
        .daily_records()
        .upsert_opening_balance(&config.shop_id, date, opening_balance)
        .await?)
}

/// Records a non-purchase expense. Use [`record_purchase`] for stock.
pub async fn record_expense(
    db: &DbState,
    config: &ConfigState,
    input: NewExpense,
) -> Result<ExpenseLog, ApiError> {
    debug!(category = %input.category, "record_expense command");

    validate_new_expense(&input)?;
    let expense = input.into_expense(&config.shop_id, Utc::now());
    Ok(db.inner().expenses().insert(&expense).await?)
}

/// Records a stock purchase and restocks the catalog product it names.
pub async fn record_purchase(
    db: &DbState,
    config: &ConfigState,
    input: NewPurchase,
) -> Result<ExpenseLog, ApiError> {
    debug!(product = %input.product_name, quantity = input.quantity, "record_purchase command");

    validate_new_purchase(&input)?;
    let expense = input.into_expense(&config.shop_id, Utc::now());
    Ok(db.inner().expenses().insert(&expense).await?)
}

pub async fn update_expense(
    db: &DbState,
    config: &ConfigState,
    expense_id: String,
    patch: ExpensePatch,
) -> Result<ExpenseLog, ApiError> {
    debug!(expense_id = %expense_id, "update_expense command");

    validate_expense_patch(&patch)?;
    Ok(db.inner().expenses().update(&config.shop_id, &expense_id, &patch).await?)
}

/// Deletes an expense. Deleting a purchase takes its units back off the shelf.
pub async fn delete_expense(
    db: &DbState,
    config: &ConfigState,
    expense_id: String,
) -> Result<ExpenseLog, ApiError> {
    debug!(expense_id = %expense_id, "delete_expense command");
    Ok(db.inner().expenses().delete(&config.shop_id, &expense_id).await?)
}

/// Expenses between two local dates (inclusive), optionally one category.
pub async fn list_expenses(
    db: &DbState,
    config: &ConfigState,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    category: Option<String>,
) -> Result<Vec<ExpenseLog>, ApiError> {
    let filter = ExpenseFilter {
        from,
        to,
        category: category.map(ExpenseCategory::new),
    };
    Ok(db.inner().expenses().list(&config.shop_id, &filter).await?)
}

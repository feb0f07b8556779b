//! # Daily Inventory Repository
//!
//! Storage for per-day aggregates and their child rows.
//!
//! ## Tables
//! ```text
//! daily_inventories (one per business_date)
//!    │
//!    ├── daily_sale_transactions   UNIQUE (day, transaction_id)
//!    ├── daily_product_summaries   PK     (day, product_id)
//!    └── daily_customer_summaries  PK     (day, customer_id)
//! ```
//!
//! Parent totals are never incremented in place; they are always
//! rewritten from the child rows via [`update_totals`].

use chrono::{DateTime, NaiveDate, Utc};
use dukan_core::daily::DayTotals;
use dukan_core::{
    DailyCustomerSummary, DailyInventory, DailyProductSummary, DailySaleTransaction, DailyStatus,
};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Day Rows
// =============================================================================

/// Creates the row for `date` unless one exists, then returns it.
///
/// Safe under concurrent callers: the unique index on `business_date`
/// turns the second insert into a no-op.
pub async fn get_or_create(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<DailyInventory> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO daily_inventories (id, business_date, status, created_at, updated_at)
        VALUES (?1, ?2, 'active', ?3, ?3)
        ON CONFLICT(business_date) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(date)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(date = %date, "Created daily inventory");
    }

    get_by_date(conn, date)
        .await?
        .ok_or_else(|| DbError::not_found("DailyInventory", date.to_string()))
}

pub async fn get_by_date(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Option<DailyInventory>> {
    let day = sqlx::query_as::<_, DailyInventory>(
        "SELECT * FROM daily_inventories WHERE business_date = ?1",
    )
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(day)
}

/// Days with `start <= business_date < end`, oldest first.
pub async fn list_between(
    conn: &mut SqliteConnection,
    start: NaiveDate,
    end: NaiveDate,
) -> DbResult<Vec<DailyInventory>> {
    let days = sqlx::query_as::<_, DailyInventory>(
        r#"
        SELECT * FROM daily_inventories
        WHERE business_date >= ?1 AND business_date < ?2
        ORDER BY business_date
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    Ok(days)
}

/// Days flagged for a replay, oldest first.
pub async fn list_pending(conn: &mut SqliteConnection) -> DbResult<Vec<DailyInventory>> {
    let days = sqlx::query_as::<_, DailyInventory>(
        "SELECT * FROM daily_inventories WHERE pending_reconciliation = 1 ORDER BY business_date",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(days)
}

/// Moves a day to `status`, stamping who closed it when closing.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: DailyStatus,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<&str>,
) -> DbResult<()> {
    debug!(id = %id, status = status.as_str(), "Setting daily inventory status");

    let result = sqlx::query(
        r#"
        UPDATE daily_inventories
        SET status = ?2, closed_at = ?3, closed_by = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(closed_at)
    .bind(closed_by)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("DailyInventory", id));
    }

    Ok(())
}

pub async fn set_pending(conn: &mut SqliteConnection, id: &str, pending: bool) -> DbResult<()> {
    sqlx::query(
        "UPDATE daily_inventories SET pending_reconciliation = ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(pending)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes recomputed totals onto the day row.
///
/// A full rebuild passes `rebuilt = true`, which bumps
/// `aggregation_version` and clears `pending_reconciliation`.
pub async fn update_totals(
    conn: &mut SqliteConnection,
    id: &str,
    totals: &DayTotals,
    rebuilt: bool,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE daily_inventories SET
            total_sales_cents = ?2,
            total_cost_cents = ?3,
            total_discounts_cents = ?4,
            net_profit_cents = ?5,
            total_payments_cents = ?6,
            total_debts_cents = ?7,
            transactions_count = ?8,
            customers_count = ?9,
            products_sold_count = ?10,
            total_quantity_sold = ?11,
            returns_count = ?12,
            exchanges_count = ?13,
            aggregation_version = aggregation_version + ?14,
            pending_reconciliation = CASE WHEN ?14 = 1 THEN 0 ELSE pending_reconciliation END,
            updated_at = ?15
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(totals.total_sales_cents)
    .bind(totals.total_cost_cents)
    .bind(totals.total_discounts_cents)
    .bind(totals.net_profit_cents)
    .bind(totals.total_payments_cents)
    .bind(totals.total_debts_cents)
    .bind(totals.transactions_count)
    .bind(totals.customers_count)
    .bind(totals.products_sold_count)
    .bind(totals.total_quantity_sold)
    .bind(totals.returns_count)
    .bind(totals.exchanges_count)
    .bind(i64::from(rebuilt))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("DailyInventory", id));
    }

    Ok(())
}

// =============================================================================
// Child Rows
// =============================================================================

/// Records a snapshot row.
///
/// ## Returns
/// * `Ok(true)` - New snapshot stored
/// * `Ok(false)` - This transaction was already aggregated into the day
pub async fn insert_snapshot(conn: &mut SqliteConnection, row: &DailySaleTransaction) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO daily_sale_transactions (
            id, daily_inventory_id, transaction_id, customer_id, product_id, kind,
            quantity, price_cents, discount_cents, total_price_cents, unit_cost_cents,
            amount_paid_cents, shipping_cents, transaction_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(daily_inventory_id, transaction_id) DO NOTHING
        "#,
    )
    .bind(&row.id)
    .bind(&row.daily_inventory_id)
    .bind(&row.transaction_id)
    .bind(&row.customer_id)
    .bind(&row.product_id)
    .bind(row.kind)
    .bind(row.quantity)
    .bind(row.price_cents)
    .bind(row.discount_cents)
    .bind(row.total_price_cents)
    .bind(row.unit_cost_cents)
    .bind(row.amount_paid_cents)
    .bind(row.shipping_cents)
    .bind(row.transaction_date)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_snapshots(conn: &mut SqliteConnection, day_id: &str) -> DbResult<Vec<DailySaleTransaction>> {
    let rows = sqlx::query_as::<_, DailySaleTransaction>(
        "SELECT * FROM daily_sale_transactions WHERE daily_inventory_id = ?1 ORDER BY transaction_date, rowid",
    )
    .bind(day_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn get_product_summary(
    conn: &mut SqliteConnection,
    day_id: &str,
    product_id: &str,
) -> DbResult<Option<DailyProductSummary>> {
    let row = sqlx::query_as::<_, DailyProductSummary>(
        "SELECT * FROM daily_product_summaries WHERE daily_inventory_id = ?1 AND product_id = ?2",
    )
    .bind(day_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn upsert_product_summary(conn: &mut SqliteConnection, row: &DailyProductSummary) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_product_summaries (
            daily_inventory_id, product_id, total_quantity_sold, total_sales_value_cents,
            total_cost_value_cents, total_discounts_cents, net_sales_value_cents,
            net_profit_cents, transactions_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(daily_inventory_id, product_id) DO UPDATE SET
            total_quantity_sold = excluded.total_quantity_sold,
            total_sales_value_cents = excluded.total_sales_value_cents,
            total_cost_value_cents = excluded.total_cost_value_cents,
            total_discounts_cents = excluded.total_discounts_cents,
            net_sales_value_cents = excluded.net_sales_value_cents,
            net_profit_cents = excluded.net_profit_cents,
            transactions_count = excluded.transactions_count
        "#,
    )
    .bind(&row.daily_inventory_id)
    .bind(&row.product_id)
    .bind(row.total_quantity_sold)
    .bind(row.total_sales_value_cents)
    .bind(row.total_cost_value_cents)
    .bind(row.total_discounts_cents)
    .bind(row.net_sales_value_cents)
    .bind(row.net_profit_cents)
    .bind(row.transactions_count)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_product_summaries(
    conn: &mut SqliteConnection,
    day_id: &str,
) -> DbResult<Vec<DailyProductSummary>> {
    let rows = sqlx::query_as::<_, DailyProductSummary>(
        "SELECT * FROM daily_product_summaries WHERE daily_inventory_id = ?1 ORDER BY product_id",
    )
    .bind(day_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn get_customer_summary(
    conn: &mut SqliteConnection,
    day_id: &str,
    customer_id: &str,
) -> DbResult<Option<DailyCustomerSummary>> {
    let row = sqlx::query_as::<_, DailyCustomerSummary>(
        "SELECT * FROM daily_customer_summaries WHERE daily_inventory_id = ?1 AND customer_id = ?2",
    )
    .bind(day_id)
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn upsert_customer_summary(conn: &mut SqliteConnection, row: &DailyCustomerSummary) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_customer_summaries (
            daily_inventory_id, customer_id, transactions_count, total_purchases_cents,
            total_payments_cents, debt_amount_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(daily_inventory_id, customer_id) DO UPDATE SET
            transactions_count = excluded.transactions_count,
            total_purchases_cents = excluded.total_purchases_cents,
            total_payments_cents = excluded.total_payments_cents,
            debt_amount_cents = excluded.debt_amount_cents
        "#,
    )
    .bind(&row.daily_inventory_id)
    .bind(&row.customer_id)
    .bind(row.transactions_count)
    .bind(row.total_purchases_cents)
    .bind(row.total_payments_cents)
    .bind(row.debt_amount_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_customer_summaries(
    conn: &mut SqliteConnection,
    day_id: &str,
) -> DbResult<Vec<DailyCustomerSummary>> {
    let rows = sqlx::query_as::<_, DailyCustomerSummary>(
        "SELECT * FROM daily_customer_summaries WHERE daily_inventory_id = ?1 ORDER BY customer_id",
    )
    .bind(day_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Removes every child row of a day ahead of a rebuild.
pub async fn delete_children(conn: &mut SqliteConnection, day_id: &str) -> DbResult<()> {
    debug!(day_id = %day_id, "Clearing daily child rows");

    for table in [
        "daily_sale_transactions",
        "daily_product_summaries",
        "daily_customer_summaries",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE daily_inventory_id = ?1", table))
            .bind(day_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Totals recomputed from the stored child rows.
pub async fn compute_totals(conn: &mut SqliteConnection, day_id: &str) -> DbResult<DayTotals> {
    let products = list_product_summaries(conn, day_id).await?;
    let customers = list_customer_summaries(conn, day_id).await?;
    let snapshots = list_snapshots(conn, day_id).await?;

    Ok(DayTotals::compute(&products, &customers, &snapshots))
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Return / Exchange Tracking Repository
//!
//! One row per accepted return or exchange, linked to the invoice it
//! reverses. The sums over these rows feed the availability cap.

use dukan_core::returns::ReturnAvailability;
use dukan_core::{ExchangeTracking, ReturnTracking};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

pub async fn insert_return(conn: &mut SqliteConnection, row: &ReturnTracking) -> DbResult<()> {
    debug!(
        original = %row.original_invoice_number,
        product_id = %row.product_id,
        quantity = row.returned_quantity,
        "Recording return"
    );

    sqlx::query(
        r#"
        INSERT INTO return_trackings (
            id, original_invoice_number, return_invoice_number, product_id,
            returned_quantity, reason, created_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&row.id)
    .bind(&row.original_invoice_number)
    .bind(&row.return_invoice_number)
    .bind(&row.product_id)
    .bind(row.returned_quantity)
    .bind(&row.reason)
    .bind(row.created_at)
    .bind(&row.created_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_exchange(conn: &mut SqliteConnection, row: &ExchangeTracking) -> DbResult<()> {
    debug!(
        original = %row.original_invoice_number,
        old_product_id = %row.old_product_id,
        new_product_id = %row.new_product_id,
        quantity = row.exchanged_quantity,
        "Recording exchange"
    );

    sqlx::query(
        r#"
        INSERT INTO exchange_trackings (
            id, original_invoice_number, exchange_invoice_number, old_product_id,
            new_product_id, exchanged_quantity, price_difference_cents, reason,
            created_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&row.id)
    .bind(&row.original_invoice_number)
    .bind(&row.exchange_invoice_number)
    .bind(&row.old_product_id)
    .bind(&row.new_product_id)
    .bind(row.exchanged_quantity)
    .bind(row.price_difference_cents)
    .bind(&row.reason)
    .bind(row.created_at)
    .bind(&row.created_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn returned_quantity(
    conn: &mut SqliteConnection,
    invoice_number: &str,
    product_id: &str,
) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(returned_quantity), 0) FROM return_trackings
        WHERE original_invoice_number = ?1 AND product_id = ?2
        "#,
    )
    .bind(invoice_number)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(quantity)
}

pub async fn exchanged_quantity(
    conn: &mut SqliteConnection,
    invoice_number: &str,
    product_id: &str,
) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(exchanged_quantity), 0) FROM exchange_trackings
        WHERE original_invoice_number = ?1 AND old_product_id = ?2
        "#,
    )
    .bind(invoice_number)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Loads the used-up quantities for an invoice line.
pub async fn availability(
    conn: &mut SqliteConnection,
    invoice_number: &str,
    product_id: &str,
    original_quantity: i64,
) -> DbResult<ReturnAvailability> {
    let returned = returned_quantity(conn, invoice_number, product_id).await?;
    let exchanged = exchanged_quantity(conn, invoice_number, product_id).await?;

    Ok(ReturnAvailability {
        original_quantity,
        returned_quantity: returned,
        exchanged_quantity: exchanged,
    })
}

pub async fn returns_for_invoice(
    conn: &mut SqliteConnection,
    invoice_number: &str,
) -> DbResult<Vec<ReturnTracking>> {
    let rows = sqlx::query_as::<_, ReturnTracking>(
        "SELECT * FROM return_trackings WHERE original_invoice_number = ?1 ORDER BY created_at",
    )
    .bind(invoice_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn exchanges_for_invoice(
    conn: &mut SqliteConnection,
    invoice_number: &str,
) -> DbResult<Vec<ExchangeTracking>> {
    let rows = sqlx::query_as::<_, ExchangeTracking>(
        "SELECT * FROM exchange_trackings WHERE original_invoice_number = ?1 ORDER BY created_at",
    )
    .bind(invoice_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

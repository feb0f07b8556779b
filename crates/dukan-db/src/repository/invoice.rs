//! # Invoice Repository
//!
//! Invoice headers and their frozen item lines. Rows are written once by
//! the invoice builder and never updated.

use dukan_core::{Invoice, InvoiceItem};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Generates a new invoice or invoice item ID.
pub fn generate_invoice_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(
        id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        total = invoice.total_amount_cents,
        "Inserting invoice"
    );

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, order_number, customer_id, invoice_type, status,
            subtotal_cents, discount_cents, shipping_cents, total_amount_cents,
            amount_paid_cents, remaining_amount_cents, original_invoice_number,
            cashier_name, notes, issued_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.order_number)
    .bind(&invoice.customer_id)
    .bind(invoice.invoice_type)
    .bind(invoice.status)
    .bind(invoice.subtotal_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.shipping_cents)
    .bind(invoice.total_amount_cents)
    .bind(invoice.amount_paid_cents)
    .bind(invoice.remaining_amount_cents)
    .bind(&invoice.original_invoice_number)
    .bind(&invoice.cashier_name)
    .bind(&invoice.notes)
    .bind(invoice.issued_at)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, transaction_id, product_id, product_name,
            quantity, unit_price_cents, discount_cents, total_price_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.discount_cents)
    .bind(item.total_price_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_by_number(conn: &mut SqliteConnection, invoice_number: &str) -> DbResult<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = ?1")
        .bind(invoice_number)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

pub async fn get_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY rowid",
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Positive (sold) lines of a product on an invoice.
pub async fn sold_items(
    conn: &mut SqliteConnection,
    invoice_number: &str,
    product_id: &str,
) -> DbResult<Vec<InvoiceItem>> {
    let items = sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT ii.* FROM invoice_items ii
        INNER JOIN invoices i ON i.id = ii.invoice_id
        WHERE i.invoice_number = ?1 AND ii.product_id = ?2 AND ii.quantity > 0
        ORDER BY ii.rowid
        "#,
    )
    .bind(invoice_number)
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub async fn list_for_customer(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE customer_id = ?1 ORDER BY issued_at DESC, invoice_number DESC",
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(invoices)
}

/// Highest purely numeric invoice number, used to seed the counter.
pub async fn max_invoice_number(conn: &mut SqliteConnection) -> DbResult<Option<i64>> {
    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(CAST(invoice_number AS INTEGER)) FROM invoices
        WHERE invoice_number <> '' AND invoice_number NOT GLOB '*[^0-9]*'
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(max)
}

/// Highest purely numeric order number, used to seed the counter.
pub async fn max_order_number(conn: &mut SqliteConnection) -> DbResult<Option<i64>> {
    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(CAST(order_number AS INTEGER)) FROM invoices
        WHERE order_number <> '' AND order_number NOT GLOB '*[^0-9]*'
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(max)
}

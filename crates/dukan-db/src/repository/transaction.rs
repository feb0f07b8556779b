//! # Customer Transaction Repository
//!
//! The ledger table. Every row is one signed line (or a debt payment).
//!
//! ## Day Bucketing
//! `transaction_date` is stored as shop-local `YYYY-MM-DD HH:MM:SS` text,
//! so a calendar day is the half-open range `[D 00:00:00, D+1 00:00:00)`
//! and plain string comparison orders it correctly.

use chrono::{NaiveDate, NaiveDateTime};
use dukan_core::CustomerTransaction;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Generates a new transaction ID.
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn insert(conn: &mut SqliteConnection, tx: &CustomerTransaction) -> DbResult<()> {
    debug!(
        id = %tx.id,
        customer_id = %tx.customer_id,
        kind = %tx.kind,
        quantity = tx.quantity,
        total = tx.total_price_cents,
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO customer_transactions (
            id, customer_id, product_id, kind, quantity, price_cents, discount_cents,
            total_price_cents, unit_cost_cents, shipping_cents, amount_paid_cents,
            transaction_date, invoice_number, notes, color, size, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&tx.id)
    .bind(&tx.customer_id)
    .bind(&tx.product_id)
    .bind(tx.kind)
    .bind(tx.quantity)
    .bind(tx.price_cents)
    .bind(tx.discount_cents)
    .bind(tx.total_price_cents)
    .bind(tx.unit_cost_cents)
    .bind(tx.shipping_cents)
    .bind(tx.amount_paid_cents)
    .bind(tx.transaction_date)
    .bind(&tx.invoice_number)
    .bind(&tx.notes)
    .bind(&tx.color)
    .bind(&tx.size)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CustomerTransaction>> {
    let tx = sqlx::query_as::<_, CustomerTransaction>(
        "SELECT * FROM customer_transactions WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(tx)
}

/// Rewrites the editable fields of an entry.
pub async fn update(conn: &mut SqliteConnection, tx: &CustomerTransaction) -> DbResult<()> {
    debug!(id = %tx.id, quantity = tx.quantity, "Updating transaction");

    let result = sqlx::query(
        r#"
        UPDATE customer_transactions SET
            kind = ?2,
            quantity = ?3,
            price_cents = ?4,
            discount_cents = ?5,
            total_price_cents = ?6,
            amount_paid_cents = ?7,
            transaction_date = ?8,
            notes = ?9,
            color = ?10,
            size = ?11
        WHERE id = ?1
        "#,
    )
    .bind(&tx.id)
    .bind(tx.kind)
    .bind(tx.quantity)
    .bind(tx.price_cents)
    .bind(tx.discount_cents)
    .bind(tx.total_price_cents)
    .bind(tx.amount_paid_cents)
    .bind(tx.transaction_date)
    .bind(&tx.notes)
    .bind(&tx.color)
    .bind(&tx.size)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Transaction", &tx.id));
    }

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting transaction");

    let result = sqlx::query("DELETE FROM customer_transactions WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Transaction", id));
    }

    Ok(())
}

/// Links an entry to its invoice and stores its share of the payment.
pub async fn link_invoice(
    conn: &mut SqliteConnection,
    id: &str,
    invoice_number: &str,
    amount_paid_cents: i64,
    shipping_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customer_transactions
        SET invoice_number = ?2, amount_paid_cents = ?3, shipping_cents = ?4
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(invoice_number)
    .bind(amount_paid_cents)
    .bind(shipping_cents)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Transaction", id));
    }

    Ok(())
}

/// Entries with `start <= transaction_date < end`, oldest first.
pub async fn list_between(
    conn: &mut SqliteConnection,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> DbResult<Vec<CustomerTransaction>> {
    let txs = sqlx::query_as::<_, CustomerTransaction>(
        r#"
        SELECT * FROM customer_transactions
        WHERE transaction_date >= ?1 AND transaction_date < ?2
        ORDER BY transaction_date, created_at, id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    Ok(txs)
}

/// Entries recorded on a calendar day.
pub async fn list_for_date(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Vec<CustomerTransaction>> {
    let (start, end) = day_bounds(date);
    list_between(conn, start, end).await
}

pub async fn list_for_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<CustomerTransaction>> {
    let txs = sqlx::query_as::<_, CustomerTransaction>(
        r#"
        SELECT * FROM customer_transactions
        WHERE customer_id = ?1
        ORDER BY transaction_date, created_at, id
        "#,
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(txs)
}

/// The customer's most recent sale of a product, if any.
pub async fn last_sale(
    conn: &mut SqliteConnection,
    customer_id: &str,
    product_id: &str,
) -> DbResult<Option<CustomerTransaction>> {
    let tx = sqlx::query_as::<_, CustomerTransaction>(
        r#"
        SELECT * FROM customer_transactions
        WHERE customer_id = ?1 AND product_id = ?2 AND quantity > 0
        ORDER BY transaction_date DESC, created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(customer_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(tx)
}

pub async fn list_by_invoice(
    conn: &mut SqliteConnection,
    invoice_number: &str,
) -> DbResult<Vec<CustomerTransaction>> {
    let txs = sqlx::query_as::<_, CustomerTransaction>(
        r#"
        SELECT * FROM customer_transactions
        WHERE invoice_number = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(invoice_number)
    .fetch_all(&mut *conn)
    .await?;

    Ok(txs)
}

/// `[date 00:00:00, date+1 00:00:00)`.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    let end = start + chrono::Duration::days(1);
    (start, end)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{customer, product};
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use dukan_core::{Customer, Product, TransactionKind};

    async fn seed(conn: &mut SqliteConnection) -> (String, String) {
        let now = Utc::now();
        let c = Customer {
            id: customer::generate_customer_id(),
            name: "Aisha".to_string(),
            phone: "03009999999".to_string(),
            address: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        customer::insert(conn, &c).await.unwrap();
        let p = Product {
            id: product::generate_product_id(),
            name: "Abaya".to_string(),
            quantity: 10,
            price_cents: 10_000,
            carton_price_cents: None,
            unit_cost_cents: None,
            color: None,
            size: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        product::insert(conn, &p).await.unwrap();
        (c.id, p.id)
    }

    fn entry(customer_id: &str, product_id: &str, at: NaiveDateTime) -> CustomerTransaction {
        CustomerTransaction {
            id: generate_transaction_id(),
            customer_id: customer_id.to_string(),
            product_id: Some(product_id.to_string()),
            kind: TransactionKind::Sale,
            quantity: 1,
            price_cents: 10_000,
            discount_cents: 0,
            total_price_cents: 10_000,
            unit_cost_cents: None,
            shipping_cents: 0,
            amount_paid_cents: 0,
            transaction_date: at,
            invoice_number: None,
            notes: None,
            color: None,
            size: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_day_range_is_half_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (c, p) = seed(&mut conn).await;

        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let (start, end) = day_bounds(day);
        insert(&mut conn, &entry(&c, &p, start)).await.unwrap();
        insert(&mut conn, &entry(&c, &p, end - chrono::Duration::seconds(1))).await.unwrap();
        insert(&mut conn, &entry(&c, &p, end)).await.unwrap();

        assert_eq!(list_for_date(&mut conn, day).await.unwrap().len(), 2);
        let next = day.succ_opt().unwrap();
        assert_eq!(list_for_date(&mut conn, next).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_and_link() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (c, p) = seed(&mut conn).await;
        let at = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(11, 30, 0).unwrap();
        let e = entry(&c, &p, at);
        insert(&mut conn, &e).await.unwrap();

        link_invoice(&mut conn, &e.id, "0001", 4000, 0).await.unwrap();
        let stored = get_by_id(&mut conn, &e.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, TransactionKind::Sale);
        assert_eq!(stored.transaction_date, at);
        assert_eq!(stored.amount_paid_cents, 4000);
        assert_eq!(list_by_invoice(&mut conn, "0001").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_sale_skips_returns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (c, p) = seed(&mut conn).await;
        assert!(last_sale(&mut conn, &c, &p).await.unwrap().is_none());

        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let older = entry(&c, &p, day.and_hms_opt(9, 0, 0).unwrap());
        let newer = CustomerTransaction {
            price_cents: 9500,
            discount_cents: 500,
            ..entry(&c, &p, day.and_hms_opt(12, 0, 0).unwrap())
        };
        let refund = CustomerTransaction {
            kind: TransactionKind::Return,
            quantity: -1,
            price_cents: 7000,
            total_price_cents: -7000,
            ..entry(&c, &p, day.and_hms_opt(15, 0, 0).unwrap())
        };
        for e in [&older, &newer, &refund] {
            insert(&mut conn, e).await.unwrap();
        }

        let last = last_sale(&mut conn, &c, &p).await.unwrap().unwrap();
        assert_eq!(last.id, newer.id);
        assert_eq!(last.price_cents - last.discount_cents, 9000);
    }

    #[tokio::test]
    async fn test_customer_delete_is_restricted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (c, p) = seed(&mut conn).await;
        let at = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(9, 0, 0).unwrap();
        insert(&mut conn, &entry(&c, &p, at)).await.unwrap();

        let err = customer::delete(&mut conn, &c).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}

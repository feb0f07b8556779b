//! # Customer Repository
//!
//! Database operations for customers. Phone numbers are unique; deleting a
//! customer that still owns ledger entries is refused by the foreign key.

use chrono::Utc;
use dukan_core::Customer;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Generates a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn insert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, phone = %customer.phone, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, address, notes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(&customer.notes)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

/// Looks a customer up by normalized phone number.
pub async fn get_by_phone(conn: &mut SqliteConnection, phone: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE phone = ?1")
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

/// Searches by name or phone fragment.
pub async fn search(conn: &mut SqliteConnection, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
    let pattern = format!("%{}%", query.trim());

    let customers = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE name LIKE ?1 OR phone LIKE ?1
        ORDER BY name
        LIMIT ?2
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(customers)
}

pub async fn update(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, "Updating customer");

    let result = sqlx::query(
        r#"
        UPDATE customers SET
            name = ?2, phone = ?3, address = ?4, notes = ?5, updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(&customer.notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", &customer.id));
    }

    Ok(())
}

/// Deletes a customer.
///
/// ## Errors
/// * `DbError::ForeignKeyViolation` - the customer still owns transactions
///   or invoices
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting customer");

    let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }

    Ok(())
}

/// Σ signed quantities of a customer's item entries for one product.
pub async fn net_purchased_quantity(
    conn: &mut SqliteConnection,
    customer_id: &str,
    product_id: &str,
) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0) FROM customer_transactions
        WHERE customer_id = ?1 AND product_id = ?2 AND kind <> 'payment'
        "#,
    )
    .bind(customer_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

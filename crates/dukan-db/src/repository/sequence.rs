//! # Sequence Repository
//!
//! Named monotonic counters backing invoice and order numbers.
//!
//! ```text
//! next_value("invoice_number", floor = 41)
//!
//!   no row yet  → INSERT value = floor + 1 = 42
//!   row exists  → UPDATE value = value + 1
//!
//!   both paths RETURNING value, inside the caller's transaction
//! ```
//!
//! Allocation happens inside the invoice transaction, so a rolled back
//! checkout never burns a number.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

pub const INVOICE_NUMBER: &str = "invoice_number";
pub const ORDER_NUMBER: &str = "order_number";

/// Current value of a counter, `None` before first use.
pub async fn current(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<i64>> {
    let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(value)
}

/// Increments a counter and returns the new value.
///
/// `floor` only matters for the first allocation: the counter starts at
/// `floor + 1`.
pub async fn next_value(conn: &mut SqliteConnection, name: &str, floor: i64) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sequences (name, value) VALUES (?1, ?2 + 1)
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .bind(floor)
    .fetch_one(&mut *conn)
    .await?;

    debug!(name = %name, value, "Allocated sequence value");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_counter_starts_above_floor_then_increments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        assert_eq!(current(&mut conn, INVOICE_NUMBER).await.unwrap(), None);
        assert_eq!(next_value(&mut conn, INVOICE_NUMBER, 41).await.unwrap(), 42);
        assert_eq!(next_value(&mut conn, INVOICE_NUMBER, 0).await.unwrap(), 43);
        assert_eq!(next_value(&mut conn, ORDER_NUMBER, 0).await.unwrap(), 1);
        assert_eq!(current(&mut conn, INVOICE_NUMBER).await.unwrap(), Some(43));
    }
}

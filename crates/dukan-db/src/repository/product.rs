//! # Product Repository
//!
//! Database operations for products, including the compare-and-swap
//! stock updates behind the inventory ledger.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Check-and-decrement in one statement                   │
//! │                                                                         │
//! │  UPDATE products                                                       │
//! │     SET quantity = quantity - 3                                        │
//! │   WHERE id = ?1 AND quantity >= 3                                      │
//! │                                                                         │
//! │  rows_affected = 1  → stock taken                                      │
//! │  rows_affected = 0  → not enough stock (or no such product)            │
//! │                                                                         │
//! │  No read-then-write window: two cashiers selling the last unit         │
//! │  cannot both succeed.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use dukan_core::ledger::StockMovement;
use dukan_core::Product;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Inserts a new product.
pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, quantity, price_cents, carton_price_cents, unit_cost_cents,
            color, size, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.quantity)
    .bind(product.price_cents)
    .bind(product.carton_price_cents)
    .bind(product.unit_cost_cents)
    .bind(&product.color)
    .bind(&product.size)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a product by its ID (active or not).
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Gets an active product by its exact name.
pub async fn get_active_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE name = ?1 AND is_active = 1",
    )
    .bind(name.trim())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Lists active products sorted by name.
pub async fn list_active(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

/// Searches active products by name fragment.
///
/// An empty query lists active products.
pub async fn search(conn: &mut SqliteConnection, query: &str, limit: u32) -> DbResult<Vec<Product>> {
    let query = query.trim();

    debug!(query = %query, limit = %limit, "Searching products");

    if query.is_empty() {
        return list_active(conn, limit).await;
    }

    let pattern = format!("%{}%", query);
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT * FROM products
        WHERE is_active = 1 AND name LIKE ?1
        ORDER BY name
        LIMIT ?2
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    debug!(count = products.len(), "Search returned products");
    Ok(products)
}

/// Updates the descriptive and pricing fields of a product.
///
/// Quantity is not touched here; stock only moves through the
/// movement functions below or [`restock`].
pub async fn update(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, "Updating product");

    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = ?2,
            price_cents = ?3,
            carton_price_cents = ?4,
            unit_cost_cents = ?5,
            color = ?6,
            size = ?7,
            updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(product.carton_price_cents)
    .bind(product.unit_cost_cents)
    .bind(&product.color)
    .bind(&product.size)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &product.id));
    }

    Ok(())
}

/// Adds received units and records the batch cost.
pub async fn restock(
    conn: &mut SqliteConnection,
    id: &str,
    added_quantity: i64,
    carton_price_cents: Option<i64>,
    unit_cost_cents: Option<i64>,
) -> DbResult<()> {
    debug!(id = %id, added_quantity, "Restocking product");

    let result = sqlx::query(
        r#"
        UPDATE products SET
            quantity = quantity + ?2,
            carton_price_cents = COALESCE(?3, carton_price_cents),
            unit_cost_cents = COALESCE(?4, unit_cost_cents),
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(added_quantity)
    .bind(carton_price_cents)
    .bind(unit_cost_cents)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Takes `quantity` units only if that many are on hand.
///
/// ## Returns
/// * `Ok(true)` - Stock decreased
/// * `Ok(false)` - Not enough stock, nothing changed
pub async fn decrease_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` units back unconditionally.
pub async fn increase_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Takes `quantity` units out without a stock check, stopping at zero.
pub async fn remove_stock_clamped(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET quantity = MAX(quantity - ?2, 0), updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Executes a planned stock movement.
///
/// Returns `false` only when a `Decrease` found too little stock.
pub async fn apply_movement(
    conn: &mut SqliteConnection,
    id: &str,
    movement: StockMovement,
) -> DbResult<bool> {
    debug!(id = %id, ?movement, "Applying stock movement");

    match movement {
        StockMovement::Decrease(quantity) => decrease_stock(conn, id, quantity).await,
        StockMovement::Increase(quantity) => {
            increase_stock(conn, id, quantity).await?;
            Ok(true)
        }
        StockMovement::Remove(quantity) => {
            remove_stock_clamped(conn, id, quantity).await?;
            Ok(true)
        }
        StockMovement::Unchanged => Ok(true),
    }
}

/// Soft deletes a product (sets is_active = false).
///
/// Ledger rows keep referring to it.
pub async fn soft_delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Soft deleting product");

    let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Counts active products.
pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(name: &str, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            quantity,
            price_cents: 10_000,
            carton_price_cents: None,
            unit_cost_cents: None,
            color: None,
            size: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let p = product("Abaya Black", 10);
        insert(&mut conn, &p).await.unwrap();

        let by_id = get_by_id(&mut conn, &p.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Abaya Black");
        let by_name = get_active_by_name(&mut conn, "Abaya Black").await.unwrap();
        assert_eq!(by_name.unwrap().id, p.id);
        assert_eq!(search(&mut conn, "abaya", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decrease_is_compare_and_swap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let p = product("Scarf", 3);
        insert(&mut conn, &p).await.unwrap();

        assert!(!decrease_stock(&mut conn, &p.id, 5).await.unwrap());
        assert!(decrease_stock(&mut conn, &p.id, 3).await.unwrap());
        assert_eq!(get_by_id(&mut conn, &p.id).await.unwrap().unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_remove_clamps_at_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let p = product("Hijab", 1);
        insert(&mut conn, &p).await.unwrap();

        apply_movement(&mut conn, &p.id, StockMovement::Remove(4)).await.unwrap();
        assert_eq!(get_by_id(&mut conn, &p.id).await.unwrap().unwrap().quantity, 0);

        apply_movement(&mut conn, &p.id, StockMovement::Increase(2)).await.unwrap();
        assert_eq!(get_by_id(&mut conn, &p.id).await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_soft_delete_frees_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let old = product("Niqab", 1);
        insert(&mut conn, &old).await.unwrap();
        soft_delete(&mut conn, &old.id).await.unwrap();

        assert!(get_active_by_name(&mut conn, "Niqab").await.unwrap().is_none());
        insert(&mut conn, &product("Niqab", 5)).await.unwrap();
        assert_eq!(count(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_restock_keeps_cost_when_absent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut p = product("Jilbab", 2);
        p.unit_cost_cents = Some(6000);
        insert(&mut conn, &p).await.unwrap();

        restock(&mut conn, &p.id, 5, None, None).await.unwrap();
        let after = get_by_id(&mut conn, &p.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 7);
        assert_eq!(after.unit_cost_cents, Some(6000));
    }
}

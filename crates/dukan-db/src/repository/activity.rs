//! # Activity Log Repository
//!
//! Append-only audit trail.

use chrono::Utc;
use dukan_core::ActivityLog;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::DbResult;

/// Appends one entry. `details` is stored as compact JSON.
pub async fn insert(
    conn: &mut SqliteConnection,
    action: &str,
    entity_type: &str,
    entity_id: Option<&str>,
    details: Option<&serde_json::Value>,
    actor: Option<&str>,
) -> DbResult<ActivityLog> {
    let entry = ActivityLog {
        id: Uuid::new_v4().to_string(),
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.map(str::to_string),
        details: details.map(|d| d.to_string()),
        actor: actor.map(str::to_string),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, action, entity_type, entity_id, details, actor, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.action)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.details)
    .bind(&entry.actor)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(entry)
}

/// Most recent entries first.
pub async fn list_recent(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<ActivityLog>> {
    let rows = sqlx::query_as::<_, ActivityLog>(
        "SELECT * FROM activity_logs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn list_for_entity(
    conn: &mut SqliteConnection,
    entity_type: &str,
    entity_id: &str,
) -> DbResult<Vec<ActivityLog>> {
    let rows = sqlx::query_as::<_, ActivityLog>(
        r#"
        SELECT * FROM activity_logs
        WHERE entity_type = ?1 AND entity_id = ?2
        ORDER BY created_at, rowid
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let details = serde_json::json!({ "quantity": 2 });

        insert(&mut conn, "return_recorded", "invoice", Some("0007"), Some(&details), Some("sara"))
            .await
            .unwrap();

        let rows = list_for_entity(&mut conn, "invoice", "0007").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details.as_deref(), Some(r#"{"quantity":2}"#));
        assert_eq!(list_recent(&mut conn, 10).await.unwrap().len(), 1);
    }
}

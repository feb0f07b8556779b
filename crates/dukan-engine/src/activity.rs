//! # Activity Sink
//!
//! Best-effort audit trail. A failed write is logged and dropped; it never
//! fails the business operation that produced it.

use dukan_core::ActivityLog;
use dukan_db::repository::activity;
use dukan_db::Database;
use tracing::{debug, error};

use crate::error::EngineResult;

/// Writes activity entries on their own connection.
///
/// Call it after the business transaction has committed.
#[derive(Debug, Clone, Copy)]
pub struct ActivitySink<'a> {
    db: &'a Database,
}

impl<'a> ActivitySink<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        ActivitySink { db }
    }

    /// Records one entry, swallowing any failure.
    pub async fn log(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        details: Option<serde_json::Value>,
        actor: Option<&str>,
    ) {
        let result = async {
            let mut conn = self.db.acquire().await?;
            activity::insert(&mut conn, action, entity_type, entity_id, details.as_ref(), actor)
                .await
        }
        .await;

        match result {
            Ok(_) => debug!(action, entity_type, entity_id, "Activity recorded"),
            Err(e) => error!(action, entity_type, entity_id, error = %e, "Failed to record activity"),
        }
    }

    pub async fn recent(&self, limit: u32) -> EngineResult<Vec<ActivityLog>> {
        let mut conn = self.db.acquire().await?;
        Ok(activity::list_recent(&mut conn, limit).await?)
    }

    pub async fn for_entity(&self, entity_type: &str, entity_id: &str) -> EngineResult<Vec<ActivityLog>> {
        let mut conn = self.db.acquire().await?;
        Ok(activity::list_for_entity(&mut conn, entity_type, entity_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig};

    #[tokio::test]
    async fn test_log_then_read_back() {
        let engine = Engine::open(EngineConfig::in_memory()).await.unwrap();
        let sink = engine.activity();

        sink.log(
            "day_closed",
            "daily_inventory",
            Some("2026-10-19"),
            Some(serde_json::json!({ "by": "sara" })),
            Some("sara"),
        )
        .await;

        let rows = sink.for_entity("daily_inventory", "2026-10-19").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "day_closed");
        assert_eq!(sink.recent(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let engine = Engine::open(EngineConfig::in_memory()).await.unwrap();
        engine.db().close().await;

        // pool closed: the write fails but the call returns normally
        engine
            .activity()
            .log("noop", "test", None, None, None)
            .await;
    }
}

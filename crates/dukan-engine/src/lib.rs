//! # dukan-engine: Reconciliation Services
//!
//! Turns cart lines, returns and exchanges into consistent stock levels,
//! customer balances, invoices and daily figures.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   checkout(cart)                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Cashier ──► customer validation ──► record lines + stock ──┐          │
//! │                                                              │ one DB   │
//! │   Invoicing ◄── proration, numbering ◄───────────────────────┘ tx       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Daily ──► per-transaction rules ──► product/customer summaries        │
//! │                                                                         │
//! │   save_return / save_exchange                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Returns ──► cap check, mirror lines, invoice ──► Reconciliation       │
//! │                                                    (today's figures,    │
//! │                                                     or pending flag)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use dukan_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::from_env()).await?;
//! let receipt = engine.cashier().checkout(&request, "sara").await?;
//! engine.daily().close(today, "sara").await?;
//! ```
//!
//! Services are cheap borrowed views over one [`Engine`]; the engine itself
//! is `Clone` and can be shared across tasks.

pub mod activity;
pub mod cashier;
pub mod catalog;
pub mod config;
pub mod daily;
pub mod error;
pub mod invoicing;
pub mod reconciliation;
pub mod returns;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::EngineConfig;
pub use error::{ApiError, EngineError, EngineResult, ErrorCode};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dukan_db::{Database, DbConfig};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use activity::ActivitySink;
use cashier::Cashier;
use catalog::Catalog;
use daily::DailyInventoryService;
use invoicing::InvoiceBuilder;
use reconciliation::Reconciliation;
use returns::ReturnTracker;

/// Shared handle to the database, configuration and aggregation locks.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: Arc<EngineConfig>,
    day_locks: Arc<DayLocks>,
}

impl Engine {
    /// Opens (and migrates) the configured database.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db_config = if config.is_in_memory() {
            DbConfig::in_memory()
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            DbConfig::new(&config.database_path)
        };

        let db = Database::new(db_config).await?;
        info!(store = %config.store_name, "Engine ready");

        Ok(Engine::with_database(db, config))
    }

    /// Wraps an already opened database.
    pub fn with_database(db: Database, config: EngineConfig) -> Self {
        Engine {
            db,
            config: Arc::new(config),
            day_locks: Arc::new(DayLocks::default()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cashier(&self) -> Cashier<'_> {
        Cashier::new(self)
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    pub fn invoices(&self) -> InvoiceBuilder<'_> {
        InvoiceBuilder::new(self)
    }

    pub fn returns(&self) -> ReturnTracker<'_> {
        ReturnTracker::new(self)
    }

    pub fn daily(&self) -> DailyInventoryService<'_> {
        DailyInventoryService::new(self)
    }

    pub fn reconciliation(&self) -> Reconciliation<'_> {
        Reconciliation::new(self)
    }

    pub fn activity(&self) -> ActivitySink<'_> {
        ActivitySink::new(&self.db)
    }

    /// Serializes aggregation work for one business date.
    pub(crate) async fn lock_day(&self, date: NaiveDate) -> OwnedMutexGuard<()> {
        self.day_locks.lock(date).await
    }
}

/// One async mutex per business date.
///
/// Entries only the map still references are dropped on the next lock, so
/// the map holds just the dates that are locked or awaited.
#[derive(Debug, Default)]
struct DayLocks {
    locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl DayLocks {
    async fn lock(&self, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|d, l| *d == date || Arc::strong_count(l) > 1);
            locks.entry(date).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_day_lock_serializes_same_date() {
        let engine = Engine::open(EngineConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let other = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();

        let guard = engine.lock_day(date).await;

        // another date is independent
        let _other_guard = engine.lock_day(other).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), engine.lock_day(date)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), engine.lock_day(date)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_day_locks_forget_released_dates() {
        let locks = DayLocks::default();
        let first = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        for offset in 0..100 {
            let date = first + chrono::Days::new(offset);
            let guard = locks.lock(date).await;
            drop(guard);
        }
        assert!(locks.tracked().await <= 1);

        // a held date survives pruning
        let held = locks.lock(first).await;
        let _next = locks.lock(first + chrono::Days::new(1)).await;
        let _later = locks.lock(first + chrono::Days::new(2)).await;
        assert_eq!(locks.tracked().await, 3);

        drop(held);
        let _again = locks.lock(first + chrono::Days::new(3)).await;
        assert_eq!(locks.tracked().await, 3);
    }
}

//! # Store Database
//!
//! Opens the shop's SQLite file and hands out connections and transactions.
//!
//! ## Access Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine::open ──► Database::new(DbConfig) ──► migrations applied        │
//! │                                                                         │
//! │  checkout / return / edit     begin()    one writer, one commit         │
//! │  exports / lookups            acquire()  readers on a WAL snapshot      │
//! │                                                                         │
//! │  A second writer waits up to `busy_timeout` instead of failing with     │
//! │  SQLITE_BUSY, so two tills closing a sale at once both succeed.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

/// Where the store's data lives and how many tills may hit it at once.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Upper bound on open connections. A shop rarely needs more than 4.
    pub pool_size: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on another writer's lock.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file-backed store; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            pool_size: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A throwaway store living in one connection.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is
    /// pinned to a single one.
    pub fn in_memory() -> Self {
        DbConfig {
            pool_size: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

/// Handle to the store's connection pool. Cheap to clone.
///
/// Repository functions take `&mut SqliteConnection`, so the same call runs
/// on an acquired connection or inside a transaction from [`Database::begin`].
/// With an in-memory store, drop one before asking for the next.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and, unless disabled, brings its schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store database");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        // WAL is meaningless without a file
        if !config.is_in_memory() {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            // an idle in-memory connection must never be reaped
            .idle_timeout(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(pool_size = config.pool_size, "Store pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending schema migrations. Safe to repeat.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Starts a unit of work. Dropping it uncommitted rolls everything back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Shuts the pool; later calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing store database");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sequence_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sequences")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(sequence_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            sqlx::query("INSERT INTO sequences (name, value) VALUES ('invoice', 1)")
                .execute(&mut *tx)
                .await
                .unwrap();
        }
        assert_eq!(sequence_count(&db).await, 0);

        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO sequences (name, value) VALUES ('invoice', 1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(sequence_count(&db).await, 1);
    }

    #[test]
    fn test_pool_size_floor() {
        let config = DbConfig::new("/tmp/dukan.db").pool_size(0);
        assert_eq!(config.pool_size, 1);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_closed_store_refuses_work() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(matches!(db.acquire().await, Err(DbError::ConnectionFailed(_))));
    }
}

//! # Database Handle
//!
//! Opens the SQLite file that holds checkpoints and settlements.
//!
//! ## Connection Setup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::new("splitdesk.db")      DbConfig::in_memory()               │
//! │          │                                  │                           │
//! │          ▼                                  ▼                           │
//! │  sqlite://splitdesk.db?mode=rwc      sqlite::memory: (1 connection)     │
//! │          │                                  │                           │
//! │          └──────────────┬───────────────────┘                           │
//! │                         ▼                                               │
//! │      WAL + synchronous=NORMAL + foreign_keys + busy_timeout             │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                 migrations::migrate                                     │
//! │                         │                                               │
//! │                         ▼                                               │
//! │      db.checkpoints()   db.settlements()   impl SettlementStore         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Several terminals may open the same file. WAL lets readers proceed while
//! one terminal writes, and the busy timeout makes a second writer wait for
//! the first instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations::{self, SchemaStatus};
use crate::repository::checkpoint::CheckpointRepository;
use crate::repository::settlement::SettlementRepository;

/// Where the settlement database lives and how the pool behaves.
#[derive(Debug, Clone)]
pub struct DbConfig {
    location: Location,
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: Location::File(path.into()),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private database for tests and `splitdesk demo --in-memory`.
    ///
    /// Each `:memory:` connection is its own empty database, so the pool is
    /// pinned to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            location: Location::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn without_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == Location::Memory
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            Location::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            Location::Memory => SqliteConnectOptions::new().in_memory(true),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

/// Counts shown by `splitdesk init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOverview {
    pub schema: SchemaStatus,
    pub open_checkpoints: i64,
    pub settlements: i64,
}

/// Handle to the settlement database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let target = config
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10));
        if config.is_in_memory() {
            // Dropping the only connection would drop the database with it.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{target}: {e}")))?;

        info!(
            database = %target,
            max_connections = config.max_connections,
            "Settlement database opened"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::migrate(&db.pool).await?;
        }
        Ok(db)
    }

    pub async fn migrate(&self) -> DbResult<()> {
        migrations::migrate(&self.pool).await
    }

    pub async fn schema_status(&self) -> DbResult<SchemaStatus> {
        migrations::schema_status(&self.pool).await
    }

    pub async fn overview(&self) -> DbResult<StoreOverview> {
        let schema = self.schema_status().await?;
        if !schema.is_current() {
            return Ok(StoreOverview {
                schema,
                open_checkpoints: 0,
                settlements: 0,
            });
        }

        let open_checkpoints: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkpoints")
            .fetch_one(&self.pool)
            .await?;
        let settlements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settlements")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreOverview {
            schema,
            open_checkpoints,
            settlements,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn checkpoints(&self) -> CheckpointRepository {
        CheckpointRepository::new(self.pool.clone())
    }

    pub fn settlements(&self) -> SettlementRepository {
        SettlementRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let overview = db.overview().await.unwrap();
        assert!(overview.schema.is_current());
        assert!(overview.schema.embedded >= 1);
        assert_eq!(overview.open_checkpoints, 0);
        assert_eq!(overview.settlements, 0);

        // Second run is a no-op.
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_zero() {
        let db = Database::new(DbConfig::in_memory().without_migrations())
            .await
            .unwrap();

        let overview = db.overview().await.unwrap();
        assert_eq!(overview.schema.applied, 0);
        assert!(!overview.schema.is_current());
    }

    #[test]
    fn test_config() {
        let config = DbConfig::new("/tmp/splitdesk.db").with_max_connections(0);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.path(), Some(Path::new("/tmp/splitdesk.db")));
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.path(), None);
    }
}

//! Embedded schema for checkpoints and settlements.
//!
//! Files live in `migrations/sqlite/` at the workspace root and are applied
//! in filename order. Never edit a shipped file; add `NNN_*.sql` instead.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

pub(crate) static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far the database schema is from the embedded migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub applied: usize,
    pub embedded: usize,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

pub async fn migrate(pool: &SqlitePool) -> DbResult<()> {
    let before = schema_status(pool).await?;
    if before.is_current() {
        debug!(applied = before.applied, "Schema already current");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;
    info!(
        from = before.applied,
        to = before.embedded,
        "Settlement schema migrated"
    );
    Ok(())
}

/// Counts applied migrations. A database that was never migrated has no
/// `_sqlx_migrations` table and reports zero.
pub async fn schema_status(pool: &SqlitePool) -> DbResult<SchemaStatus> {
    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table > 0 {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    Ok(SchemaStatus {
        applied: applied as usize,
        embedded: MIGRATOR.migrations.len(),
    })
}

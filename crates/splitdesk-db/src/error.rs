//! # Persistence Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sqlx::Error ──────────┐                                                │
//! │  MigrateError ─────────┼──► DbError ──► SessionError::Persistence       │
//! │  serde_json::Error ────┘        │                                       │
//! │                                 └─ OrderClosed ──► SessionError::       │
//! │                                                    OrderClosed          │
//! │                                                                         │
//! │  Transient (busy, pool, connection): the desk keeps the session local  │
//! │  and the cashier may retry. Everything else needs a person to look.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The order already has a settlement.
    ///
    /// ## When This Occurs
    /// - A second finalize for the same order
    /// - A checkpoint save racing a finalize from another terminal
    #[error("Order {order_id} is already settled")]
    OrderClosed { order_id: String },

    /// A UNIQUE or FOREIGN KEY constraint rejected the write.
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Another connection holds the write lock past the busy timeout.
    #[error("Database is busy")]
    Busy,

    /// ## When This Occurs
    /// - The database file can't be created (permissions, missing directory)
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored JSON payload could not be written or read back.
    #[error("Invalid stored payload: {0}")]
    Payload(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn order_closed(order_id: impl Into<String>) -> Self {
        DbError::OrderClosed {
            order_id: order_id.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy | DbError::PoolExhausted | DbError::ConnectionFailed(_)
        )
    }
}

/// ## Mapping
/// ```text
/// RowNotFound                      → NotFound
/// SQLITE_BUSY / SQLITE_LOCKED      → Busy
/// UNIQUE / FOREIGN KEY failure     → Constraint
/// PoolTimedOut                     → PoolExhausted
/// Io / PoolClosed                  → ConnectionFailed
/// anything else                    → Internal (logged)
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                let msg = db_err.message();

                // Primary result codes: 5 SQLITE_BUSY, 6 SQLITE_LOCKED.
                if code == "5" || code == "6" || msg.contains("database is locked") {
                    DbError::Busy
                } else if msg.contains("UNIQUE constraint failed")
                    || msg.contains("FOREIGN KEY constraint failed")
                {
                    DbError::Constraint(msg.to_string())
                } else {
                    DbError::Internal(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            other => {
                tracing::error!(error = %other, "Unexpected database error");
                DbError::Internal(other.to_string())
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Payload(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

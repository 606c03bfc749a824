//! # Checkpoint Repository
//!
//! One row per order with a split in progress. Saving is an upsert: the
//! latest "save and continue" wins. Two terminals saving the same order
//! overwrite each other (last write wins); there is no locking.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use splitdesk_core::CheckpointSnapshot;

/// Listing row (no payload).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckpointRow {
    pub order_id: String,
    pub payer_count: i64,
    pub paid_count: i64,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckpointRepository {
    pool: SqlitePool,
}

impl CheckpointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CheckpointRepository { pool }
    }

    /// Inserts or replaces the checkpoint for `snapshot.order_id`.
    ///
    /// Fails with `OrderClosed` when the order already has a settlement, so
    /// a stale terminal can never resurrect a closed order.
    pub async fn save(&self, snapshot: &CheckpointSnapshot) -> DbResult<()> {
        debug!(
            order_id = %snapshot.order_id,
            payers = snapshot.payer_count(),
            "Saving checkpoint"
        );

        let payload = serde_json::to_string(snapshot)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let settled: Option<String> =
            sqlx::query_scalar("SELECT id FROM settlements WHERE order_id = ?1")
                .bind(&snapshot.order_id)
                .fetch_optional(&mut *tx)
                .await?;

        if settled.is_some() {
            return Err(DbError::order_closed(&snapshot.order_id));
        }

        sqlx::query(
            r#"
            INSERT INTO checkpoints (order_id, payload, payer_count, paid_count, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (order_id) DO UPDATE SET
                payload = excluded.payload,
                payer_count = excluded.payer_count,
                paid_count = excluded.paid_count,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&snapshot.order_id)
        .bind(&payload)
        .bind(snapshot.payer_count() as i64)
        .bind(snapshot.paid_count() as i64)
        .bind(snapshot.saved_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    pub async fn load(&self, order_id: &str) -> DbResult<Option<CheckpointSnapshot>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM checkpoints WHERE order_id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Deletes the checkpoint. Returns whether one existed.
    pub async fn clear(&self, order_id: &str) -> DbResult<bool> {
        debug!(order_id = %order_id, "Clearing checkpoint");

        let result = sqlx::query("DELETE FROM checkpoints WHERE order_id = ?1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Open checkpoints, most recently saved first.
    pub async fn list(&self) -> DbResult<Vec<CheckpointRow>> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r#"
            SELECT order_id, payer_count, paid_count, saved_at
            FROM checkpoints
            ORDER BY saved_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

//! # Settlement Repository
//!
//! Finalized settlements. Writing one closes the order.
//!
//! ## Finalize Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. SELECT settlements WHERE order_id = ?     → exists? OrderClosed     │
//! │  2. INSERT settlements (payload = record JSON)                          │
//! │  3. INSERT settlement_payers (one row per payer, in payer order)        │
//! │  4. DELETE checkpoints WHERE order_id = ?                               │
//! │  5. COMMIT                                                              │
//! │                                                                         │
//! │  Any failure rolls everything back: the checkpoint survives and the    │
//! │  order stays open.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use splitdesk_core::SettlementRecord;

/// Header row of a settlement.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettlementRow {
    pub id: String,
    pub order_id: String,
    pub total_cents: i64,
    pub fee_cents: i64,
    pub payer_count: i64,
    pub operator_id: Option<String>,
    pub settled_at: DateTime<Utc>,
}

/// One payer line of a settlement, as stored for reporting.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettlementPayerRow {
    pub position: i64,
    pub payer_id: String,
    pub name: String,
    pub total_due_cents: i64,
    pub change_cents: i64,
    pub fee_cents: i64,
    pub payment_method_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Persists the record, closes the order and drops its checkpoint.
    ///
    /// Returns the generated settlement id.
    pub async fn finalize(
        &self,
        record: &SettlementRecord,
        operator_id: Option<&str>,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(record)?;

        debug!(
            order_id = %record.order_id,
            settlement_id = %id,
            total = %record.total,
            "Finalizing settlement"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM settlements WHERE order_id = ?1")
                .bind(&record.order_id)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            return Err(DbError::order_closed(&record.order_id));
        }

        sqlx::query(
            r#"
            INSERT INTO settlements (
                id, order_id, total_cents, fee_cents, payer_count,
                operator_id, payload, settled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(&record.order_id)
        .bind(record.total.cents())
        .bind(record.total_fees().cents())
        .bind(record.payers.len() as i64)
        .bind(operator_id)
        .bind(&payload)
        .bind(record.settled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Constraint(msg) if msg.contains("settlements.order_id") => {
                DbError::order_closed(&record.order_id)
            }
            other => other,
        })?;

        for (position, payer) in record.payers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO settlement_payers (
                    settlement_id, position, payer_id, name,
                    total_due_cents, change_cents, fee_cents,
                    payment_method_id, paid_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&id)
            .bind(position as i64)
            .bind(&payer.payer_id)
            .bind(&payer.name)
            .bind(payer.total_due.cents())
            .bind(payer.change.cents())
            .bind(payer.fee.cents())
            .bind(payer.payment_method_id.as_deref())
            .bind(payer.paid_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM checkpoints WHERE order_id = ?1")
            .bind(&record.order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(order_id = %record.order_id, settlement_id = %id, "Order settled");
        Ok(id)
    }

    /// Full record for an order, decoded from the stored payload.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<SettlementRecord>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM settlements WHERE order_id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn is_closed(&self, order_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settlements WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Payer lines for an order in payer order.
    pub async fn payer_lines(&self, order_id: &str) -> DbResult<Vec<SettlementPayerRow>> {
        let rows = sqlx::query_as::<_, SettlementPayerRow>(
            r#"
            SELECT
                p.position, p.payer_id, p.name,
                p.total_due_cents, p.change_cents, p.fee_cents,
                p.payment_method_id, p.paid_at
            FROM settlement_payers p
            JOIN settlements s ON s.id = p.settlement_id
            WHERE s.order_id = ?1
            ORDER BY p.position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Most recent settlements, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<SettlementRow>> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT id, order_id, total_cents, fee_cents, payer_count, operator_id, settled_at
            FROM settlements
            ORDER BY settled_at DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

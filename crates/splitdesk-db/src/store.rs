//! # Settlement Store
//!
//! The persistence seam the settlement desk talks to. `Database` is the
//! production implementation; tests substitute in-memory or failing stores.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::pool::Database;
use splitdesk_core::{CheckpointSnapshot, SettlementRecord};

/// Durable storage for checkpoints and final settlements.
///
/// ## Contract
/// - `save_checkpoint` replaces any previous checkpoint for the order and
///   fails with `OrderClosed` once the order is settled
/// - `finalize` is atomic: it writes the record and removes the checkpoint,
///   or does neither. A second finalize fails with `OrderClosed`
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn save_checkpoint(&self, snapshot: &CheckpointSnapshot) -> DbResult<()>;

    async fn load_checkpoint(&self, order_id: &str) -> DbResult<Option<CheckpointSnapshot>>;

    async fn clear_checkpoint(&self, order_id: &str) -> DbResult<()>;

    async fn finalize(&self, record: &SettlementRecord, operator_id: &str) -> DbResult<()>;

    async fn load_settlement(&self, order_id: &str) -> DbResult<Option<SettlementRecord>>;

    async fn is_closed(&self, order_id: &str) -> DbResult<bool>;
}

#[async_trait]
impl SettlementStore for Database {
    async fn save_checkpoint(&self, snapshot: &CheckpointSnapshot) -> DbResult<()> {
        self.checkpoints().save(snapshot).await
    }

    async fn load_checkpoint(&self, order_id: &str) -> DbResult<Option<CheckpointSnapshot>> {
        self.checkpoints().load(order_id).await
    }

    async fn clear_checkpoint(&self, order_id: &str) -> DbResult<()> {
        self.checkpoints().clear(order_id).await?;
        Ok(())
    }

    async fn finalize(&self, record: &SettlementRecord, operator_id: &str) -> DbResult<()> {
        self.settlements().finalize(record, Some(operator_id)).await?;
        Ok(())
    }

    async fn load_settlement(&self, order_id: &str) -> DbResult<Option<SettlementRecord>> {
        self.settlements().get_by_order(order_id).await
    }

    async fn is_closed(&self, order_id: &str) -> DbResult<bool> {
        self.settlements().is_closed(order_id).await
    }
}

//! Checkpoint snapshot: the serializable form of an in-progress session.
//!
//! Persisted by the store on "save and continue" and turned back into a
//! live session by `SettlementSession::restore`, which re-checks every
//! invariant before trusting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::payer::Payer;
use crate::types::LineItem;

/// Current snapshot layout. Bumped whenever a field changes meaning.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSnapshot {
    pub version: u32,
    pub order_id: String,
    pub order_total: Money,
    /// Line items as they were when the session opened.
    pub items: Vec<LineItem>,
    /// Unassigned quantity per item id.
    pub remaining: BTreeMap<String, i64>,
    pub payers: Vec<Payer>,
    pub next_payer_seq: u32,
    #[ts(as = "String")]
    pub saved_at: DateTime<Utc>,
}

impl CheckpointSnapshot {
    pub fn payer_count(&self) -> usize {
        self.payers.len()
    }

    pub fn paid_count(&self) -> usize {
        self.payers.iter().filter(|p| p.is_paid()).count()
    }

    /// True when the snapshot was taken over exactly these line items and
    /// the same order total. `None` stands for the sum of the line totals,
    /// as in `SettlementSession::open`.
    pub fn matches_order(&self, items: &[LineItem], order_total: Option<Money>) -> bool {
        if self.items != items {
            return false;
        }

        let expected = match order_total {
            Some(total) => Some(total),
            None => items.iter().try_fold(Money::zero(), |acc, item| {
                item.unit_price
                    .checked_multiply_quantity(item.quantity)
                    .and_then(|line| acc.checked_add(line))
            }),
        };
        expected == Some(self.order_total)
    }
}

//! # Settlement Session
//!
//! One bill being split: the order's catalog, the allocation ledger, the
//! payers and the configuration they are validated against.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(order, items)            restore(snapshot)                       │
//! │         │                              │                                │
//! │         └──────────────┬───────────────┘                                │
//! │                        ▼                                                │
//! │               ┌─────────────────┐                                       │
//! │               │    EDITING      │◄── assign / split / pay / adjust      │
//! │               └────────┬────────┘                                       │
//! │             ┌──────────┴───────────┐                                    │
//! │             ▼                      ▼                                    │
//! │   validate_partial + snapshot   validate_full + settlement_record       │
//! │   (checkpoint, keep editing)    (order closed, session discarded)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is single-owner: one cashier context mutates it at a time.
//! Persistence and operator checks live in `splitdesk-session`; this type is
//! pure and takes the current time as an argument wherever it needs one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::allocation::AllocationLedger;
use crate::catalog::{LineItemCatalog, PaymentMethodCatalog};
use crate::checkpoint::{CheckpointSnapshot, CHECKPOINT_VERSION};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::payer::{Payer, PayerLedger};
use crate::settlement::{validate_full, validate_partial, SettlementRecord, Violations};
use crate::types::LineItem;
use crate::validation::{
    validate_entry, validate_id, validate_non_negative, validate_payer_name, validate_uuid,
};
use crate::{DEFAULT_MAX_PAYERS, DEFAULT_PAYER_NAME_PREFIX, DEFAULT_TOLERANCE_CENTS};

// =============================================================================
// Settings
// =============================================================================

/// Engine knobs supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Largest |Σ total_due − order_total| still accepted at finalization.
    pub tolerance: Money,
    /// Default payer names are `"<prefix> <n>"`.
    pub payer_name_prefix: String,
    pub max_payers: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            tolerance: Money::from_cents(DEFAULT_TOLERANCE_CENTS),
            payer_name_prefix: DEFAULT_PAYER_NAME_PREFIX.to_string(),
            max_payers: DEFAULT_MAX_PAYERS,
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Totals the cashier screen shows alongside the payer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub order_id: String,
    pub order_total: Money,
    /// Σ payer subtotals (items and remainder entries).
    pub assigned_value: Money,
    pub unassigned_value: Money,
    /// `order_total − assigned_value`; what a remainder split would spread.
    pub residual: Money,
    /// Σ payer total_due, after discounts and surcharges.
    pub total_due: Money,
    pub paid_total: Money,
    pub outstanding: Money,
    pub fees: Money,
    pub payer_count: usize,
    pub paid_count: usize,
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone)]
pub struct SettlementSession {
    order_id: String,
    order_total: Money,
    methods: PaymentMethodCatalog,
    ledger: AllocationLedger,
    payers: PayerLedger,
    settings: SessionSettings,
}

impl SettlementSession {
    /// Opens a fresh session seeded with one default payer.
    ///
    /// `order_total` defaults to the sum of the line totals. Pass it
    /// explicitly when the order carries a value the items do not (service
    /// charge, rounding) so it can be spread with a remainder split.
    pub fn open(
        order_id: &str,
        items: Vec<LineItem>,
        order_total: Option<Money>,
        methods: PaymentMethodCatalog,
        settings: SessionSettings,
    ) -> CoreResult<Self> {
        validate_id("order id", order_id)?;
        let catalog = LineItemCatalog::new(items)?;

        let order_total = order_total.unwrap_or_else(|| catalog.total());
        validate_non_negative("order total", order_total)?;

        let mut payers = PayerLedger::new();
        payers.add(None, &settings)?;

        Ok(SettlementSession {
            order_id: order_id.to_string(),
            order_total,
            methods,
            ledger: AllocationLedger::new(catalog),
            payers,
            settings,
        })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn order_total(&self) -> Money {
        self.order_total
    }

    pub fn items(&self) -> &[LineItem] {
        self.ledger.catalog().items()
    }

    pub fn methods(&self) -> &PaymentMethodCatalog {
        &self.methods
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    pub fn payers(&self) -> &PayerLedger {
        &self.payers
    }

    pub fn payer(&self, payer_id: &str) -> CoreResult<&Payer> {
        self.payers.get(payer_id)
    }

    pub fn remaining(&self, item_id: &str) -> CoreResult<i64> {
        self.ledger.remaining(item_id)
    }

    /// Unpaid payers in ledger order: the default target of every split.
    pub fn eligible_payer_ids(&self) -> Vec<String> {
        self.payers.unpaid_ids()
    }

    // -------------------------------------------------------------------------
    // Payers
    // -------------------------------------------------------------------------

    /// Adds a payer and returns its id.
    pub fn add_payer(&mut self, name: Option<&str>) -> CoreResult<String> {
        let payer = self.payers.add(name, &self.settings)?;
        Ok(payer.id().to_string())
    }

    pub fn rename_payer(&mut self, payer_id: &str, name: &str) -> CoreResult<()> {
        self.payers.rename(payer_id, name)
    }

    /// Removes a payer, returning its units to the pool first.
    ///
    /// Allowed even for paid payers; the last payer can never be removed.
    pub fn remove_payer(&mut self, payer_id: &str) -> CoreResult<()> {
        let removed = self.payers.remove(payer_id)?;
        self.ledger.release_payer(&removed);
        Ok(())
    }

    /// Sets a payer's discount.
    ///
    /// ## Permissions
    /// Ungated here: this crate has no notion of operators. Cashier-facing
    /// callers go through `SettlementDesk::apply_discount`, which requires
    /// `Permission::ApplyDiscount` before calling this.
    pub fn set_discount(&mut self, payer_id: &str, discount: Money) -> CoreResult<()> {
        self.payers.set_discount(payer_id, discount)
    }

    /// Sets a payer's surcharge.
    ///
    /// ## Permissions
    /// Ungated here. Cashier-facing callers go through
    /// `SettlementDesk::apply_surcharge` (`Permission::ApplySurcharge`).
    pub fn set_surcharge(&mut self, payer_id: &str, surcharge: Money) -> CoreResult<()> {
        self.payers.set_surcharge(payer_id, surcharge)
    }

    pub fn set_payment_method(&mut self, payer_id: &str, method_id: Option<&str>) -> CoreResult<()> {
        self.payers
            .set_payment_method(payer_id, method_id, &self.methods)
    }

    pub fn update_tendered_amount(&mut self, payer_id: &str, amount: Money) -> CoreResult<Money> {
        self.payers
            .update_tendered_amount(payer_id, amount, &self.methods)
    }

    pub fn toggle_paid(&mut self, payer_id: &str, now: DateTime<Utc>) -> CoreResult<bool> {
        self.payers.toggle_paid(payer_id, now)
    }

    pub fn fee(&self, payer_id: &str) -> CoreResult<Money> {
        self.payers.fee(payer_id, &self.methods)
    }

    // -------------------------------------------------------------------------
    // Allocation
    // -------------------------------------------------------------------------

    pub fn assign(&mut self, item_id: &str, payer_id: &str, quantity: i64) -> CoreResult<()> {
        self.ledger
            .assign(item_id, payer_id, quantity, &mut self.payers)
    }

    pub fn unassign(&mut self, item_id: &str, payer_id: &str) -> CoreResult<i64> {
        self.ledger.unassign(item_id, payer_id, &mut self.payers)
    }

    pub fn split_evenly(&mut self, item_id: &str, eligible: &[String]) -> CoreResult<()> {
        self.ledger
            .split_evenly(item_id, eligible, &mut self.payers)
    }

    pub fn split_remainder_value(&mut self, eligible: &[String]) -> CoreResult<Money> {
        self.ledger
            .split_remainder_value(self.order_total, eligible, &mut self.payers)
    }

    pub fn split_all_evenly(&mut self, eligible: &[String]) -> CoreResult<()> {
        self.ledger.split_all_evenly(eligible, &mut self.payers)
    }

    // -------------------------------------------------------------------------
    // Validation and output
    // -------------------------------------------------------------------------

    pub fn validate_full(&self) -> Result<(), Violations> {
        validate_full(
            &self.payers,
            self.order_total,
            self.settings.tolerance,
            &self.methods,
        )
    }

    pub fn validate_partial(&self) -> Result<(), Violations> {
        validate_partial(&self.payers, &self.methods)
    }

    pub fn summary(&self) -> SessionSummary {
        let assigned_value = self.ledger.assigned_value(&self.payers);
        let (paid_total, outstanding) = self.payers.iter().fold(
            (Money::zero(), Money::zero()),
            |(paid, open), p| {
                if p.is_paid() {
                    (paid + p.total_due(), open)
                } else {
                    (paid, open + p.total_due())
                }
            },
        );
        let fees = self
            .payers
            .iter()
            .filter_map(|p| self.payers.fee(p.id(), &self.methods).ok())
            .sum();

        SessionSummary {
            order_id: self.order_id.clone(),
            order_total: self.order_total,
            assigned_value,
            unassigned_value: self.ledger.unassigned_value(),
            residual: self.order_total - assigned_value,
            total_due: paid_total + outstanding,
            paid_total,
            outstanding,
            fees,
            payer_count: self.payers.len(),
            paid_count: self.payers.paid_count(),
        }
    }

    /// Builds the final record. Callers run `validate_full` first.
    pub fn settlement_record(&self, settled_at: DateTime<Utc>) -> CoreResult<SettlementRecord> {
        SettlementRecord::build(&self.order_id, &self.payers, &self.methods, settled_at)
    }

    // -------------------------------------------------------------------------
    // Checkpoints
    // -------------------------------------------------------------------------

    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> CheckpointSnapshot {
        CheckpointSnapshot {
            version: CHECKPOINT_VERSION,
            order_id: self.order_id.clone(),
            order_total: self.order_total,
            items: self.items().to_vec(),
            remaining: self.ledger.remaining_quantities().clone(),
            payers: self.payers.iter().cloned().collect(),
            next_payer_seq: self.payers.next_seq(),
            saved_at,
        }
    }

    /// Rebuilds a session from a snapshot.
    ///
    /// ## Checks
    /// - Known snapshot version and well-formed order id / items
    /// - At least one payer, unique UUID payer ids, valid names
    /// - Discounts, surcharges, tenders and entry prices within bounds
    /// - Positive entry quantities, single-unit remainder entries
    /// - Paid payers carry a payment method
    /// - Conservation holds for every item
    ///
    /// Any failure is reported as `CorruptCheckpoint`.
    pub fn restore(
        snapshot: CheckpointSnapshot,
        methods: PaymentMethodCatalog,
        settings: SessionSettings,
    ) -> CoreResult<Self> {
        if snapshot.version != CHECKPOINT_VERSION {
            return Err(CoreError::CorruptCheckpoint(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }

        validate_id("order id", &snapshot.order_id).map_err(corrupt)?;
        validate_non_negative("order total", snapshot.order_total).map_err(corrupt)?;
        let catalog = LineItemCatalog::new(snapshot.items).map_err(corrupt)?;

        if snapshot.payers.is_empty() {
            return Err(CoreError::CorruptCheckpoint("no payers".to_string()));
        }

        let mut seen = HashSet::with_capacity(snapshot.payers.len());
        for payer in &snapshot.payers {
            validate_uuid(payer.id()).map_err(corrupt)?;
            if !seen.insert(payer.id().to_string()) {
                return Err(CoreError::CorruptCheckpoint(format!(
                    "duplicate payer {}",
                    payer.id()
                )));
            }
            validate_payer(payer).map_err(corrupt)?;
            if payer.is_paid() && payer.payment_method_id().is_none() {
                return Err(CoreError::CorruptCheckpoint(format!(
                    "payer {} is paid without a payment method",
                    payer.id()
                )));
            }
        }

        let next_seq = snapshot
            .next_payer_seq
            .max(snapshot.payers.len() as u32 + 1);
        let mut payers = PayerLedger::from_parts(snapshot.payers, next_seq);
        for payer in payers.iter_mut() {
            payer.refresh_change();
        }

        let ledger = AllocationLedger::from_parts(catalog, snapshot.remaining);
        ledger.verify_conservation(&payers)?;

        Ok(SettlementSession {
            order_id: snapshot.order_id,
            order_total: snapshot.order_total,
            methods,
            ledger,
            payers,
            settings,
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> CoreError {
    CoreError::CorruptCheckpoint(err.to_string())
}

fn validate_payer(payer: &Payer) -> Result<(), String> {
    let tag = |e: ValidationError| format!("payer {}: {e}", payer.id());

    validate_payer_name(payer.name()).map_err(tag)?;
    validate_non_negative("discount", payer.discount()).map_err(tag)?;
    validate_non_negative("surcharge", payer.surcharge()).map_err(tag)?;
    if let Some(tendered) = payer.amount_tendered() {
        validate_non_negative("amount tendered", tendered).map_err(tag)?;
    }
    for entry in payer.entries() {
        validate_entry(entry).map_err(tag)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

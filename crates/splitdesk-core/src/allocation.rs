//! # Allocation Ledger
//!
//! Tracks how many units of each line item are still unassigned and moves
//! units (or remainder value) between the pool and payers.
//!
//! ## Conservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every line item, at every observable moment:                       │
//! │                                                                         │
//! │     remaining[item] + Σ payer.assigned_quantity(item) == item.quantity  │
//! │                                                                         │
//! │  ┌───────────┐  assign / split_evenly   ┌───────────┐                   │
//! │  │ remaining │ ───────────────────────► │  payers   │                   │
//! │  │   pool    │ ◄─────────────────────── │  entries  │                   │
//! │  └───────────┘  unassign / remove payer └───────────┘                   │
//! │                                                                         │
//! │  Remainder entries carry value only; they never touch the pool.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation validates fully before mutating anything, so a rejected
//! call leaves both the pool and the payers untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::catalog::LineItemCatalog;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::payer::{Payer, PayerLedger};
use crate::types::{AllocationEntry, ItemRef, LineItem};

// =============================================================================
// Allocation Ledger
// =============================================================================

/// Unassigned quantity per line item, keyed by item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLedger {
    catalog: LineItemCatalog,
    remaining: BTreeMap<String, i64>,
}

impl AllocationLedger {
    /// Fresh ledger: every unit of every item is unassigned.
    pub fn new(catalog: LineItemCatalog) -> Self {
        let remaining = catalog
            .items()
            .iter()
            .map(|item| (item.id.clone(), item.quantity))
            .collect();

        AllocationLedger { catalog, remaining }
    }

    /// Rebuilds a ledger from persisted counts. Use `verify_conservation`
    /// against the restored payers before trusting it.
    pub(crate) fn from_parts(catalog: LineItemCatalog, remaining: BTreeMap<String, i64>) -> Self {
        AllocationLedger { catalog, remaining }
    }

    pub fn catalog(&self) -> &LineItemCatalog {
        &self.catalog
    }

    pub fn remaining(&self, item_id: &str) -> CoreResult<i64> {
        self.catalog.get(item_id)?;
        Ok(self.remaining.get(item_id).copied().unwrap_or(0))
    }

    pub fn remaining_quantities(&self) -> &BTreeMap<String, i64> {
        &self.remaining
    }

    /// Value of every unit still in the pool.
    pub fn unassigned_value(&self) -> Money {
        self.catalog
            .items()
            .iter()
            .map(|item| {
                let left = self.remaining.get(&item.id).copied().unwrap_or(0);
                item.unit_price.multiply_quantity(left)
            })
            .sum()
    }

    /// Value held by payers, item and remainder entries alike, before
    /// discounts and surcharges.
    pub fn assigned_value(&self, payers: &PayerLedger) -> Money {
        payers.iter().map(Payer::subtotal).sum()
    }

    // -------------------------------------------------------------------------
    // Manual assignment
    // -------------------------------------------------------------------------

    /// Moves `quantity` units of an item from the pool to a payer.
    ///
    /// Merges into the payer's existing entry for the item if there is one.
    pub fn assign(
        &mut self,
        item_id: &str,
        payer_id: &str,
        quantity: i64,
        payers: &mut PayerLedger,
    ) -> CoreResult<()> {
        let item = self.catalog.get(item_id)?.clone();
        payers.get(payer_id)?.ensure_unpaid()?;

        let left = self.remaining(item_id)?;
        if quantity <= 0 || quantity > left {
            return Err(CoreError::InvalidQuantity {
                item_id: item_id.to_string(),
                requested: quantity,
                remaining: left,
            });
        }

        self.give(&item, payer_id, quantity, payers)
    }

    /// Returns a payer's full holding of one item to the pool.
    ///
    /// Returns the quantity moved (0 when the payer held none).
    pub fn unassign(
        &mut self,
        item_id: &str,
        payer_id: &str,
        payers: &mut PayerLedger,
    ) -> CoreResult<i64> {
        self.catalog.get(item_id)?;
        let payer = payers.get_mut(payer_id)?;
        payer.ensure_unpaid()?;

        let held = payer.assigned_quantity(item_id);
        if held == 0 {
            return Ok(0);
        }

        payer
            .entries_mut()
            .retain(|e| e.item.item_id() != Some(item_id));
        payer.refresh_change();

        *self.remaining.entry(item_id.to_string()).or_insert(0) += held;
        Ok(held)
    }

    /// Returns every unit a payer holds to the pool. Remainder entries are
    /// dropped; their value shows up again as unallocated residual.
    ///
    /// Called just before a payer is removed, regardless of paid status.
    pub(crate) fn release_payer(&mut self, payer: &Payer) {
        for entry in payer.entries() {
            if let ItemRef::Item(id) = &entry.item {
                *self.remaining.entry(id.clone()).or_insert(0) += entry.quantity;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Even splits
    // -------------------------------------------------------------------------

    /// Distributes all remaining units of one item across eligible payers.
    ///
    /// ## Distribution
    /// ```text
    /// remaining 7, payers [A, B, C]
    ///      │
    ///      ▼
    /// base = 7 / 3 = 2, extra = 7 % 3 = 1
    ///      │
    ///      ▼
    /// A: 3, B: 2, C: 2   (first eligible payer absorbs the extra units)
    /// ```
    ///
    /// Payers whose share is zero receive no entry.
    pub fn split_evenly(
        &mut self,
        item_id: &str,
        eligible: &[String],
        payers: &mut PayerLedger,
    ) -> CoreResult<()> {
        let item = self.catalog.get(item_id)?.clone();
        check_eligible(eligible, payers)?;

        let left = self.remaining(item_id)?;
        if left == 0 {
            return Err(CoreError::NothingToSplit(format!(
                "{item_id} is fully assigned"
            )));
        }

        for (payer_id, share) in eligible.iter().zip(quantity_shares(left, eligible.len())) {
            if share > 0 {
                self.give(&item, payer_id, share, payers)?;
            }
        }

        Ok(())
    }

    /// Spreads the monetary residual (`order_total − assigned value`) across
    /// eligible payers as remainder entries.
    ///
    /// Only allowed once every unit is assigned. Returns the residual split.
    pub fn split_remainder_value(
        &mut self,
        order_total: Money,
        eligible: &[String],
        payers: &mut PayerLedger,
    ) -> CoreResult<Money> {
        check_eligible(eligible, payers)?;

        if !self.unassigned_value().is_zero() {
            return Err(CoreError::NothingToSplit(
                "items are still unassigned".to_string(),
            ));
        }

        let residual = order_total - self.assigned_value(payers);
        if !residual.is_positive() {
            return Err(CoreError::NothingToSplit(format!(
                "no residual value ({residual})"
            )));
        }

        for (payer_id, share) in eligible.iter().zip(residual.split_even(eligible.len())) {
            if share.is_zero() {
                continue;
            }
            let payer = payers.get_mut(payer_id)?;
            payer.entries_mut().push(AllocationEntry::remainder(share));
            payer.refresh_change();
        }

        Ok(residual)
    }

    /// Wipes every unpaid payer's allocations and splits what is left of
    /// each item evenly across the eligible payers in catalog order.
    ///
    /// Paid payers are frozen: their entries, tender, change and `paid_at`
    /// stay as settled, and the units they hold are not redistributed.
    pub fn split_all_evenly(
        &mut self,
        eligible: &[String],
        payers: &mut PayerLedger,
    ) -> CoreResult<()> {
        check_eligible(eligible, payers)?;

        for payer in payers.iter_mut().filter(|p| !p.is_paid()) {
            payer.entries_mut().clear();
            payer.refresh_change();
        }
        for item in self.catalog.items() {
            let settled: i64 = payers
                .iter()
                .filter(|p| p.is_paid())
                .map(|p| p.assigned_quantity(&item.id))
                .sum();
            self.remaining
                .insert(item.id.clone(), item.quantity - settled);
        }

        let items: Vec<LineItem> = self.catalog.items().to_vec();
        for item in &items {
            let left = self.remaining.get(&item.id).copied().unwrap_or(0);
            let shares = quantity_shares(left, eligible.len());
            for (payer_id, share) in eligible.iter().zip(shares) {
                if share > 0 {
                    self.give(item, payer_id, share, payers)?;
                }
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Integrity
    // -------------------------------------------------------------------------

    /// Checks the conservation law against a payer ledger.
    ///
    /// Returns `CorruptCheckpoint` describing the first inconsistency.
    pub fn verify_conservation(&self, payers: &PayerLedger) -> CoreResult<()> {
        for key in self.remaining.keys() {
            if !self.catalog.contains(key) {
                return Err(corrupt(format!("remaining count for unknown item {key}")));
            }
        }

        for payer in payers.iter() {
            for entry in payer.entries() {
                if entry.quantity <= 0 {
                    return Err(corrupt(format!(
                        "payer {} holds non-positive quantity",
                        payer.id()
                    )));
                }
                if let ItemRef::Item(id) = &entry.item {
                    if !self.catalog.contains(id) {
                        return Err(corrupt(format!(
                            "payer {} holds unknown item {id}",
                            payer.id()
                        )));
                    }
                }
            }
        }

        for item in self.catalog.items() {
            let left = self.remaining.get(&item.id).copied().unwrap_or(0);
            if left < 0 || left > item.quantity {
                return Err(corrupt(format!(
                    "{} remaining {left} outside 0..={}",
                    item.id, item.quantity
                )));
            }

            let assigned: i64 = payers.iter().map(|p| p.assigned_quantity(&item.id)).sum();
            if left + assigned != item.quantity {
                return Err(corrupt(format!(
                    "{}: {left} remaining + {assigned} assigned != {}",
                    item.id, item.quantity
                )));
            }
        }

        Ok(())
    }

    /// Moves already validated units into a payer's entries.
    fn give(
        &mut self,
        item: &LineItem,
        payer_id: &str,
        quantity: i64,
        payers: &mut PayerLedger,
    ) -> CoreResult<()> {
        let payer = payers.get_mut(payer_id)?;

        match payer.entry_for_mut(&item.id) {
            Some(entry) => entry.quantity += quantity,
            None => payer
                .entries_mut()
                .push(AllocationEntry::for_item(item, quantity)),
        }
        payer.refresh_change();

        *self.remaining.entry(item.id.clone()).or_insert(0) -= quantity;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `total` split into `parts` integer shares, extra units on the first.
fn quantity_shares(total: i64, parts: usize) -> Vec<i64> {
    Money::from_cents(total)
        .split_even(parts)
        .into_iter()
        .map(|m| m.cents())
        .collect()
}

/// Eligible list must be non-empty, distinct, known and unpaid.
fn check_eligible(eligible: &[String], payers: &PayerLedger) -> CoreResult<()> {
    if eligible.is_empty() {
        return Err(CoreError::NoEligiblePayers);
    }

    let mut seen = HashSet::with_capacity(eligible.len());
    for payer_id in eligible {
        if !seen.insert(payer_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "payer id".to_string(),
                value: payer_id.clone(),
            }
            .into());
        }
        payers.get(payer_id)?.ensure_unpaid()?;
    }

    Ok(())
}

fn corrupt(reason: String) -> CoreError {
    CoreError::CorruptCheckpoint(reason)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PaymentMethodCatalog;
    use crate::session::SessionSettings;
    use crate::types::PaymentMethod;
    use chrono::Utc;

    fn setup(items: Vec<LineItem>, payer_count: usize) -> (AllocationLedger, PayerLedger, Vec<String>) {
        let ledger = AllocationLedger::new(LineItemCatalog::new(items).unwrap());
        let mut payers = PayerLedger::new();
        let settings = SessionSettings::default();
        let ids = (0..payer_count)
            .map(|_| payers.add(None, &settings).unwrap().id().to_string())
            .collect();
        (ledger, payers, ids)
    }

    fn chopp(qty: i64) -> LineItem {
        LineItem::new("chopp", qty, Money::from_cents(1200), "Chopp")
    }

    #[test]
    fn test_assign_and_merge() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(5)], 2);

        ledger.assign("chopp", &ids[0], 2, &mut payers).unwrap();
        ledger.assign("chopp", &ids[0], 1, &mut payers).unwrap();

        let payer = payers.get(&ids[0]).unwrap();
        assert_eq!(payer.entries().len(), 1);
        assert_eq!(payer.assigned_quantity("chopp"), 3);
        assert_eq!(ledger.remaining("chopp").unwrap(), 2);
        ledger.verify_conservation(&payers).unwrap();
    }

    #[test]
    fn test_over_assignment_rejected_without_change() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(2)], 2);
        ledger.assign("chopp", &ids[0], 1, &mut payers).unwrap();

        let before = (ledger.clone(), payers.clone());
        let err = ledger.assign("chopp", &ids[1], 3, &mut payers).unwrap_err();

        assert_eq!(
            err,
            CoreError::InvalidQuantity {
                item_id: "chopp".to_string(),
                requested: 3,
                remaining: 1,
            }
        );
        assert_eq!((ledger, payers), before);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(2)], 1);
        assert!(matches!(
            ledger.assign("chopp", &ids[0], 0, &mut payers),
            Err(CoreError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_assign_unknown_item_or_payer() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(2)], 1);
        assert!(ledger
            .assign("soda", &ids[0], 1, &mut payers)
            .unwrap_err()
            .is_not_found());
        assert!(ledger
            .assign("chopp", "nobody", 1, &mut payers)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_unassign_returns_units() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(4)], 1);
        ledger.assign("chopp", &ids[0], 3, &mut payers).unwrap();

        assert_eq!(ledger.unassign("chopp", &ids[0], &mut payers).unwrap(), 3);
        assert_eq!(ledger.remaining("chopp").unwrap(), 4);
        assert!(payers.get(&ids[0]).unwrap().entries().is_empty());
        assert_eq!(ledger.unassign("chopp", &ids[0], &mut payers).unwrap(), 0);
    }

    #[test]
    fn test_split_evenly_first_absorbs_remainder() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(7)], 3);
        ledger.split_evenly("chopp", &ids, &mut payers).unwrap();

        let got: Vec<i64> = ids
            .iter()
            .map(|id| payers.get(id).unwrap().assigned_quantity("chopp"))
            .collect();
        assert_eq!(got, vec![3, 2, 2]);
        assert_eq!(ledger.remaining("chopp").unwrap(), 0);
    }

    #[test]
    fn test_split_evenly_skips_zero_shares() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(1)], 3);
        ledger.split_evenly("chopp", &ids, &mut payers).unwrap();

        assert_eq!(payers.get(&ids[0]).unwrap().assigned_quantity("chopp"), 1);
        assert!(payers.get(&ids[1]).unwrap().entries().is_empty());
        assert!(payers.get(&ids[2]).unwrap().entries().is_empty());
    }

    #[test]
    fn test_split_evenly_preconditions() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(2)], 2);

        assert_eq!(
            ledger.split_evenly("chopp", &[], &mut payers).unwrap_err(),
            CoreError::NoEligiblePayers
        );

        ledger.assign("chopp", &ids[0], 2, &mut payers).unwrap();
        assert!(matches!(
            ledger.split_evenly("chopp", &ids, &mut payers),
            Err(CoreError::NothingToSplit(_))
        ));

        let dup = vec![ids[1].clone(), ids[1].clone()];
        ledger.unassign("chopp", &ids[0], &mut payers).unwrap();
        assert!(ledger.split_evenly("chopp", &dup, &mut payers).is_err());
        assert_eq!(ledger.remaining("chopp").unwrap(), 2);
    }

    #[test]
    fn test_paid_payer_cannot_receive_units() {
        let methods =
            PaymentMethodCatalog::new(vec![PaymentMethod::new("pix", "PIX", 0, false)]).unwrap();
        let (mut ledger, mut payers, ids) = setup(vec![chopp(2)], 2);
        payers.set_payment_method(&ids[0], Some("pix"), &methods).unwrap();
        payers.toggle_paid(&ids[0], Utc::now()).unwrap();

        assert!(matches!(
            ledger.assign("chopp", &ids[0], 1, &mut payers),
            Err(CoreError::PayerLocked { .. })
        ));
        assert!(matches!(
            ledger.split_evenly("chopp", &ids, &mut payers),
            Err(CoreError::PayerLocked { .. })
        ));
        assert_eq!(ledger.remaining("chopp").unwrap(), 2);
    }

    #[test]
    fn test_split_remainder_value() {
        let items = vec![LineItem::new("dish", 1, Money::from_cents(9997), "Dish")];
        let (mut ledger, mut payers, ids) = setup(items, 2);

        let early = ledger.split_remainder_value(Money::from_cents(10000), &ids, &mut payers);
        assert!(matches!(early, Err(CoreError::NothingToSplit(_))));

        ledger.assign("dish", &ids[0], 1, &mut payers).unwrap();
        let residual = ledger
            .split_remainder_value(Money::from_cents(10000), &ids, &mut payers)
            .unwrap();

        assert_eq!(residual.cents(), 3);
        assert_eq!(payers.get(&ids[0]).unwrap().total_due().cents(), 9999);
        assert_eq!(payers.get(&ids[1]).unwrap().total_due().cents(), 1);
        assert_eq!(ledger.assigned_value(&payers).cents(), 10000);

        let again = ledger.split_remainder_value(Money::from_cents(10000), &ids, &mut payers);
        assert!(matches!(again, Err(CoreError::NothingToSplit(_))));
    }

    #[test]
    fn test_split_all_evenly_resets_everything() {
        let items = vec![
            chopp(3),
            LineItem::new("fries", 2, Money::from_cents(1500), "Fries"),
        ];
        let (mut ledger, mut payers, ids) = setup(items, 2);
        ledger.assign("chopp", &ids[1], 3, &mut payers).unwrap();

        ledger.split_all_evenly(&ids, &mut payers).unwrap();

        let a = payers.get(&ids[0]).unwrap();
        let b = payers.get(&ids[1]).unwrap();
        assert_eq!(a.assigned_quantity("chopp"), 2);
        assert_eq!(b.assigned_quantity("chopp"), 1);
        assert_eq!(a.assigned_quantity("fries"), 1);
        assert_eq!(b.assigned_quantity("fries"), 1);
        assert_eq!(ledger.unassigned_value(), Money::zero());
        ledger.verify_conservation(&payers).unwrap();
    }

    #[test]
    fn test_split_all_evenly_leaves_paid_payers_settled() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(5)], 3);
        ledger.assign("chopp", &ids[0], 2, &mut payers).unwrap();
        let methods = PaymentMethodCatalog::new(vec![PaymentMethod::new(
            "cash", "Dinheiro", 0, true,
        )])
        .unwrap();
        payers
            .set_payment_method(&ids[0], Some("cash"), &methods)
            .unwrap();
        payers
            .update_tendered_amount(&ids[0], Money::from_cents(3000), &methods)
            .unwrap();
        payers.toggle_paid(&ids[0], Utc::now()).unwrap();
        let settled = payers.get(&ids[0]).unwrap().clone();

        let rest = vec![ids[1].clone(), ids[2].clone()];
        ledger.split_all_evenly(&rest, &mut payers).unwrap();

        assert_eq!(payers.get(&ids[0]).unwrap(), &settled);
        assert_eq!(payers.get(&ids[1]).unwrap().assigned_quantity("chopp"), 2);
        assert_eq!(payers.get(&ids[2]).unwrap().assigned_quantity("chopp"), 1);
        assert_eq!(ledger.remaining("chopp").unwrap(), 0);
        ledger.verify_conservation(&payers).unwrap();
    }

    #[test]
    fn test_release_payer_restores_pool() {
        let (mut ledger, mut payers, ids) = setup(vec![chopp(4)], 2);
        ledger.split_evenly("chopp", &ids, &mut payers).unwrap();

        let removed = payers.remove(&ids[1]).unwrap();
        ledger.release_payer(&removed);

        assert_eq!(ledger.remaining("chopp").unwrap(), 2);
        ledger.verify_conservation(&payers).unwrap();
    }

    #[test]
    fn test_verify_conservation_detects_drift() {
        let (ledger, mut payers, ids) = setup(vec![chopp(2)], 1);
        let item = chopp(2);
        payers
            .get_mut(&ids[0])
            .unwrap()
            .entries_mut()
            .push(AllocationEntry::for_item(&item, 1));

        assert!(matches!(
            ledger.verify_conservation(&payers),
            Err(CoreError::CorruptCheckpoint(_))
        ));
    }
}

//! # Payer Ledger
//!
//! One record per party splitting the bill, plus the paid/unpaid state
//! machine and every total derived from a payer's allocations.
//!
//! ## Payment Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Payer Payment Status                                │
//! │                                                                         │
//! │            toggle_paid (requires payment method)                        │
//! │   ┌────────┐ ─────────────────────────────────────► ┌────────┐          │
//! │   │ UNPAID │                                        │  PAID  │          │
//! │   └────────┘ ◄───────────────────────────────────── └────────┘          │
//! │            toggle_paid (always; clears tender, change, paid_at)         │
//! │                                                                         │
//! │   While PAID the payer is locked: allocations, discount, surcharge,    │
//! │   method and tender are frozen until toggled back.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Allocation entries are only ever changed by the allocation ledger; this
//! module reads them to derive totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::PaymentMethodCatalog;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::session::SessionSettings;
use crate::types::{AllocationEntry, ItemRef};
use crate::validation::{validate_non_negative, validate_payer_name};

// =============================================================================
// Payer
// =============================================================================

/// One party paying part of the order.
///
/// ## Invariant
/// `total_due = Σ(entry.quantity × entry.unit_price) − discount + surcharge`.
/// The result is not clamped: a discount larger than the assigned items
/// yields a negative total, which settlement validation then reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    id: String,
    name: String,
    entries: Vec<AllocationEntry>,
    discount: Money,
    surcharge: Money,
    payment_method_id: Option<String>,
    paid: bool,
    amount_tendered: Option<Money>,
    change: Money,
    #[ts(as = "Option<String>")]
    paid_at: Option<DateTime<Utc>>,
}

impl Payer {
    fn new(name: String) -> Self {
        Payer {
            id: Uuid::new_v4().to_string(),
            name,
            entries: Vec::new(),
            discount: Money::zero(),
            surcharge: Money::zero(),
            payment_method_id: None,
            paid: false,
            amount_tendered: None,
            change: Money::zero(),
            paid_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn surcharge(&self) -> Money {
        self.surcharge
    }

    pub fn payment_method_id(&self) -> Option<&str> {
        self.payment_method_id.as_deref()
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn amount_tendered(&self) -> Option<Money> {
        self.amount_tendered
    }

    pub fn change(&self) -> Money {
        self.change
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    /// Value of every allocation entry, before discount and surcharge.
    pub fn subtotal(&self) -> Money {
        self.entries.iter().map(AllocationEntry::value).sum()
    }

    pub fn total_due(&self) -> Money {
        self.subtotal() - self.discount + self.surcharge
    }

    /// Units of a catalog item currently held by this payer.
    pub fn assigned_quantity(&self, item_id: &str) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.item.item_id() == Some(item_id))
            .map(|e| e.quantity)
            .sum()
    }

    pub(crate) fn ensure_unpaid(&self) -> CoreResult<()> {
        if self.paid {
            return Err(CoreError::PayerLocked {
                payer_id: self.id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<AllocationEntry> {
        &mut self.entries
    }

    /// Entry for a catalog item, if this payer already holds some of it.
    pub(crate) fn entry_for_mut(&mut self, item_id: &str) -> Option<&mut AllocationEntry> {
        self.entries
            .iter_mut()
            .find(|e| matches!(&e.item, ItemRef::Item(id) if id == item_id))
    }

    /// Recomputes change after anything that moves `total_due`.
    pub(crate) fn refresh_change(&mut self) {
        self.change = match self.amount_tendered {
            Some(tendered) => (tendered - self.total_due()).max(Money::zero()),
            None => Money::zero(),
        };
    }

    fn clear_tender(&mut self) {
        self.amount_tendered = None;
        self.change = Money::zero();
    }
}

// =============================================================================
// Payer Ledger
// =============================================================================

/// Ordered set of payers for one settlement session.
///
/// Iteration order is creation order and is what "first eligible payer"
/// refers to whenever a split has a remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerLedger {
    payers: Vec<Payer>,
    /// Next number used for a default name; never reused within a session.
    next_seq: u32,
}

impl Default for PayerLedger {
    fn default() -> Self {
        PayerLedger::new()
    }
}

impl PayerLedger {
    pub fn new() -> Self {
        PayerLedger {
            payers: Vec::new(),
            next_seq: 1,
        }
    }

    pub(crate) fn from_parts(payers: Vec<Payer>, next_seq: u32) -> Self {
        PayerLedger { payers, next_seq }
    }

    pub(crate) fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Adds a payer named `name`, or `"<prefix> <n>"` when no name is given.
    pub fn add(&mut self, name: Option<&str>, settings: &SessionSettings) -> CoreResult<&Payer> {
        if self.payers.len() >= settings.max_payers {
            return Err(CoreError::TooManyPayers {
                max: settings.max_payers,
            });
        }

        let name = match name {
            Some(name) => validate_payer_name(name)?,
            None => format!("{} {}", settings.payer_name_prefix, self.next_seq),
        };

        self.next_seq += 1;
        self.payers.push(Payer::new(name));

        let index = self.payers.len() - 1;
        Ok(&self.payers[index])
    }

    pub fn get(&self, payer_id: &str) -> CoreResult<&Payer> {
        self.payers
            .iter()
            .find(|p| p.id == payer_id)
            .ok_or_else(|| CoreError::PayerNotFound(payer_id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, payer_id: &str) -> CoreResult<&mut Payer> {
        self.payers
            .iter_mut()
            .find(|p| p.id == payer_id)
            .ok_or_else(|| CoreError::PayerNotFound(payer_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Payer> {
        self.payers.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Payer> {
        self.payers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.payers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payers.is_empty()
    }

    pub fn paid_count(&self) -> usize {
        self.payers.iter().filter(|p| p.paid).count()
    }

    /// Ids of unpaid payers in ledger order.
    pub fn unpaid_ids(&self) -> Vec<String> {
        self.payers
            .iter()
            .filter(|p| !p.paid)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn rename(&mut self, payer_id: &str, name: &str) -> CoreResult<()> {
        let name = validate_payer_name(name)?;
        self.get_mut(payer_id)?.name = name;
        Ok(())
    }

    /// Drops a payer record. The caller must already have returned its
    /// quantities to the allocation ledger.
    pub(crate) fn remove(&mut self, payer_id: &str) -> CoreResult<Payer> {
        let index = self
            .payers
            .iter()
            .position(|p| p.id == payer_id)
            .ok_or_else(|| CoreError::PayerNotFound(payer_id.to_string()))?;

        if self.payers.len() == 1 {
            return Err(CoreError::LastPayer);
        }

        Ok(self.payers.remove(index))
    }

    pub fn set_discount(&mut self, payer_id: &str, discount: Money) -> CoreResult<()> {
        validate_non_negative("discount", discount)?;
        let payer = self.get_mut(payer_id)?;
        payer.ensure_unpaid()?;
        payer.discount = discount;
        payer.refresh_change();
        Ok(())
    }

    pub fn set_surcharge(&mut self, payer_id: &str, surcharge: Money) -> CoreResult<()> {
        validate_non_negative("surcharge", surcharge)?;
        let payer = self.get_mut(payer_id)?;
        payer.ensure_unpaid()?;
        payer.surcharge = surcharge;
        payer.refresh_change();
        Ok(())
    }

    /// Chooses (or clears) the payment method.
    ///
    /// Any tender already entered is discarded: fee and change rules differ
    /// per method, so a previous tender means nothing under the new one.
    pub fn set_payment_method(
        &mut self,
        payer_id: &str,
        method_id: Option<&str>,
        methods: &PaymentMethodCatalog,
    ) -> CoreResult<()> {
        if let Some(method_id) = method_id {
            methods.get(method_id)?;
        }

        let payer = self.get_mut(payer_id)?;
        payer.ensure_unpaid()?;
        payer.payment_method_id = method_id.map(str::to_string);
        payer.clear_tender();
        Ok(())
    }

    /// Records how much the payer handed over and returns the change.
    ///
    /// `change = max(0, amount − total_due)`. Only valid for methods that
    /// accept change.
    pub fn update_tendered_amount(
        &mut self,
        payer_id: &str,
        amount: Money,
        methods: &PaymentMethodCatalog,
    ) -> CoreResult<Money> {
        validate_non_negative("amount tendered", amount)?;

        let payer = self.get_mut(payer_id)?;
        payer.ensure_unpaid()?;

        let method_id = payer
            .payment_method_id
            .clone()
            .ok_or_else(|| CoreError::MissingPaymentMethod {
                payer_id: payer_id.to_string(),
            })?;

        if !methods.get(&method_id)?.accepts_change {
            return Err(CoreError::ChangeNotAccepted { method_id });
        }

        payer.amount_tendered = Some(amount);
        payer.refresh_change();
        Ok(payer.change)
    }

    /// Flips the paid flag and returns the new state.
    ///
    /// ## Transitions
    /// - unpaid → paid: rejected with `MissingPaymentMethod` (state untouched)
    ///   when no method is set; otherwise stamps `paid_at = now`
    /// - paid → unpaid: always succeeds; clears tender, change and `paid_at`
    pub fn toggle_paid(&mut self, payer_id: &str, now: DateTime<Utc>) -> CoreResult<bool> {
        let payer = self.get_mut(payer_id)?;

        if payer.paid {
            payer.paid = false;
            payer.paid_at = None;
            payer.clear_tender();
            return Ok(false);
        }

        if payer.payment_method_id.is_none() {
            return Err(CoreError::MissingPaymentMethod {
                payer_id: payer_id.to_string(),
            });
        }

        payer.paid = true;
        payer.paid_at = Some(now);
        Ok(true)
    }

    /// Fee the payer's method charges on their total (informational).
    pub fn fee(&self, payer_id: &str, methods: &PaymentMethodCatalog) -> CoreResult<Money> {
        let payer = self.get(payer_id)?;
        match payer.payment_method_id() {
            Some(method_id) => Ok(payer.total_due().percentage(methods.get(method_id)?.fee_rate())),
            None => Ok(Money::zero()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineItem, PaymentMethod};

    fn methods() -> PaymentMethodCatalog {
        PaymentMethodCatalog::new(vec![
            PaymentMethod::new("cash", "Dinheiro", 0, true),
            PaymentMethod::new("pix", "PIX", 0, false),
            PaymentMethod::new("credit", "Crédito", 250, false),
        ])
        .unwrap()
    }

    fn ledger_with_payer(due_cents: i64) -> (PayerLedger, String) {
        let mut ledger = PayerLedger::new();
        let id = ledger
            .add(None, &SessionSettings::default())
            .unwrap()
            .id()
            .to_string();
        let item = LineItem::new("meal", 1, Money::from_cents(due_cents), "Meal");
        ledger
            .get_mut(&id)
            .unwrap()
            .entries_mut()
            .push(AllocationEntry::for_item(&item, 1));
        (ledger, id)
    }

    #[test]
    fn test_default_names_never_reuse_numbers() {
        let settings = SessionSettings::default();
        let mut ledger = PayerLedger::new();
        let first = ledger.add(None, &settings).unwrap().id().to_string();
        ledger.add(None, &settings).unwrap();
        ledger.remove(&first).unwrap();
        let third = ledger.add(None, &settings).unwrap();
        assert_eq!(third.name(), "Cliente 3");
    }

    #[test]
    fn test_add_respects_max_payers() {
        let settings = SessionSettings {
            max_payers: 1,
            ..SessionSettings::default()
        };
        let mut ledger = PayerLedger::new();
        ledger.add(Some("Ana"), &settings).unwrap();
        assert_eq!(
            ledger.add(None, &settings).unwrap_err(),
            CoreError::TooManyPayers { max: 1 }
        );
    }

    #[test]
    fn test_total_due_applies_discount_and_surcharge() {
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_discount(&id, Money::from_cents(500)).unwrap();
        ledger.set_surcharge(&id, Money::from_cents(450)).unwrap();
        assert_eq!(ledger.get(&id).unwrap().total_due().cents(), 4450);
    }

    #[test]
    fn test_negative_total_is_not_clamped() {
        let (mut ledger, id) = ledger_with_payer(1000);
        ledger.set_discount(&id, Money::from_cents(1500)).unwrap();
        assert_eq!(ledger.get(&id).unwrap().total_due().cents(), -500);
    }

    #[test]
    fn test_negative_adjustments_rejected() {
        let (mut ledger, id) = ledger_with_payer(1000);
        assert!(ledger.set_discount(&id, Money::from_cents(-1)).is_err());
        assert!(ledger.set_surcharge(&id, Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_change_correctness() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_payment_method(&id, Some("cash"), &methods).unwrap();

        let change = ledger
            .update_tendered_amount(&id, Money::from_cents(5000), &methods)
            .unwrap();
        assert_eq!(change.cents(), 500);

        let change = ledger
            .update_tendered_amount(&id, Money::from_cents(4000), &methods)
            .unwrap();
        assert_eq!(change, Money::zero());
    }

    #[test]
    fn test_change_follows_discount() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_payment_method(&id, Some("cash"), &methods).unwrap();
        ledger
            .update_tendered_amount(&id, Money::from_cents(5000), &methods)
            .unwrap();

        ledger.set_discount(&id, Money::from_cents(1000)).unwrap();
        assert_eq!(ledger.get(&id).unwrap().change().cents(), 1500);
    }

    #[test]
    fn test_method_switch_resets_tender() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_payment_method(&id, Some("cash"), &methods).unwrap();
        ledger
            .update_tendered_amount(&id, Money::from_cents(5000), &methods)
            .unwrap();

        ledger.set_payment_method(&id, Some("pix"), &methods).unwrap();
        let payer = ledger.get(&id).unwrap();
        assert_eq!(payer.amount_tendered(), None);
        assert_eq!(payer.change(), Money::zero());
    }

    #[test]
    fn test_tender_requires_change_accepting_method() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);

        assert!(matches!(
            ledger.update_tendered_amount(&id, Money::from_cents(5000), &methods),
            Err(CoreError::MissingPaymentMethod { .. })
        ));

        ledger.set_payment_method(&id, Some("pix"), &methods).unwrap();
        assert_eq!(
            ledger
                .update_tendered_amount(&id, Money::from_cents(5000), &methods)
                .unwrap_err(),
            CoreError::ChangeNotAccepted {
                method_id: "pix".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_method_rejected() {
        let (mut ledger, id) = ledger_with_payer(4500);
        assert!(ledger
            .set_payment_method(&id, Some("boleto"), &methods())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_toggle_paid_without_method_is_noop() {
        let (mut ledger, id) = ledger_with_payer(4500);
        let before = ledger.clone();

        let err = ledger.toggle_paid(&id, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::MissingPaymentMethod { .. }));
        assert!(!ledger.get(&id).unwrap().is_paid());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_toggle_paid_round_trip_clears_tender() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_payment_method(&id, Some("cash"), &methods).unwrap();
        ledger
            .update_tendered_amount(&id, Money::from_cents(5000), &methods)
            .unwrap();

        let now = Utc::now();
        assert!(ledger.toggle_paid(&id, now).unwrap());
        assert_eq!(ledger.get(&id).unwrap().paid_at(), Some(now));
        assert_eq!(ledger.paid_count(), 1);

        assert!(!ledger.toggle_paid(&id, Utc::now()).unwrap());
        let payer = ledger.get(&id).unwrap();
        assert_eq!(payer.paid_at(), None);
        assert_eq!(payer.amount_tendered(), None);
        assert_eq!(payer.change(), Money::zero());
        assert_eq!(payer.payment_method_id(), Some("cash"));
    }

    #[test]
    fn test_paid_payer_is_locked() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        ledger.set_payment_method(&id, Some("pix"), &methods).unwrap();
        ledger.toggle_paid(&id, Utc::now()).unwrap();

        let locked = CoreError::PayerLocked {
            payer_id: id.clone(),
        };
        assert_eq!(
            ledger.set_discount(&id, Money::from_cents(100)).unwrap_err(),
            locked
        );
        assert_eq!(
            ledger.set_payment_method(&id, None, &methods).unwrap_err(),
            locked
        );
        assert!(ledger.rename(&id, "Still renamable").is_ok());
    }

    #[test]
    fn test_fee_uses_method_rate() {
        let methods = methods();
        let (mut ledger, id) = ledger_with_payer(4500);
        assert_eq!(ledger.fee(&id, &methods).unwrap(), Money::zero());

        ledger.set_payment_method(&id, Some("credit"), &methods).unwrap();
        assert_eq!(ledger.fee(&id, &methods).unwrap().cents(), 113);
    }

    #[test]
    fn test_cannot_remove_last_payer() {
        let (mut ledger, id) = ledger_with_payer(4500);
        assert_eq!(ledger.remove(&id).unwrap_err(), CoreError::LastPayer);
        assert_eq!(ledger.len(), 1);
    }
}

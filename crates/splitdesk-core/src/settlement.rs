//! # Settlement Validation
//!
//! Decides whether a split can be committed, either as a checkpoint
//! ("save and continue") or as the final settlement of the order.
//!
//! ## Validation Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Settlement Validator                             │
//! │                                                                         │
//! │  FULL (finalize)                       PARTIAL (save and continue)      │
//! │  ─────────────────                     ─────────────────────────        │
//! │  |Σ total_due − order_total| ≤ tol     at least one payer is paid       │
//! │  every unpaid payer has a method       every paid payer has a method    │
//! │  unpaid change-accepting payers        paid change-accepting payers     │
//! │    tendered ≥ total_due                  tendered ≥ total_due           │
//! │                                                                         │
//! │  All violations are collected; nothing stops at the first failure.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::catalog::PaymentMethodCatalog;
use crate::error::CoreResult;
use crate::money::Money;
use crate::payer::{Payer, PayerLedger};
use crate::types::AllocationEntry;

// =============================================================================
// Violations
// =============================================================================

/// One reason a settlement cannot be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Payer totals do not add up to the order total.
    AllocationMismatch { assigned: Money, expected: Money },

    MissingPaymentMethod { payer_id: String, payer_name: String },

    /// A cash-like payer handed over less than they owe.
    InsufficientTender {
        payer_id: String,
        payer_name: String,
        tendered: Money,
        due: Money,
    },

    /// Partial save requested before anybody has paid.
    NoPaidPayers,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::AllocationMismatch { assigned, expected } => {
                write!(f, "payers owe {assigned} but the order total is {expected}")
            }
            Violation::MissingPaymentMethod { payer_name, .. } => {
                write!(f, "{payer_name} has no payment method")
            }
            Violation::InsufficientTender {
                payer_name,
                tendered,
                due,
                ..
            } => write!(f, "{payer_name} tendered {tendered} but owes {due}"),
            Violation::NoPaidPayers => write!(f, "no payer has been marked paid"),
        }
    }
}

/// Non-empty list of violations returned by a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_kind(&self, pred: impl Fn(&Violation) -> bool) -> bool {
        self.0.iter().any(pred)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(Violation::to_string).collect();
        write!(f, "settlement rejected: {}", messages.join("; "))
    }
}

impl std::error::Error for Violations {}

fn into_result(violations: Vec<Violation>) -> Result<(), Violations> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Violations(violations))
    }
}

// =============================================================================
// Validators
// =============================================================================

/// Validation required before the order can be closed.
pub fn validate_full(
    payers: &PayerLedger,
    order_total: Money,
    tolerance: Money,
    methods: &PaymentMethodCatalog,
) -> Result<(), Violations> {
    let mut violations = Vec::new();

    let assigned: Money = payers.iter().map(Payer::total_due).sum();
    if (assigned - order_total).abs() > tolerance {
        violations.push(Violation::AllocationMismatch {
            assigned,
            expected: order_total,
        });
    }

    for payer in payers.iter().filter(|p| !p.is_paid()) {
        check_payment(payer, methods, &mut violations);
    }

    into_result(violations)
}

/// Validation required before an intermediate checkpoint is saved.
pub fn validate_partial(
    payers: &PayerLedger,
    methods: &PaymentMethodCatalog,
) -> Result<(), Violations> {
    if payers.paid_count() == 0 {
        return Err(Violations(vec![Violation::NoPaidPayers]));
    }

    let mut violations = Vec::new();
    for payer in payers.iter().filter(|p| p.is_paid()) {
        check_payment(payer, methods, &mut violations);
    }

    into_result(violations)
}

/// Method presence and, for cash-like methods, sufficient tender.
///
/// A method id that no longer resolves counts as missing.
fn check_payment(payer: &Payer, methods: &PaymentMethodCatalog, out: &mut Vec<Violation>) {
    let method = payer
        .payment_method_id()
        .and_then(|id| methods.get(id).ok());

    let Some(method) = method else {
        out.push(Violation::MissingPaymentMethod {
            payer_id: payer.id().to_string(),
            payer_name: payer.name().to_string(),
        });
        return;
    };

    if method.accepts_change {
        let tendered = payer.amount_tendered().unwrap_or_default();
        let due = payer.total_due();
        if tendered < due {
            out.push(Violation::InsufficientTender {
                payer_id: payer.id().to_string(),
                payer_name: payer.name().to_string(),
                tendered,
                due,
            });
        }
    }
}

// =============================================================================
// Settlement Record
// =============================================================================

/// Per-payer line of a finalized settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayerSettlement {
    pub payer_id: String,
    pub name: String,
    pub items: Vec<AllocationEntry>,
    pub subtotal: Money,
    pub discount: Money,
    pub surcharge: Money,
    pub total_due: Money,
    pub amount_tendered: Option<Money>,
    pub change: Money,
    /// Method fee on `total_due`; recorded, never added to it.
    pub fee: Money,
    pub payment_method_id: Option<String>,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

/// Immutable record of how an order was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub order_id: String,
    pub payers: Vec<PayerSettlement>,
    /// Σ payer total_due.
    pub total: Money,
    #[ts(as = "String")]
    pub settled_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Builds the record from the current payers. Payers still unpaid at
    /// this point pay at finalization, so their `paid_at` is `settled_at`.
    pub fn build(
        order_id: &str,
        payers: &PayerLedger,
        methods: &PaymentMethodCatalog,
        settled_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let mut lines = Vec::with_capacity(payers.len());

        for payer in payers.iter() {
            lines.push(PayerSettlement {
                payer_id: payer.id().to_string(),
                name: payer.name().to_string(),
                items: payer.entries().to_vec(),
                subtotal: payer.subtotal(),
                discount: payer.discount(),
                surcharge: payer.surcharge(),
                total_due: payer.total_due(),
                amount_tendered: payer.amount_tendered(),
                change: payer.change(),
                fee: payers.fee(payer.id(), methods)?,
                payment_method_id: payer.payment_method_id().map(str::to_string),
                paid_at: payer.paid_at().unwrap_or(settled_at),
            });
        }

        let total = lines.iter().map(|l| l.total_due).sum();

        Ok(SettlementRecord {
            order_id: order_id.to_string(),
            payers: lines,
            total,
            settled_at,
        })
    }

    pub fn total_fees(&self) -> Money {
        self.payers.iter().map(|p| p.fee).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationLedger;
    use crate::catalog::LineItemCatalog;
    use crate::session::SessionSettings;
    use crate::types::{LineItem, PaymentMethod};

    fn methods() -> PaymentMethodCatalog {
        PaymentMethodCatalog::new(vec![
            PaymentMethod::new("cash", "Dinheiro", 0, true),
            PaymentMethod::new("pix", "PIX", 0, false),
        ])
        .unwrap()
    }

    /// Two payers holding 20.00 and 40.00 of a 60.00 order.
    fn split_order() -> (PayerLedger, Vec<String>) {
        let catalog = LineItemCatalog::new(vec![
            LineItem::new("a", 2, Money::from_cents(2000), "Burger"),
            LineItem::new("b", 1, Money::from_cents(2000), "Fries"),
        ])
        .unwrap();
        let mut ledger = AllocationLedger::new(catalog);
        let mut payers = PayerLedger::new();
        let settings = SessionSettings::default();
        let ids: Vec<String> = (0..2)
            .map(|_| payers.add(None, &settings).unwrap().id().to_string())
            .collect();

        ledger.assign("a", &ids[0], 1, &mut payers).unwrap();
        ledger.assign("a", &ids[1], 1, &mut payers).unwrap();
        ledger.assign("b", &ids[1], 1, &mut payers).unwrap();
        (payers, ids)
    }

    const TOL: Money = Money::from_cents(1);

    #[test]
    fn test_full_validation_passes() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        payers.set_payment_method(&ids[0], Some("pix"), &methods).unwrap();
        payers.set_payment_method(&ids[1], Some("cash"), &methods).unwrap();
        payers
            .update_tendered_amount(&ids[1], Money::from_cents(5000), &methods)
            .unwrap();

        assert!(validate_full(&payers, Money::from_cents(6000), TOL, &methods).is_ok());
    }

    #[test]
    fn test_full_validation_collects_everything() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        payers.set_payment_method(&ids[1], Some("cash"), &methods).unwrap();
        payers
            .update_tendered_amount(&ids[1], Money::from_cents(3000), &methods)
            .unwrap();

        let err = validate_full(&payers, Money::from_cents(7000), TOL, &methods).unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.contains_kind(|v| matches!(v, Violation::AllocationMismatch { .. })));
        assert!(err.contains_kind(|v| matches!(v, Violation::MissingPaymentMethod { .. })));
        assert!(err.contains_kind(|v| matches!(v, Violation::InsufficientTender { .. })));
    }

    #[test]
    fn test_tolerance_boundary() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        for id in &ids {
            payers.set_payment_method(id, Some("pix"), &methods).unwrap();
        }

        assert!(validate_full(&payers, Money::from_cents(6001), TOL, &methods).is_ok());
        assert!(validate_full(&payers, Money::from_cents(6002), TOL, &methods).is_err());
    }

    #[test]
    fn test_partial_requires_a_paid_payer() {
        let (payers, _) = split_order();
        let err = validate_partial(&payers, &methods()).unwrap_err();
        assert_eq!(err.0, vec![Violation::NoPaidPayers]);
    }

    #[test]
    fn test_partial_ignores_unpaid_payers() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        payers.set_payment_method(&ids[0], Some("pix"), &methods).unwrap();
        payers.toggle_paid(&ids[0], Utc::now()).unwrap();

        assert!(validate_partial(&payers, &methods).is_ok());
    }

    #[test]
    fn test_partial_flags_short_cash_payment() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        payers.set_payment_method(&ids[1], Some("cash"), &methods).unwrap();
        payers
            .update_tendered_amount(&ids[1], Money::from_cents(4000), &methods)
            .unwrap();
        payers
            .set_surcharge(&ids[1], Money::from_cents(100))
            .unwrap();
        payers.toggle_paid(&ids[1], Utc::now()).unwrap();

        let err = validate_partial(&payers, &methods).unwrap_err();
        assert!(matches!(
            err.0.as_slice(),
            [Violation::InsufficientTender { .. }]
        ));
        assert!(err.to_string().starts_with("settlement rejected:"));
    }

    #[test]
    fn test_record_totals_and_paid_at() {
        let methods = methods();
        let (mut payers, ids) = split_order();
        payers.set_payment_method(&ids[0], Some("pix"), &methods).unwrap();
        let paid_at = Utc::now();
        payers.toggle_paid(&ids[0], paid_at).unwrap();
        payers.set_payment_method(&ids[1], Some("cash"), &methods).unwrap();

        let settled_at = Utc::now();
        let record = SettlementRecord::build("order-1", &payers, &methods, settled_at).unwrap();

        assert_eq!(record.total.cents(), 6000);
        assert_eq!(record.payers[0].paid_at, paid_at);
        assert_eq!(record.payers[1].paid_at, settled_at);
        assert_eq!(record.total_fees(), Money::zero());
    }
}

//! # Domain Types
//!
//! Records handed to the engine by its collaborators, and the allocation
//! entry that ties a slice of an item to a payer.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │ AllocationEntry │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  item (ItemRef) │   │  id             │       │
//! │  │  quantity       │   │  quantity       │   │  name           │       │
//! │  │  unit_price     │──►│  unit_price     │   │  fee_bps        │       │
//! │  │  description    │   │  description    │   │  accepts_change │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │   immutable snapshot     owned by a Payer       read-only config        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Fee Rate
// =============================================================================

/// Payment method fee in basis points (250 = 2.50%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FeeRate(u32);

impl FeeRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        FeeRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        FeeRate(0)
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One priced line of the open order.
///
/// Supplied by the order store and never mutated by the engine. Identity is
/// `id`; the same product ordered twice arrives as two distinct lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub description: String,
}

impl LineItem {
    pub fn new(
        id: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        description: impl Into<String>,
    ) -> Self {
        LineItem {
            id: id.into(),
            quantity,
            unit_price,
            description: description.into(),
        }
    }

    /// Full value of the line (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// A configured way of paying (cash, PIX, card...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fee_bps: u32,
    /// Cash-like methods take a tendered amount and return change.
    #[serde(default)]
    pub accepts_change: bool,
}

impl PaymentMethod {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        fee_bps: u32,
        accepts_change: bool,
    ) -> Self {
        PaymentMethod {
            id: id.into(),
            name: name.into(),
            fee_bps,
            accepts_change,
        }
    }

    #[inline]
    pub fn fee_rate(&self) -> FeeRate {
        FeeRate::from_bps(self.fee_bps)
    }
}

// =============================================================================
// Allocation Entry
// =============================================================================

/// What an allocation entry points at.
///
/// `Remainder` is the synthetic pseudo-item used by value-only splits: it is
/// money with no physical units behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Item(String),
    Remainder,
}

impl ItemRef {
    /// Returns the catalog id for real items.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ItemRef::Item(id) => Some(id),
            ItemRef::Remainder => None,
        }
    }

    pub fn is_remainder(&self) -> bool {
        matches!(self, ItemRef::Remainder)
    }
}

/// A share of one line item (or of the monetary remainder) owned by a payer.
///
/// `unit_price` is copied at assignment time so later catalog changes cannot
/// alter a share that was already handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub item: ItemRef,
    pub quantity: i64,
    pub unit_price: Money,
    pub description: Option<String>,
}

impl AllocationEntry {
    /// Entry for `quantity` units of a catalog item.
    pub fn for_item(item: &LineItem, quantity: i64) -> Self {
        AllocationEntry {
            item: ItemRef::Item(item.id.clone()),
            quantity,
            unit_price: item.unit_price,
            description: Some(item.description.clone()),
        }
    }

    /// One-off remainder entry (quantity 1) worth `amount`.
    pub fn remainder(amount: Money) -> Self {
        AllocationEntry {
            item: ItemRef::Remainder,
            quantity: 1,
            unit_price: amount,
            description: Some("Remainder".to_string()),
        }
    }

    /// Value of this entry (quantity × unit price).
    #[inline]
    pub fn value(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

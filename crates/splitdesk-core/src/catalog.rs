//! # Catalogs
//!
//! Immutable, validated views over what collaborators supply: the order's
//! line items and the configured payment methods.
//!
//! Both catalogs are checked once at construction. Afterwards every lookup
//! either finds a well-formed record or reports a typed "not found".

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, PaymentMethod};
use crate::validation::{validate_line_item, validate_payment_method};
use crate::MAX_AMOUNT_CENTS;

// =============================================================================
// Line Item Catalog
// =============================================================================

/// Snapshot of the order's items, in the order the store supplied them.
///
/// Source of truth for "how much of item X exists to allocate".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemCatalog {
    items: Vec<LineItem>,
}

impl LineItemCatalog {
    /// Builds a catalog, rejecting malformed items, duplicate ids and
    /// orders whose total exceeds `MAX_AMOUNT_CENTS`.
    pub fn new(items: Vec<LineItem>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut total = Money::zero();

        for item in &items {
            validate_line_item(item)?;

            total = total
                .checked_add(item.line_total())
                .filter(|t| t.cents() <= MAX_AMOUNT_CENTS)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "order total".to_string(),
                    min: 0,
                    max: MAX_AMOUNT_CENTS,
                })?;

            if !seen.insert(item.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "item id".to_string(),
                    value: item.id.clone(),
                }
                .into());
            }
        }

        Ok(LineItemCatalog { items })
    }

    pub fn get(&self, item_id: &str) -> CoreResult<&LineItem> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of every line total.
    pub fn total(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

// =============================================================================
// Payment Method Catalog
// =============================================================================

/// Read-only payment method configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethodCatalog {
    methods: Vec<PaymentMethod>,
}

impl PaymentMethodCatalog {
    pub fn new(methods: Vec<PaymentMethod>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(methods.len());

        for method in &methods {
            validate_payment_method(method)?;

            if !seen.insert(method.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "payment method id".to_string(),
                    value: method.id.clone(),
                }
                .into());
            }
        }

        Ok(PaymentMethodCatalog { methods })
    }

    pub fn get(&self, method_id: &str) -> CoreResult<&PaymentMethod> {
        self.methods
            .iter()
            .find(|m| m.id == method_id)
            .ok_or_else(|| CoreError::PaymentMethodNotFound(method_id.to_string()))
    }

    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Validation Module
//!
//! Boundary checks for the records collaborators hand to the engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Order store / config subsystem                               │
//! │  └── Supplies line items and payment methods (untrusted shape)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Field-level rules (ids, quantities, prices, names)                │
//! │  └── Rejects malformed input before it reaches a ledger                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledgers (allocation.rs, payer.rs)                            │
//! │  └── Cross-record invariants (conservation, paid locks)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use splitdesk_core::validation::{validate_quantity, validate_payer_name};
//!
//! assert!(validate_quantity(3).is_ok());
//! assert!(validate_payer_name("Cliente 1").is_ok());
//! assert!(validate_payer_name("   ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{AllocationEntry, LineItem, PaymentMethod};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY};

pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_ID_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 200;
const MAX_PAYER_NAME_LEN: usize = 80;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an externally supplied identifier (item, order, method).
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No whitespace
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    if id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a payer display name and returns it trimmed.
pub fn validate_payer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PAYER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PAYER_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates a payer id restored from a checkpoint (UUID v4 text).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payer id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "payer id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item or assignment quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount (unit price, discount, surcharge, tender).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_AMOUNT_CENTS
///
/// ## Example
/// ```rust
/// use splitdesk_core::money::Money;
/// use splitdesk_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("discount", Money::zero()).is_ok());
/// assert!(validate_non_negative("discount", Money::from_cents(-1)).is_err());
/// assert!(validate_non_negative("discount", Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
}

/// Validates a fee in basis points (0% to 100%).
pub fn validate_fee_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "fee_bps".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates one line item as received from the order store.
pub fn validate_line_item(item: &LineItem) -> ValidationResult<()> {
    validate_id("item id", &item.id)?;
    validate_quantity(item.quantity)?;
    validate_non_negative("unit price", item.unit_price)?;
    match item.unit_price.checked_multiply_quantity(item.quantity) {
        Some(total) if total.cents() <= MAX_AMOUNT_CENTS => {}
        _ => return Err(amount_out_of_range("line total")),
    }
    validate_description(&item.description)?;
    Ok(())
}

/// Validates a restored allocation entry: positive quantity, bounded price,
/// and exactly one unit for remainder entries.
pub fn validate_entry(entry: &AllocationEntry) -> ValidationResult<()> {
    validate_quantity(entry.quantity)?;
    validate_non_negative("entry unit price", entry.unit_price)?;

    if entry.item.is_remainder() && entry.quantity != 1 {
        return Err(ValidationError::InvalidFormat {
            field: "remainder entry".to_string(),
            reason: "quantity must be 1".to_string(),
        });
    }

    Ok(())
}

/// Validates one payment method as received from configuration.
pub fn validate_payment_method(method: &PaymentMethod) -> ValidationResult<()> {
    validate_id("payment method id", &method.id)?;

    if method.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "payment method name".to_string(),
        });
    }

    validate_fee_bps(method.fee_bps)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("item id", "burger-1").is_ok());
        assert!(validate_id("item id", "").is_err());
        assert!(validate_id("item id", "   ").is_err());
        assert!(validate_id("item id", "has space").is_err());
        assert!(validate_id("item id", &"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_payer_name_trims() {
        assert_eq!(validate_payer_name("  Ana ").unwrap(), "Ana");
        assert!(validate_payer_name("").is_err());
        assert!(validate_payer_name(&"x".repeat(81)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_line_item() {
        let ok = LineItem::new("a", 2, Money::from_cents(2000), "Burger");
        assert!(validate_line_item(&ok).is_ok());

        let free = LineItem::new("b", 1, Money::zero(), "Water");
        assert!(validate_line_item(&free).is_ok());

        let negative = LineItem::new("c", 1, Money::from_cents(-1), "Bad");
        assert_eq!(
            validate_line_item(&negative),
            Err(ValidationError::MustNotBeNegative {
                field: "unit price".to_string()
            })
        );

        let empty = LineItem::new("d", 0, Money::from_cents(100), "Zero");
        assert!(validate_line_item(&empty).is_err());
    }

    #[test]
    fn test_amounts_are_bounded() {
        let cap = Money::from_cents(MAX_AMOUNT_CENTS);
        assert!(validate_non_negative("amount tendered", cap).is_ok());
        assert!(matches!(
            validate_non_negative("amount tendered", cap + Money::from_cents(1)),
            Err(ValidationError::OutOfRange { .. })
        ));

        let huge = LineItem::new("e", 3, Money::from_cents(i64::MAX / 2), "Huge");
        assert!(matches!(
            validate_line_item(&huge),
            Err(ValidationError::OutOfRange { .. })
        ));

        // Each unit fits, the line does not.
        let wide = LineItem::new("f", 2, cap, "Wide");
        assert_eq!(
            validate_line_item(&wide),
            Err(ValidationError::OutOfRange {
                field: "line total".to_string(),
                min: 0,
                max: MAX_AMOUNT_CENTS,
            })
        );
    }

    #[test]
    fn test_validate_entry() {
        let item = LineItem::new("a", 2, Money::from_cents(2000), "Burger");
        assert!(validate_entry(&AllocationEntry::for_item(&item, 2)).is_ok());
        assert!(validate_entry(&AllocationEntry::remainder(Money::from_cents(3))).is_ok());

        let mut negative = AllocationEntry::for_item(&item, 1);
        negative.unit_price = Money::from_cents(-1);
        assert!(validate_entry(&negative).is_err());

        let mut empty = AllocationEntry::for_item(&item, 1);
        empty.quantity = 0;
        assert!(validate_entry(&empty).is_err());

        let mut doubled = AllocationEntry::remainder(Money::from_cents(5));
        doubled.quantity = 2;
        assert!(validate_entry(&doubled).is_err());
    }

    #[test]
    fn test_validate_payment_method() {
        assert!(validate_payment_method(&PaymentMethod::new("pix", "PIX", 0, false)).is_ok());
        assert!(validate_payment_method(&PaymentMethod::new("pix", " ", 0, false)).is_err());
        assert!(validate_payment_method(&PaymentMethod::new("cc", "Card", 10001, false)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}

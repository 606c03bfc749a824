//! # Error Types
//!
//! Domain-specific error types for splitdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  splitdesk-core errors (this file)                                     │
//! │  ├── CoreError        - Rejected ledger / payer operations             │
//! │  └── ValidationError  - Malformed input at the boundary                │
//! │                                                                         │
//! │  splitdesk-core validator output (settlement.rs)                       │
//! │  └── Violations       - Every reason a settlement is not committable   │
//! │                                                                         │
//! │  splitdesk-db errors (separate crate)                                  │
//! │  └── DbError          - Persistence adapter failures                   │
//! │                                                                         │
//! │  splitdesk-session errors                                              │
//! │  └── SessionError     - What the cashier UI sees (with ErrorCode)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is a rejected operation: the ledger and payer state are
//! exactly as they were before the call.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger and payer operation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Quantity is zero/negative or more than what is still unassigned.
    ///
    /// ## User Workflow
    /// ```text
    /// Item "Chopp" quantity 2, 1 already with Cliente 1
    ///      │
    ///      ▼
    /// assign("chopp", cliente_2, 3)
    ///      │
    ///      ▼
    /// InvalidQuantity { item_id: "chopp", requested: 3, remaining: 1 }
    ///      │
    ///      ▼
    /// UI shows: "Only 1 left to assign"
    /// ```
    ///
    /// Never clamped: a clamp would hide a caller that double-counts units.
    #[error("Invalid quantity for {item_id}: requested {requested}, remaining {remaining}")]
    InvalidQuantity {
        item_id: String,
        requested: i64,
        remaining: i64,
    },

    #[error("Line item not found: {0}")]
    ItemNotFound(String),

    #[error("Payer not found: {0}")]
    PayerNotFound(String),

    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(String),

    /// Payer cannot be marked paid without a payment method.
    #[error("Payer {payer_id} has no payment method")]
    MissingPaymentMethod { payer_id: String },

    /// Tender was entered for a method that never returns change.
    #[error("Payment method {method_id} does not accept change")]
    ChangeNotAccepted { method_id: String },

    /// Payer is marked paid; toggle it back to unpaid before editing.
    #[error("Payer {payer_id} is already paid")]
    PayerLocked { payer_id: String },

    #[error("No eligible payers to split across")]
    NoEligiblePayers,

    /// Split requested but there is nothing left to distribute.
    #[error("Nothing to split: {0}")]
    NothingToSplit(String),

    #[error("A session cannot have more than {max} payers")]
    TooManyPayers { max: usize },

    #[error("A session must keep at least one payer")]
    LastPayer,

    /// A checkpoint snapshot does not describe a consistent ledger.
    #[error("Corrupt checkpoint: {0}")]
    CorruptCheckpoint(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true when the error means a referenced entity is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ItemNotFound(_)
                | CoreError::PayerNotFound(_)
                | CoreError::PaymentMethodNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Boundary validation errors for externally supplied records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate identifier (e.g., two line items with the same id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

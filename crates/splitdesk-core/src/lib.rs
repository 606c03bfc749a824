//! # splitdesk-core: Pure Settlement Logic for SplitDesk
//!
//! Splits one restaurant/bar order across many payers and decides when the
//! split is good enough to checkpoint or to close the order.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SplitDesk Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Cashier UI / Operator CLI                    │   │
//! │  │    Payer list ──► Item assignment ──► Tender ──► Finalize       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 splitdesk-session (SettlementDesk)              │   │
//! │  │    open_or_resume, save_and_continue, finalize, permissions     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ splitdesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │allocation │  │   payer   │  │settlement │  │  session  │  │   │
//! │  │   │  ledger   │  │  ledger   │  │ validator │  │ snapshot  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                splitdesk-db (SQLite persistence)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent `Money` with exact even splits
//! - [`types`] - Line items, payment methods, allocation entries
//! - [`catalog`] - Validated item and payment method catalogs
//! - [`allocation`] - Remaining-quantity ledger and split operations
//! - [`payer`] - Payer records and the paid/unpaid state machine
//! - [`settlement`] - Full/partial validation and the settlement record
//! - [`checkpoint`] - Serializable snapshot of an in-progress session
//! - [`session`] - `SettlementSession`, tying it all together
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use splitdesk_core::{
//!     LineItem, Money, PaymentMethod, PaymentMethodCatalog, SessionSettings, SettlementSession,
//! };
//!
//! let methods = PaymentMethodCatalog::new(vec![
//!     PaymentMethod::new("pix", "PIX", 0, false),
//! ]).unwrap();
//! let items = vec![LineItem::new("pizza", 1, Money::from_cents(9000), "Pizza")];
//!
//! let mut session =
//!     SettlementSession::open("mesa-4", items, None, methods, SessionSettings::default()).unwrap();
//! let second = session.add_payer(None).unwrap();
//!
//! let everyone = session.eligible_payer_ids();
//! session.split_all_evenly(&everyone).unwrap();
//! // One unit cannot be halved: the first payer takes it.
//! assert_eq!(session.payer(&second).unwrap().total_due().cents(), 0);
//!
//! for id in &everyone {
//!     session.set_payment_method(id, Some("pix")).unwrap();
//! }
//! session.toggle_paid(&second, Utc::now()).unwrap();
//! assert!(session.validate_partial().is_ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod catalog;
pub mod checkpoint;
pub mod error;
pub mod money;
pub mod payer;
pub mod session;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::AllocationLedger;
pub use catalog::{LineItemCatalog, PaymentMethodCatalog};
pub use checkpoint::{CheckpointSnapshot, CHECKPOINT_VERSION};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payer::{Payer, PayerLedger};
pub use session::{SessionSettings, SessionSummary, SettlementSession};
pub use settlement::{
    validate_full, validate_partial, PayerSettlement, SettlementRecord, Violation, Violations,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Catches keying mistakes (9999 beers) before they reach a ledger.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Largest amount accepted anywhere money enters the engine: unit prices,
/// line totals, order totals, discounts, surcharges and tenders.
///
/// One billion in major units. Every sum the engine forms over bounded
/// amounts stays far inside i64.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Default settlement tolerance: one cent.
pub const DEFAULT_TOLERANCE_CENTS: i64 = 1;

/// Default cap on payers per session.
pub const DEFAULT_MAX_PAYERS: usize = 50;

/// Default payer names are "Cliente 1", "Cliente 2", ...
pub const DEFAULT_PAYER_NAME_PREFIX: &str = "Cliente";

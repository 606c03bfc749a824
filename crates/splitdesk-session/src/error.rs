//! # Session Error Type
//!
//! Unified error for everything the settlement desk does, plus the
//! serializable payload the cashier UI receives.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ───────────┐                                                 │
//! │  Violations ──────────┤                                                 │
//! │  DbError ─────────────┼──► SessionError ──► ErrorPayload { code, ... }  │
//! │  ConfigError ─────────┤                          │                      │
//! │  permission check ────┘                          ▼                      │
//! │                                          UI switches on `code`          │
//! │                                                                         │
//! │  DbError::OrderClosed is lifted to SessionError::OrderClosed so the    │
//! │  UI can tell "someone else closed this order" from "disk is broken".   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::config::ConfigError;
use crate::operator::Permission;
use splitdesk_core::{CoreError, Violation, Violations};
use splitdesk_db::DbError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A ledger or payer operation was rejected.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The settlement validator refused to commit.
    #[error(transparent)]
    Rejected(#[from] Violations),

    #[error("Persistence failed: {0}")]
    Persistence(DbError),

    #[error("Operator {operator_id} lacks permission {permission}")]
    PermissionDenied {
        operator_id: String,
        permission: Permission,
    },

    /// The order already has a settlement; it cannot be reopened.
    #[error("Order {order_id} is already settled")]
    OrderClosed { order_id: String },

    /// The stored checkpoint was taken over different line items or a
    /// different order total.
    ///
    /// ## When This Occurs
    /// Items were added to or removed from the order, or its total changed
    /// (service charge added), after the last "save and continue". The
    /// operator must discard the checkpoint and start the split over.
    #[error("Checkpoint for {order_id} no longer matches the order")]
    StaleCheckpoint { order_id: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::OrderClosed { order_id } => SessionError::OrderClosed { order_id },
            other => SessionError::Persistence(other),
        }
    }
}

/// Machine-readable error codes for the cashier UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InvalidQuantity,
    PayerLocked,
    PaymentError,
    NothingToSplit,
    SettlementRejected,
    PermissionDenied,
    OrderClosed,
    StaleCheckpoint,
    CorruptCheckpoint,
    DatabaseError,
    ConfigError,
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Core(err) => match err {
                e if e.is_not_found() => ErrorCode::NotFound,
                CoreError::InvalidQuantity { .. } => ErrorCode::InvalidQuantity,
                CoreError::PayerLocked { .. } => ErrorCode::PayerLocked,
                CoreError::MissingPaymentMethod { .. } | CoreError::ChangeNotAccepted { .. } => {
                    ErrorCode::PaymentError
                }
                CoreError::NoEligiblePayers | CoreError::NothingToSplit(_) => {
                    ErrorCode::NothingToSplit
                }
                CoreError::CorruptCheckpoint(_) => ErrorCode::CorruptCheckpoint,
                _ => ErrorCode::ValidationError,
            },
            SessionError::Rejected(_) => ErrorCode::SettlementRejected,
            SessionError::Persistence(_) => ErrorCode::DatabaseError,
            SessionError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            SessionError::OrderClosed { .. } => ErrorCode::OrderClosed,
            SessionError::StaleCheckpoint { .. } => ErrorCode::StaleCheckpoint,
            SessionError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// What the UI receives when an action fails.
    ///
    /// ```json
    /// {
    ///   "code": "SETTLEMENT_REJECTED",
    ///   "message": "settlement rejected: Cliente 2 has no payment method",
    ///   "violations": [{ "kind": "missing_payment_method", ... }]
    /// }
    /// ```
    pub fn to_payload(&self) -> ErrorPayload {
        let violations = match self {
            SessionError::Rejected(v) => v.0.clone(),
            _ => Vec::new(),
        };

        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
            violations,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_closed_is_lifted() {
        let err: SessionError = DbError::order_closed("mesa-1").into();
        assert!(matches!(err, SessionError::OrderClosed { .. }));
        assert_eq!(err.code(), ErrorCode::OrderClosed);

        let err: SessionError = DbError::PoolExhausted.into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_core_codes() {
        let err: SessionError = CoreError::PayerNotFound("p".into()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: SessionError = CoreError::LastPayer.into();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err: SessionError = CoreError::ChangeNotAccepted {
            method_id: "pix".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::PaymentError);
    }

    #[test]
    fn test_payload_carries_violations() {
        let err: SessionError = Violations(vec![Violation::NoPaidPayers]).into();
        let payload = err.to_payload();

        assert_eq!(payload.code, ErrorCode::SettlementRejected);
        assert_eq!(payload.violations, vec![Violation::NoPaidPayers]);
        assert_eq!(
            payload.message,
            "settlement rejected: no payer has been marked paid"
        );
    }
}

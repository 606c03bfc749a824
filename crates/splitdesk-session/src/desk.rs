//! # Settlement Desk
//!
//! Drives a [`SettlementSession`] through its persistent lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open_or_resume ──► SettlementSession (in memory, mutated freely)      │
//! │        │                    │                     │                     │
//! │        │ checkpoint?        │ save_and_continue   │ finalize            │
//! │        ▼                    ▼                     ▼                     │
//! │   restore()          validate_partial       validate_full               │
//! │                      store.save_checkpoint  store.finalize (atomic)     │
//! │                        │ ok → Saved           │                         │
//! │                        │ err → LocalOnly      ▼                         │
//! │                        ▼                    order closed, checkpoint    │
//! │                     session kept             removed                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is always consistent in memory before any await. A failed
//! checkpoint never touches it; the cashier keeps working and can retry.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SplitDeskConfig;
use crate::error::{SessionError, SessionResult};
use crate::operator::{Operator, Permission};
use splitdesk_core::{
    LineItem, Money, PaymentMethodCatalog, SessionSettings, SettlementRecord, SettlementSession,
};
use splitdesk_db::{DbError, SettlementStore};

/// Result of `open_or_resume`.
#[derive(Debug)]
pub struct OpenedSession {
    pub session: SettlementSession,
    /// True when the session was rebuilt from a stored checkpoint.
    pub resumed: bool,
}

/// What happened to a "save and continue".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Saved { saved_at: DateTime<Utc> },
    /// The store failed; progress lives only in memory until the next save.
    LocalOnly { reason: String },
}

impl CheckpointOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, CheckpointOutcome::Saved { .. })
    }
}

pub struct SettlementDesk<S: SettlementStore> {
    store: S,
    methods: PaymentMethodCatalog,
    settings: SessionSettings,
}

impl<S: SettlementStore> SettlementDesk<S> {
    pub fn new(store: S, methods: PaymentMethodCatalog, settings: SessionSettings) -> Self {
        SettlementDesk {
            store,
            methods,
            settings,
        }
    }

    pub fn from_config(store: S, config: &SplitDeskConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self::new(
            store,
            config.payment_catalog()?,
            config.session_settings(),
        ))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn methods(&self) -> &PaymentMethodCatalog {
        &self.methods
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a split for the order, resuming its checkpoint when one exists.
    ///
    /// ## Errors
    /// - `OrderClosed` if the order already has a settlement
    /// - `StaleCheckpoint` if the checkpoint covers different line items or
    ///   a different order total
    /// - `Core(CorruptCheckpoint)` if the stored snapshot fails restore checks
    /// - `Persistence` if the store cannot be read
    pub async fn open_or_resume(
        &self,
        order_id: &str,
        items: Vec<LineItem>,
        order_total: Option<Money>,
    ) -> SessionResult<OpenedSession> {
        if self.store.is_closed(order_id).await? {
            return Err(SessionError::OrderClosed {
                order_id: order_id.to_string(),
            });
        }

        if let Some(snapshot) = self.store.load_checkpoint(order_id).await? {
            if !snapshot.matches_order(&items, order_total) {
                warn!(
                    order_id = %order_id,
                    stored_total = %snapshot.order_total,
                    "Checkpoint does not match order items or total"
                );
                return Err(SessionError::StaleCheckpoint {
                    order_id: order_id.to_string(),
                });
            }

            let payer_count = snapshot.payer_count();
            let session =
                SettlementSession::restore(snapshot, self.methods.clone(), self.settings.clone())?;

            info!(order_id = %order_id, payers = payer_count, "Resumed settlement from checkpoint");
            return Ok(OpenedSession {
                session,
                resumed: true,
            });
        }

        let session = SettlementSession::open(
            order_id,
            items,
            order_total,
            self.methods.clone(),
            self.settings.clone(),
        )?;

        info!(
            order_id = %order_id,
            total = %session.order_total(),
            "Opened settlement session"
        );
        Ok(OpenedSession {
            session,
            resumed: false,
        })
    }

    /// Persists in-progress state without closing the order.
    ///
    /// Validation failures are returned as `Rejected`; nothing is written.
    /// A store failure is downgraded to `LocalOnly` so the caller keeps the
    /// session. `OrderClosed` is the exception: the order is gone and the
    /// session must be abandoned.
    pub async fn save_and_continue(
        &self,
        session: &SettlementSession,
    ) -> SessionResult<CheckpointOutcome> {
        session.validate_partial()?;

        let saved_at = Utc::now();
        let snapshot = session.snapshot(saved_at);

        match self.store.save_checkpoint(&snapshot).await {
            Ok(()) => {
                debug!(
                    order_id = %session.order_id(),
                    paid = snapshot.paid_count(),
                    "Checkpoint saved"
                );
                Ok(CheckpointOutcome::Saved { saved_at })
            }
            Err(DbError::OrderClosed { order_id }) => Err(SessionError::OrderClosed { order_id }),
            Err(e) => {
                warn!(
                    order_id = %session.order_id(),
                    error = %e,
                    retryable = e.is_transient(),
                    "Checkpoint failed, keeping session in memory"
                );
                Ok(CheckpointOutcome::LocalOnly {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Validates, records and closes the order.
    ///
    /// On a store failure the session is untouched and finalize may be
    /// retried.
    pub async fn finalize(
        &self,
        session: &SettlementSession,
        operator: &Operator,
    ) -> SessionResult<SettlementRecord> {
        operator.require(Permission::FinalizeSettlement)?;
        session.validate_full()?;

        let record = session.settlement_record(Utc::now())?;
        self.store.finalize(&record, &operator.id).await?;

        info!(
            order_id = %record.order_id,
            operator_id = %operator.id,
            payers = record.payers.len(),
            total = %record.total,
            fees = %record.total_fees(),
            "Settlement finalized"
        );
        Ok(record)
    }

    /// Drops the stored checkpoint for an order.
    pub async fn discard(&self, order_id: &str) -> SessionResult<()> {
        self.store.clear_checkpoint(order_id).await?;
        info!(order_id = %order_id, "Checkpoint discarded");
        Ok(())
    }

    pub async fn settlement(&self, order_id: &str) -> SessionResult<Option<SettlementRecord>> {
        Ok(self.store.load_settlement(order_id).await?)
    }

    // =========================================================================
    // Permission-gated adjustments
    // =========================================================================
    //
    // The only entry points for discounts and surcharges that check the
    // operator. `SettlementSession::set_discount`/`set_surcharge` are ungated.

    pub fn apply_discount(
        &self,
        session: &mut SettlementSession,
        operator: &Operator,
        payer_id: &str,
        discount: Money,
    ) -> SessionResult<()> {
        operator.require(Permission::ApplyDiscount)?;
        session.set_discount(payer_id, discount)?;
        debug!(
            order_id = %session.order_id(),
            payer_id = %payer_id,
            operator_id = %operator.id,
            discount = %discount,
            "Discount applied"
        );
        Ok(())
    }

    pub fn apply_surcharge(
        &self,
        session: &mut SettlementSession,
        operator: &Operator,
        payer_id: &str,
        surcharge: Money,
    ) -> SessionResult<()> {
        operator.require(Permission::ApplySurcharge)?;
        session.set_surcharge(payer_id, surcharge)?;
        debug!(
            order_id = %session.order_id(),
            payer_id = %payer_id,
            operator_id = %operator.id,
            surcharge = %surcharge,
            "Surcharge applied"
        );
        Ok(())
    }
}

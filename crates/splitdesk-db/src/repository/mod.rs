//! # Repository Module
//!
//! SQL for the two things SplitDesk persists.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SettlementDesk                                                         │
//! │       │                                                                 │
//! │       │  store.save_checkpoint(&snapshot)      store.finalize(&record) │
//! │       ▼                                                ▼                │
//! │  CheckpointRepository                       SettlementRepository        │
//! │  ├── save (upsert)                          ├── finalize (1 tx)         │
//! │  ├── load                                   ├── get_by_order            │
//! │  ├── clear                                  ├── is_closed               │
//! │  └── list                                   ├── payer_lines             │
//! │       │                                     └── list_recent             │
//! │       ▼                                                ▼                │
//! │  checkpoints                     settlements + settlement_payers       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime (`sqlx::query` + `bind`), so the crate builds
//! without a live database.

pub mod checkpoint;
pub mod settlement;

//! # splitdesk-db: Persistence Layer for SplitDesk
//!
//! SQLite storage for settlement checkpoints and finalized settlements,
//! behind the [`SettlementStore`] trait.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SplitDesk Data Flow                              │
//! │                                                                         │
//! │  SettlementDesk::save_and_continue / finalize                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   splitdesk-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│  checkpoint    │   │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │  settlement    │   │  001_*.sql   │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │            ▲                                                    │   │
//! │  │            └─── impl SettlementStore (store.rs)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  splitdesk.db (platform data dir, or --db / SPLITDESK_DB_PATH)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use splitdesk_db::{Database, DbConfig, SettlementStore};
//!
//! let db = Database::new(DbConfig::new("splitdesk.db")).await?;
//! db.save_checkpoint(&session.snapshot(Utc::now())).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::SchemaStatus;
pub use pool::{Database, DbConfig, StoreOverview};
pub use store::SettlementStore;

pub use repository::checkpoint::{CheckpointRepository, CheckpointRow};
pub use repository::settlement::{SettlementPayerRow, SettlementRepository, SettlementRow};

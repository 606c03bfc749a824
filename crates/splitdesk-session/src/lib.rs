//! # splitdesk-session: Settlement Orchestration
//!
//! Connects the pure settlement engine in `splitdesk-core` to durable
//! storage in `splitdesk-db`, and owns configuration and operator checks.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   cashier UI / CLI                                                      │
//! │        │  Operator, order id, line items                                │
//! │        ▼                                                                │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │              splitdesk-session (THIS CRATE)                     │  │
//! │   │                                                                 │  │
//! │   │   SettlementDesk<S>   SplitDeskConfig   Operator   SessionError │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! │        │                                   │                            │
//! │        ▼                                   ▼                            │
//! │   splitdesk-core                     splitdesk-db                       │
//! │   (SettlementSession)                (SettlementStore)                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use splitdesk_session::{Operator, SettlementDesk, SplitDeskConfig};
//!
//! let config = SplitDeskConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new(config.database_path())).await?;
//! let desk = SettlementDesk::from_config(db, &config)?;
//!
//! let mut opened = desk.open_or_resume("mesa-12", items, None).await?;
//! // ... assign, split, tender ...
//! desk.save_and_continue(&opened.session).await?;
//! let record = desk.finalize(&opened.session, &operator).await?;
//! ```

pub mod config;
pub mod desk;
pub mod error;
pub mod operator;

pub use config::{
    ConfigError, ConfigResult, DatabaseSettings, EngineSettings, PaymentMethodConfig,
    SplitDeskConfig,
};
pub use desk::{CheckpointOutcome, OpenedSession, SettlementDesk};
pub use error::{ErrorCode, ErrorPayload, SessionError, SessionResult};
pub use operator::{Operator, Permission};

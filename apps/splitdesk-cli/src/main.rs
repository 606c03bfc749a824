//! # SplitDesk CLI
//!
//! Back-office entry point for the settlement engine.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  splitdesk init [--write-config]    create/migrate the database         │
//! │  splitdesk checkpoints              list in-progress splits             │
//! │  splitdesk settlements [--limit N]  list recent finalized settlements   │
//! │  splitdesk inspect <order_id>       summary + validation of a checkpoint│
//! │  splitdesk settlement <order_id>    finalized record as JSON            │
//! │  splitdesk demo [--in-memory]       run the two-payer 60.00 scenario    │
//! │                                                                         │
//! │  Global: --config <path> (SPLITDESK_CONFIG)                             │
//! │          --db <path>     (SPLITDESK_DB_PATH)                            │
//! │  Logging: RUST_LOG, default "info,splitdesk=debug,sqlx=warn"            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splitdesk")]
#[command(about = "Multi-payer bill splitting and settlement", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "SPLITDESK_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the config
    #[arg(long, global = true, env = "SPLITDESK_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database
    Init {
        /// Also write the effective config to the config path
        #[arg(long, default_value_t = false)]
        write_config: bool,
    },

    /// List in-progress checkpoints
    Checkpoints,

    /// List recently finalized settlements
    Settlements {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Show the summary and validation reports of a stored checkpoint
    Inspect { order_id: String },

    /// Print a finalized settlement record as JSON
    Settlement { order_id: String },

    /// Run the two-payer 60.00 scenario end to end
    Demo {
        /// Use a throwaway in-memory database
        #[arg(long, default_value_t = false)]
        in_memory: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = splitdesk_session::SplitDeskConfig::load(cli.config.clone())?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    match cli.cmd {
        Commands::Init { write_config } => {
            commands::init(&config, cli.config, write_config).await?
        }
        Commands::Checkpoints => commands::checkpoints(&config).await?,
        Commands::Settlements { limit } => commands::settlements(&config, limit).await?,
        Commands::Inspect { order_id } => commands::inspect(&config, &order_id).await?,
        Commands::Settlement { order_id } => commands::settlement(&config, &order_id).await?,
        Commands::Demo { in_memory } => commands::demo(&config, in_memory).await?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,splitdesk=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

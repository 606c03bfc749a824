//! Command handlers. Each one opens the database it needs, does its work and
//! prints to stdout; logs go to stderr.

use chrono::Utc;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

use splitdesk_core::{LineItem, Money, SettlementSession, Violation};
use splitdesk_db::{Database, DbConfig, SettlementStore};
use splitdesk_session::{CheckpointOutcome, Operator, SettlementDesk, SplitDeskConfig};

type CmdResult = Result<(), Box<dyn Error>>;

async fn open_database(config: &SplitDeskConfig) -> Result<Database, Box<dyn Error>> {
    let path = config.database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::new(DbConfig::new(path)).await?)
}

fn print_json(value: &impl serde::Serialize) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn init(
    config: &SplitDeskConfig,
    config_path: Option<PathBuf>,
    write_config: bool,
) -> CmdResult {
    let db = open_database(config).await?;
    let overview = db.overview().await?;
    println!(
        "database:    {} ({}/{} migrations applied)",
        config.database_path().display(),
        overview.schema.applied,
        overview.schema.embedded
    );
    println!("checkpoints: {}", overview.open_checkpoints);
    println!("settlements: {}", overview.settlements);

    if write_config {
        let written = config.save(config_path)?;
        println!("config:      {}", written.display());
    }

    db.close().await;
    Ok(())
}

pub async fn checkpoints(config: &SplitDeskConfig) -> CmdResult {
    let db = open_database(config).await?;
    let rows = db.checkpoints().list().await?;

    if rows.is_empty() {
        println!("no checkpoints");
    }
    for row in rows {
        println!(
            "{:<24} payers={:<3} paid={:<3} saved_at={}",
            row.order_id,
            row.payer_count,
            row.paid_count,
            row.saved_at.to_rfc3339()
        );
    }
    Ok(())
}

pub async fn settlements(config: &SplitDeskConfig, limit: u32) -> CmdResult {
    let db = open_database(config).await?;
    let rows = db.settlements().list_recent(limit).await?;

    if rows.is_empty() {
        println!("no settlements");
    }
    for row in rows {
        println!(
            "{:<24} total={:>10} fees={:>8} payers={:<3} operator={} settled_at={}",
            row.order_id,
            Money::from_cents(row.total_cents).to_string(),
            Money::from_cents(row.fee_cents).to_string(),
            row.payer_count,
            row.operator_id.as_deref().unwrap_or("-"),
            row.settled_at.to_rfc3339()
        );
    }
    Ok(())
}

pub async fn inspect(config: &SplitDeskConfig, order_id: &str) -> CmdResult {
    let db = open_database(config).await?;
    let Some(snapshot) = db.load_checkpoint(order_id).await? else {
        println!("no checkpoint for {}", order_id);
        return Ok(());
    };

    let saved_at = snapshot.saved_at;
    let session = SettlementSession::restore(
        snapshot,
        config.payment_catalog()?,
        config.session_settings(),
    )?;

    let report = |result: Result<(), splitdesk_core::Violations>| -> Vec<Violation> {
        result.err().map(|v| v.0).unwrap_or_default()
    };

    print_json(&json!({
        "savedAt": saved_at,
        "summary": session.summary(),
        "partialViolations": report(session.validate_partial()),
        "fullViolations": report(session.validate_full()),
    }))
}

pub async fn settlement(config: &SplitDeskConfig, order_id: &str) -> CmdResult {
    let db = open_database(config).await?;
    match db.load_settlement(order_id).await? {
        Some(record) => print_json(&record),
        None => {
            println!("order {} has no settlement", order_id);
            Ok(())
        }
    }
}

/// Two payers split a 60.00 order: Cliente 1 pays 20.00 by PIX and the
/// checkpoint is saved, then Cliente 2 pays 40.00 in cash with 50.00 and
/// the order is finalized.
pub async fn demo(config: &SplitDeskConfig, in_memory: bool) -> CmdResult {
    let db = if in_memory {
        Database::new(DbConfig::in_memory()).await?
    } else {
        open_database(config).await?
    };
    let desk = SettlementDesk::from_config(db, config)?;

    let order_id = format!("demo-{}", Utc::now().format("%Y%m%d%H%M%S"));
    let items = vec![
        LineItem::new("picanha", 2, Money::from_cents(2000), "Picanha"),
        LineItem::new("caipirinha", 1, Money::from_cents(2000), "Caipirinha"),
    ];

    let mut session = desk.open_or_resume(&order_id, items, None).await?.session;
    let first = session
        .eligible_payer_ids()
        .into_iter()
        .next()
        .ok_or("session opened without a payer")?;
    let second = session.add_payer(None)?;

    session.assign("picanha", &first, 1)?;
    session.assign("picanha", &second, 1)?;
    session.assign("caipirinha", &second, 1)?;

    session.set_payment_method(&first, Some("pix"))?;
    session.toggle_paid(&first, Utc::now())?;

    match desk.save_and_continue(&session).await? {
        CheckpointOutcome::Saved { saved_at } => info!(%saved_at, "Demo checkpoint saved"),
        CheckpointOutcome::LocalOnly { reason } => info!(%reason, "Demo checkpoint kept local"),
    }

    session.set_payment_method(&second, Some("dinheiro"))?;
    let change = session.update_tendered_amount(&second, Money::from_cents(5000))?;
    session.toggle_paid(&second, Utc::now())?;
    info!(%change, "Cash change computed");

    let operator = Operator::supervisor("cli", "SplitDesk CLI");
    let record = desk.finalize(&session, &operator).await?;
    print_json(&record)
}

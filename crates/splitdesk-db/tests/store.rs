//! SettlementStore behaviour against an in-memory SQLite database.

use chrono::Utc;
use splitdesk_core::{
    LineItem, Money, PaymentMethod, PaymentMethodCatalog, SessionSettings, SettlementSession,
};
use splitdesk_db::{Database, DbConfig, DbError, SettlementStore};

fn methods() -> PaymentMethodCatalog {
    PaymentMethodCatalog::new(vec![
        PaymentMethod::new("dinheiro", "Dinheiro", 0, true),
        PaymentMethod::new("credito", "Crédito", 250, false),
    ])
    .unwrap()
}

/// Two payers, one already paid by card.
fn session(order_id: &str) -> SettlementSession {
    let mut session = SettlementSession::open(
        order_id,
        vec![
            LineItem::new("moqueca", 1, Money::from_cents(8000), "Moqueca"),
            LineItem::new("suco", 2, Money::from_cents(1000), "Suco"),
        ],
        None,
        methods(),
        SessionSettings::default(),
    )
    .unwrap();

    let first = session.eligible_payer_ids()[0].clone();
    let second = session.add_payer(Some("Bia")).unwrap();
    session.assign("moqueca", &first, 1).unwrap();
    session.split_evenly("suco", &[first.clone(), second.clone()]).unwrap();
    session.set_payment_method(&first, Some("credito")).unwrap();
    session.toggle_paid(&first, Utc::now()).unwrap();
    session.set_payment_method(&second, Some("dinheiro")).unwrap();
    session
        .update_tendered_amount(&second, Money::from_cents(2000))
        .unwrap();
    session
}

async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

#[tokio::test]
async fn checkpoint_upsert_keeps_latest() {
    let db = db().await;
    let mut session = session("mesa-1");

    db.save_checkpoint(&session.snapshot(Utc::now())).await.unwrap();
    session.add_payer(None).unwrap();
    db.save_checkpoint(&session.snapshot(Utc::now())).await.unwrap();

    let loaded = db.load_checkpoint("mesa-1").await.unwrap().unwrap();
    assert_eq!(loaded.payer_count(), 3);

    let rows = db.checkpoints().list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].paid_count, 1);
}

#[tokio::test]
async fn missing_checkpoint_is_none() {
    let db = db().await;
    assert!(db.load_checkpoint("nowhere").await.unwrap().is_none());
    db.clear_checkpoint("nowhere").await.unwrap();
}

#[tokio::test]
async fn finalize_closes_order_and_drops_checkpoint() {
    let db = db().await;
    let session = session("mesa-2");
    db.save_checkpoint(&session.snapshot(Utc::now())).await.unwrap();

    let record = session.settlement_record(Utc::now()).unwrap();
    db.finalize(&record, "op-1").await.unwrap();

    assert!(db.is_closed("mesa-2").await.unwrap());
    assert!(db.load_checkpoint("mesa-2").await.unwrap().is_none());
    assert_eq!(db.load_settlement("mesa-2").await.unwrap(), Some(record.clone()));

    let lines = db.settlements().payer_lines("mesa-2").await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].total_due_cents, 9000);
    assert_eq!(lines[0].fee_cents, 225);
    assert_eq!(lines[1].name, "Bia");
    assert_eq!(lines[1].change_cents, 1000);

    let recent = db.settlements().list_recent(10).await.unwrap();
    assert_eq!(recent[0].operator_id.as_deref(), Some("op-1"));
    assert_eq!(recent[0].total_cents, 10000);
}

#[tokio::test]
async fn second_finalize_is_rejected() {
    let db = db().await;
    let record = session("mesa-3").settlement_record(Utc::now()).unwrap();

    db.finalize(&record, "op-1").await.unwrap();
    let err = db.finalize(&record, "op-2").await.unwrap_err();

    assert!(matches!(err, DbError::OrderClosed { .. }));
    assert_eq!(db.settlements().list_recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn checkpoint_after_close_is_rejected() {
    let db = db().await;
    let session = session("mesa-4");
    db.finalize(&session.settlement_record(Utc::now()).unwrap(), "op-1")
        .await
        .unwrap();

    let err = db
        .save_checkpoint(&session.snapshot(Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::OrderClosed { .. }));
}

#[tokio::test]
async fn stored_checkpoint_restores_equivalent_session() {
    let db = db().await;
    let session = session("mesa-5");
    db.save_checkpoint(&session.snapshot(Utc::now())).await.unwrap();

    let snapshot = db.load_checkpoint("mesa-5").await.unwrap().unwrap();
    let restored =
        SettlementSession::restore(snapshot, methods(), SessionSettings::default()).unwrap();

    assert_eq!(restored.payers(), session.payers());
    assert_eq!(restored.summary(), session.summary());
}

//! The approval state machine: exactly-once decisions, balance credit
//! on approve, and nothing but the record touched on reject.

use sqlx::SqlitePool;
use tokio::task::JoinSet;

use keyshop::config::Config;
use keyshop::error::ShopError;
use keyshop::models::key::Tier;
use keyshop::models::transaction::{TxId, TxStatus};
use keyshop::models::user::PrincipalId;
use keyshop::services::{
    approval_service, inventory_service, ledger_service, purchase_service, stats_service,
};

const ADMIN: PrincipalId = PrincipalId(9001);
const OTHER_ADMIN: PrincipalId = PrincipalId(9002);
const BUYER: PrincipalId = PrincipalId(100);

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        super_admin_id: 9000,
        bootstrap_admin_ids: Vec::new(),
        contact_handle: None,
        channel_handle: None,
    }
}

async fn enroll(pool: &SqlitePool, id: PrincipalId) {
    let config = test_config();
    ledger_service::get_or_create(pool, &config, id, None)
        .await
        .unwrap();
}

#[sqlx::test]
async fn approval_credits_the_owner(pool: SqlitePool) {
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 500, "easypaisa", Some("p1"))
        .await
        .unwrap();

    let approval = approval_service::approve(&pool, ADMIN, record.id).await.unwrap();

    assert_eq!(approval.record.status, TxStatus::Approved);
    assert_eq!(approval.record.decided_by, Some(ADMIN));
    assert_eq!(approval.new_balance, 500);

    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 500);
}

#[sqlx::test]
async fn approval_never_touches_the_inventory(pool: SqlitePool) {
    inventory_service::add_key(&pool, "ShelfKey", Tier::ThreeDay)
        .await
        .unwrap();
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 1000, "binance", None)
        .await
        .unwrap();

    approval_service::approve(&pool, ADMIN, record.id).await.unwrap();

    // Money moved, keys did not
    let count = inventory_service::available_count(&pool, Tier::ThreeDay)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(stats_service::receipts_for(&pool, BUYER).await.unwrap().is_empty());
}

#[sqlx::test]
async fn rejection_is_final_and_leaves_the_balance_alone(pool: SqlitePool) {
    enroll(&pool, BUYER).await;

    // Six earlier submissions so the one under review is #7
    for n in 1..7 {
        purchase_service::submit_payment(&pool, BUYER, 100 * n, "upi", None)
            .await
            .unwrap();
    }
    let record = purchase_service::submit_payment(&pool, BUYER, 500, "easypaisa", Some("p7"))
        .await
        .unwrap();
    assert_eq!(record.id, TxId(7));

    let rejected = approval_service::reject(&pool, ADMIN, TxId(7), "duplicate screenshot")
        .await
        .unwrap();
    assert_eq!(rejected.status, TxStatus::Rejected);
    assert_eq!(rejected.reject_reason.as_deref(), Some("duplicate screenshot"));
    assert_eq!(rejected.decided_by, Some(ADMIN));

    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 0);

    // A second decision of either kind bounces
    let err = approval_service::reject(&pool, ADMIN, TxId(7), "again")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::AlreadyDecided {
            id: TxId(7),
            status: TxStatus::Rejected,
        }
    ));

    let err = approval_service::approve(&pool, OTHER_ADMIN, TxId(7)).await.unwrap_err();
    assert!(matches!(err, ShopError::AlreadyDecided { .. }));
    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 0);
}

#[sqlx::test]
async fn racing_admins_decide_exactly_once(pool: SqlitePool) {
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 500, "easypaisa", None)
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for admin in [ADMIN, OTHER_ADMIN] {
        let pool = pool.clone();
        let id = record.id;
        tasks.spawn(async move { approval_service::approve(&pool, admin, id).await });
    }

    let mut approved = 0;
    let mut conflicted = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => approved += 1,
            Err(ShopError::AlreadyDecided { .. }) => conflicted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(approved, 1);
    assert_eq!(conflicted, 1);

    // Credited once, not twice
    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 500);
}

#[sqlx::test]
async fn unknown_records_report_not_found(pool: SqlitePool) {
    let err = approval_service::approve(&pool, ADMIN, TxId(99)).await.unwrap_err();
    assert!(matches!(err, ShopError::TxNotFound(TxId(99))));

    let err = approval_service::reject(&pool, ADMIN, TxId(99), "why").await.unwrap_err();
    assert!(matches!(err, ShopError::TxNotFound(TxId(99))));

    let err = approval_service::begin_reject(&pool, TxId(99)).await.unwrap_err();
    assert!(matches!(err, ShopError::TxNotFound(TxId(99))));
}

#[sqlx::test]
async fn reports_split_paid_in_money_from_balance_spend(pool: SqlitePool) {
    inventory_service::add_key(&pool, "ReportKey", Tier::ThreeDay)
        .await
        .unwrap();
    enroll(&pool, BUYER).await;

    // ₹500 in via an approved screenshot, ₹280 of it out via a balance
    // purchase, ₹200 still waiting for review
    let top_up = purchase_service::submit_payment(&pool, BUYER, 500, "easypaisa", Some("p1"))
        .await
        .unwrap();
    approval_service::approve(&pool, ADMIN, top_up.id).await.unwrap();
    purchase_service::purchase_with_balance(&pool, BUYER, Tier::ThreeDay, 280)
        .await
        .unwrap();
    purchase_service::submit_payment(&pool, BUYER, 200, "upi", None)
        .await
        .unwrap();

    let report = stats_service::user_report(&pool, BUYER).await.unwrap();
    assert_eq!(report.approved_top_ups, 500);
    assert_eq!(report.keys_owned, 1);
    assert_eq!(report.transaction_count, 3);
    assert_eq!(report.user.balance, 220);

    let stats = stats_service::shop_stats(&pool).await.unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.pending_transactions, 1);
    assert_eq!(stats.approved_revenue, 780);
    assert_eq!(stats.revenue_today, 780);
}

#[sqlx::test]
async fn begin_reject_only_passes_pending_records(pool: SqlitePool) {
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 300, "upi", None)
        .await
        .unwrap();

    let pending = approval_service::begin_reject(&pool, record.id).await.unwrap();
    assert_eq!(pending.id, record.id);

    approval_service::approve(&pool, ADMIN, record.id).await.unwrap();

    let err = approval_service::begin_reject(&pool, record.id).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::AlreadyDecided {
            status: TxStatus::Approved,
            ..
        }
    ));
}

//! Ledger behavior: idempotent enrollment, bootstrap admin flags and
//! balance arithmetic that can never overdraw.

use sqlx::SqlitePool;
use tokio::task::JoinSet;

use keyshop::config::Config;
use keyshop::error::ShopError;
use keyshop::models::user::PrincipalId;
use keyshop::services::ledger_service;

const SUPER_ADMIN: PrincipalId = PrincipalId(9000);
const ADMIN: PrincipalId = PrincipalId(9001);
const BUYER: PrincipalId = PrincipalId(100);

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        super_admin_id: SUPER_ADMIN.0,
        bootstrap_admin_ids: vec![ADMIN.0],
        contact_handle: None,
        channel_handle: None,
    }
}

#[sqlx::test]
async fn enrollment_is_idempotent(pool: SqlitePool) {
    let config = test_config();

    let first = ledger_service::get_or_create(&pool, &config, BUYER, Some("alice"))
        .await
        .unwrap();
    assert_eq!(first.id, BUYER);
    assert_eq!(first.balance, 0);
    assert!(!first.is_admin);
    assert_eq!(first.handle.as_deref(), Some("alice"));

    // Alias is a short uppercase tag for principals without a handle
    assert_eq!(first.alias.len(), 8);
    assert_eq!(first.alias, first.alias.to_uppercase());

    let again = ledger_service::get_or_create(&pool, &config, BUYER, Some("alice"))
        .await
        .unwrap();
    assert_eq!(again.alias, first.alias);
    assert_eq!(again.created_at, first.created_at);
}

#[sqlx::test]
async fn bootstrap_admins_enroll_with_the_flag(pool: SqlitePool) {
    let config = test_config();

    let super_admin = ledger_service::get_or_create(&pool, &config, SUPER_ADMIN, None)
        .await
        .unwrap();
    assert!(super_admin.is_admin);

    let admin = ledger_service::get_or_create(&pool, &config, ADMIN, None)
        .await
        .unwrap();
    assert!(admin.is_admin);

    let buyer = ledger_service::get_or_create(&pool, &config, BUYER, None)
        .await
        .unwrap();
    assert!(!buyer.is_admin);

    let roster = ledger_service::admins(&pool).await.unwrap();
    assert_eq!(roster.len(), 2);
}

#[sqlx::test]
async fn balance_never_goes_negative(pool: SqlitePool) {
    let config = test_config();
    ledger_service::get_or_create(&pool, &config, BUYER, None)
        .await
        .unwrap();

    let balance = ledger_service::adjust_balance(&pool, BUYER, 500).await.unwrap();
    assert_eq!(balance, 500);

    let balance = ledger_service::adjust_balance(&pool, BUYER, -200).await.unwrap();
    assert_eq!(balance, 300);

    let err = ledger_service::adjust_balance(&pool, BUYER, -301).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::InsufficientBalance {
            required: 301,
            available: 300,
        }
    ));

    // The failed debit changed nothing
    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 300);
}

#[sqlx::test]
async fn adjusting_an_unknown_principal_reports_not_found(pool: SqlitePool) {
    let err = ledger_service::adjust_balance(&pool, PrincipalId(404), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::UserNotFound(PrincipalId(404))));
}

#[sqlx::test]
async fn concurrent_debits_stop_exactly_at_zero_capacity(pool: SqlitePool) {
    let config = test_config();
    ledger_service::get_or_create(&pool, &config, BUYER, None)
        .await
        .unwrap();
    ledger_service::adjust_balance(&pool, BUYER, 1000).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..10 {
        let pool = pool.clone();
        tasks.spawn(async move { ledger_service::adjust_balance(&pool, BUYER, -150).await });
    }

    let mut succeeded = 0;
    let mut refused = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ShopError::InsufficientBalance { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 1000 funds six debits of 150; the other four must bounce
    assert_eq!(succeeded, 6);
    assert_eq!(refused, 4);

    let user = ledger_service::require(&pool, BUYER).await.unwrap();
    assert_eq!(user.balance, 100);
}

#[sqlx::test]
async fn block_round_trip_clears_reason_and_timestamp(pool: SqlitePool) {
    let config = test_config();
    ledger_service::get_or_create(&pool, &config, BUYER, None)
        .await
        .unwrap();

    let blocked = ledger_service::set_blocked(&pool, BUYER, true, Some("spam"))
        .await
        .unwrap();
    assert!(blocked.is_blocked);
    assert_eq!(blocked.blocked_reason.as_deref(), Some("spam"));
    assert!(blocked.blocked_at.is_some());

    let unblocked = ledger_service::set_blocked(&pool, BUYER, false, None)
        .await
        .unwrap();
    assert!(!unblocked.is_blocked);
    assert!(unblocked.blocked_reason.is_none());
    assert!(unblocked.blocked_at.is_none());
}

//! Admin gates and the audit trail: every mutation through the admin
//! surface leaves a diff, and refused callers leave nothing.

use sqlx::SqlitePool;

use keyshop::config::Config;
use keyshop::error::ShopError;
use keyshop::models::key::Tier;
use keyshop::models::user::PrincipalId;
use keyshop::services::{
    admin_service, audit_service, catalog_service, inventory_service, ledger_service,
    purchase_service,
};

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

async fn enroll(pool: &SqlitePool, id: PrincipalId) {
    let config = test_config();
    ledger_service::get_or_create(pool, &config, id, None)
        .await
        .unwrap();
}

#[sqlx::test]
async fn refused_callers_leave_no_trace(pool: SqlitePool) {
    enroll(&pool, BUYER).await;

    let err = admin_service::add_key(&pool, BUYER, "Sneaky", Tier::ThreeDay)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));

    // Unknown principals are refused the same way
    let err = admin_service::set_price(&pool, PrincipalId(404), Tier::ThreeDay, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));

    assert!(inventory_service::find_key(&pool, "Sneaky").await.unwrap().is_none());
    assert!(audit_service::recent(&pool, 10).await.unwrap().is_empty());
}

#[sqlx::test]
async fn inventory_changes_are_audited(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;

    admin_service::add_key(&pool, ADMIN, "AuditMe", Tier::TenDay)
        .await
        .unwrap();
    admin_service::delete_key(&pool, ADMIN, "auditme").await.unwrap();

    let entries = audit_service::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 2);

    // Newest first
    assert_eq!(entries[0].action, "delete_key");
    assert!(entries[0].details.contains("AuditMe"));
    assert_eq!(entries[1].action, "add_key");
    assert_eq!(entries[1].admin_id, ADMIN);
}

#[sqlx::test]
async fn price_change_persists_and_audits_the_diff(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;

    let old = admin_service::set_price(&pool, ADMIN, Tier::ThreeDay, 300)
        .await
        .unwrap();
    assert_eq!(old, 280);

    let price = catalog_service::price(&pool, Tier::ThreeDay).await.unwrap();
    assert_eq!(price, 300);

    let entries = audit_service::recent(&pool, 1).await.unwrap();
    assert_eq!(entries[0].action, "set_price");
    assert!(entries[0].details.contains("280"));
    assert!(entries[0].details.contains("300"));
}

#[sqlx::test]
async fn block_unblock_round_trip_with_target_in_the_audit(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;
    enroll(&pool, BUYER).await;

    let blocked = admin_service::block_user(&pool, ADMIN, BUYER, Some("spam"))
        .await
        .unwrap();
    assert!(blocked.is_blocked);
    assert_eq!(blocked.blocked_reason.as_deref(), Some("spam"));

    let unblocked = admin_service::unblock_user(&pool, ADMIN, BUYER).await.unwrap();
    assert!(!unblocked.is_blocked);

    let entries = audit_service::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "unblock");
    assert_eq!(entries[1].action, "block");
    assert_eq!(entries[1].target_user_id, Some(BUYER));
    assert!(entries[1].details.contains("spam"));
}

#[sqlx::test]
async fn blocking_requires_an_enrolled_target(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;

    let err = admin_service::block_user(&pool, ADMIN, PrincipalId(404), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::UserNotFound(PrincipalId(404))));

    assert!(audit_service::recent(&pool, 10).await.unwrap().is_empty());
}

#[sqlx::test]
async fn roster_changes_are_super_admin_only(pool: SqlitePool) {
    let config = test_config();
    enroll(&pool, SUPER_ADMIN).await;
    enroll(&pool, ADMIN).await;
    enroll(&pool, BUYER).await;

    // A regular admin cannot grow the roster
    let err = admin_service::add_admin(&pool, &config, ADMIN, BUYER)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));

    let promoted = admin_service::add_admin(&pool, &config, SUPER_ADMIN, BUYER)
        .await
        .unwrap();
    assert!(promoted.is_admin);
    assert_eq!(promoted.added_by, Some(SUPER_ADMIN));

    let err = admin_service::add_admin(&pool, &config, SUPER_ADMIN, BUYER)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidInput(_)));

    // The super admin cannot saw off the branch they sit on
    let err = admin_service::remove_admin(&pool, &config, SUPER_ADMIN, SUPER_ADMIN)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidInput(_)));

    let demoted = admin_service::remove_admin(&pool, &config, SUPER_ADMIN, BUYER)
        .await
        .unwrap();
    assert!(!demoted.is_admin);
    assert_eq!(demoted.added_by, None);

    let err = admin_service::remove_admin(&pool, &config, SUPER_ADMIN, BUYER)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidInput(_)));
}

#[sqlx::test]
async fn payment_setup_changes_stick_and_audit(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;

    let old = admin_service::set_destination(&pool, ADMIN, "easypaisa", "03119998877")
        .await
        .unwrap();
    assert_eq!(old, "03001234567");

    let method = catalog_service::payment_method(&pool, "easypaisa").await.unwrap();
    assert_eq!(method.destination, "03119998877");

    let old_qr = admin_service::set_qr(&pool, ADMIN, "easypaisa", "qr-photo-1")
        .await
        .unwrap();
    assert_eq!(old_qr, None);

    let old_qr = admin_service::set_qr(&pool, ADMIN, "easypaisa", "qr-photo-2")
        .await
        .unwrap();
    assert_eq!(old_qr.as_deref(), Some("qr-photo-1"));

    let method = catalog_service::payment_method(&pool, "easypaisa").await.unwrap();
    assert_eq!(method.qr.as_deref(), Some("qr-photo-2"));

    let entries = audit_service::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].action, "set_dest");
    assert!(entries[2].details.contains("03119998877"));
}

#[sqlx::test]
async fn payment_decisions_are_gated_and_audited(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 500, "easypaisa", None)
        .await
        .unwrap();

    // A non-admin cannot decide, and the record stays pending
    let err = admin_service::approve_transaction(&pool, BUYER, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));
    assert_eq!(purchase_service::pending(&pool).await.unwrap().len(), 1);
    assert!(audit_service::recent(&pool, 10).await.unwrap().is_empty());

    let approval = admin_service::approve_transaction(&pool, ADMIN, record.id)
        .await
        .unwrap();
    assert_eq!(approval.new_balance, 500);

    let entries = audit_service::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "approve");
    assert_eq!(entries[0].target_user_id, Some(BUYER));
    assert!(entries[0].details.contains("500"));
}

#[sqlx::test]
async fn rejection_runs_through_the_same_gate(pool: SqlitePool) {
    enroll(&pool, ADMIN).await;
    enroll(&pool, BUYER).await;
    let record = purchase_service::submit_payment(&pool, BUYER, 300, "upi", None)
        .await
        .unwrap();

    let err = admin_service::begin_reject_transaction(&pool, BUYER, record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Unauthorized));

    admin_service::begin_reject_transaction(&pool, ADMIN, record.id)
        .await
        .unwrap();
    let rejected = admin_service::reject_transaction(&pool, ADMIN, record.id, "blurry photo")
        .await
        .unwrap();
    assert_eq!(rejected.reject_reason.as_deref(), Some("blurry photo"));

    let entries = audit_service::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "reject");
    assert!(entries[0].details.contains("blurry photo"));
}

//! Read-only projections for the admin dashboard and user lookups.

use chrono::{NaiveTime, Utc};

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::key::{Tier, UserKey};
use crate::models::transaction::METHOD_BALANCE;
use crate::models::user::{PrincipalId, User};
use crate::services::{inventory_service, ledger_service};

/// Shop-wide counters for the stats panel.
#[derive(Debug)]
pub struct ShopStats {
    pub total_users: i64,
    pub blocked_users: i64,
    pub admin_count: i64,
    pub pending_transactions: i64,
    pub approved_revenue: i64,
    pub revenue_today: i64,
    pub stock: Vec<(Tier, i64)>,
}

/// Gather the dashboard counters in one pass.
///
/// Revenue counts approved records only; today's slice is bounded by
/// local midnight in UTC.
pub async fn shop_stats(pool: &DbPool) -> Result<ShopStats, ShopError> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let blocked_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_blocked = 1")
        .fetch_one(pool)
        .await?;

    let admin_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = 1")
        .fetch_one(pool)
        .await?;

    let pending_transactions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;

    let approved_revenue: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE status = 'approved'",
    )
    .fetch_one(pool)
    .await?;

    let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let revenue_today: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0) FROM transactions
        WHERE status = 'approved' AND created_at >= ?1
        "#,
    )
    .bind(midnight)
    .fetch_one(pool)
    .await?;

    let stock = inventory_service::stock_counts(pool).await?;

    Ok(ShopStats {
        total_users,
        blocked_users,
        admin_count,
        pending_transactions,
        approved_revenue,
        revenue_today,
        stock,
    })
}

/// Everything an admin sees when inspecting one principal.
#[derive(Debug)]
pub struct UserReport {
    pub user: User,
    pub keys_owned: i64,
    pub approved_top_ups: i64,
    pub transaction_count: i64,
}

/// Profile, key ownership and payment totals for one principal.
///
/// # Errors
///
/// - `UserNotFound`: the principal has never talked to the shop
pub async fn user_report(pool: &DbPool, id: PrincipalId) -> Result<UserReport, ShopError> {
    let user = ledger_service::require(pool, id).await?;

    let keys_owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_keys WHERE user_id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    // Approval only ever credits balance, so the approved external
    // records are exactly the money this principal paid in.
    let approved_top_ups: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0) FROM transactions
        WHERE user_id = ?1 AND status = 'approved' AND payment_method <> ?2
        "#,
    )
    .bind(id)
    .bind(METHOD_BALANCE)
    .fetch_one(pool)
    .await?;

    let transaction_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = ?1")
            .bind(id)
            .fetch_one(pool)
            .await?;

    Ok(UserReport {
        user,
        keys_owned,
        approved_top_ups,
        transaction_count,
    })
}

/// A principal's purchase receipts, newest first.
pub async fn receipts_for(pool: &DbPool, id: PrincipalId) -> Result<Vec<UserKey>, ShopError> {
    let receipts = sqlx::query_as::<_, UserKey>(
        "SELECT * FROM user_keys WHERE user_id = ?1 ORDER BY purchased_at DESC, id DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(receipts)
}

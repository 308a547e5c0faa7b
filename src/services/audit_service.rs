//! Admin audit trail.
//!
//! Append-only: entries are written after a gated mutation succeeds and
//! are never updated or deleted. Unauthorized attempts never reach this
//! module.

use chrono::Utc;

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::audit::AuditEntry;
use crate::models::user::PrincipalId;

/// Append one audit entry.
///
/// # Arguments
///
/// * `action` - short action kind, e.g. `add_key`, `block`, `approve`
/// * `target` - principal the action was aimed at, when there is one
/// * `details` - human-readable old -> new diff of the change
pub async fn record(
    pool: &DbPool,
    admin_id: PrincipalId,
    action: &str,
    target: Option<PrincipalId>,
    details: &str,
) -> Result<(), ShopError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (admin_id, action, target_user_id, details, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(admin_id)
    .bind(action)
    .bind(target)
    .bind(details)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent audit entries, newest first.
pub async fn recent(pool: &DbPool, limit: i64) -> Result<Vec<AuditEntry>, ShopError> {
    let entries =
        sqlx::query_as::<_, AuditEntry>("SELECT * FROM audit_log ORDER BY id DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(pool)
            .await?;

    Ok(entries)
}

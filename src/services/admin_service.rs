//! Admin control - authorization gates wrapped around the mutating
//! services, with an audit entry for every state change that goes
//! through.
//!
//! The gate runs first and an unauthorized caller leaves no trace in
//! the audit log. Audit details record the old and new value so the
//! log reads as a diff.

use crate::config::Config;
use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::key::{Key, Tier};
use crate::models::transaction::{Transaction, TxId, TxStatus};
use crate::models::user::{PrincipalId, User};
use crate::services::{
    approval_service, audit_service, catalog_service, inventory_service, ledger_service,
};

/// Verify the actor holds the admin flag.
///
/// # Errors
///
/// - `Unauthorized`: unknown principal or not an admin
pub async fn require_admin(pool: &DbPool, id: PrincipalId) -> Result<User, ShopError> {
    let user = ledger_service::get(pool, id)
        .await?
        .ok_or(ShopError::Unauthorized)?;

    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    Ok(user)
}

/// Verify the actor is the configured super admin.
pub fn require_super_admin(config: &Config, id: PrincipalId) -> Result<(), ShopError> {
    if !config.is_super_admin(id) {
        return Err(ShopError::Unauthorized);
    }

    Ok(())
}

/// Add a key to the inventory on an admin's behalf.
pub async fn add_key(
    pool: &DbPool,
    actor: PrincipalId,
    value: &str,
    tier: Tier,
) -> Result<Key, ShopError> {
    require_admin(pool, actor).await?;

    let key = inventory_service::add_key(pool, value, tier).await?;

    audit_service::record(
        pool,
        actor,
        "add_key",
        None,
        &format!("{} key '{}'", tier.as_str(), key.value),
    )
    .await?;

    Ok(key)
}

/// Remove a key from the inventory on an admin's behalf.
pub async fn delete_key(pool: &DbPool, actor: PrincipalId, value: &str) -> Result<Key, ShopError> {
    require_admin(pool, actor).await?;

    let key = inventory_service::delete_key(pool, value).await?;

    audit_service::record(
        pool,
        actor,
        "delete_key",
        None,
        &format!("{} key '{}' (was {})", key.tier.as_str(), key.value, key.status),
    )
    .await?;

    Ok(key)
}

/// Change a tier's price, returning the price it replaced.
pub async fn set_price(
    pool: &DbPool,
    actor: PrincipalId,
    tier: Tier,
    new_price: i64,
) -> Result<i64, ShopError> {
    require_admin(pool, actor).await?;

    let old = catalog_service::set_price(pool, tier, new_price).await?;

    audit_service::record(
        pool,
        actor,
        "set_price",
        None,
        &format!("{}: ₹{} -> ₹{}", tier.as_str(), old, new_price),
    )
    .await?;

    Ok(old)
}

/// Block a principal from purchasing, with an optional reason.
pub async fn block_user(
    pool: &DbPool,
    actor: PrincipalId,
    target: PrincipalId,
    reason: Option<&str>,
) -> Result<User, ShopError> {
    require_admin(pool, actor).await?;

    // Resolve the target first so a typo'd id reports NotFound, not a
    // phantom block.
    let before = ledger_service::require(pool, target).await?;
    let after = ledger_service::set_blocked(pool, target, true, reason).await?;

    let detail = match reason {
        Some(reason) => format!("blocked: {} -> {} ({reason})", before.is_blocked, after.is_blocked),
        None => format!("blocked: {} -> {}", before.is_blocked, after.is_blocked),
    };
    audit_service::record(pool, actor, "block", Some(target), &detail).await?;

    Ok(after)
}

/// Lift a block.
pub async fn unblock_user(
    pool: &DbPool,
    actor: PrincipalId,
    target: PrincipalId,
) -> Result<User, ShopError> {
    require_admin(pool, actor).await?;

    let before = ledger_service::require(pool, target).await?;
    let after = ledger_service::set_blocked(pool, target, false, None).await?;

    audit_service::record(
        pool,
        actor,
        "unblock",
        Some(target),
        &format!("blocked: {} -> {}", before.is_blocked, after.is_blocked),
    )
    .await?;

    Ok(after)
}

/// Grant the admin flag to a principal. Super admin only.
///
/// # Errors
///
/// - `Unauthorized`: actor is not the super admin
/// - `UserNotFound`: the target has never talked to the shop
/// - `InvalidInput`: the target is already an admin
pub async fn add_admin(
    pool: &DbPool,
    config: &Config,
    actor: PrincipalId,
    target: PrincipalId,
) -> Result<User, ShopError> {
    require_super_admin(config, actor)?;

    let before = ledger_service::require(pool, target).await?;
    if before.is_admin {
        return Err(ShopError::InvalidInput(format!(
            "{} is already an admin",
            before.display_name()
        )));
    }

    let after = ledger_service::set_admin(pool, target, true, Some(actor)).await?;

    audit_service::record(
        pool,
        actor,
        "add_admin",
        Some(target),
        &format!("admin: {} -> {}", before.is_admin, after.is_admin),
    )
    .await?;

    Ok(after)
}

/// Revoke the admin flag. Super admin only, and never from themselves.
pub async fn remove_admin(
    pool: &DbPool,
    config: &Config,
    actor: PrincipalId,
    target: PrincipalId,
) -> Result<User, ShopError> {
    require_super_admin(config, actor)?;

    if target == actor {
        return Err(ShopError::InvalidInput(
            "You cannot remove yourself".to_string(),
        ));
    }

    let before = ledger_service::require(pool, target).await?;
    if !before.is_admin {
        return Err(ShopError::InvalidInput(format!(
            "{} is not an admin",
            before.display_name()
        )));
    }

    let after = ledger_service::set_admin(pool, target, false, None).await?;

    audit_service::record(
        pool,
        actor,
        "remove_admin",
        Some(target),
        &format!("admin: {} -> {}", before.is_admin, after.is_admin),
    )
    .await?;

    Ok(after)
}

/// Repoint a payment method's destination.
pub async fn set_destination(
    pool: &DbPool,
    actor: PrincipalId,
    method: &str,
    destination: &str,
) -> Result<String, ShopError> {
    require_admin(pool, actor).await?;

    let old = catalog_service::set_destination(pool, method, destination).await?;

    audit_service::record(
        pool,
        actor,
        "set_dest",
        None,
        &format!("{method}: '{old}' -> '{destination}'"),
    )
    .await?;

    Ok(old)
}

/// Swap the QR attachment shown for a payment method.
pub async fn set_qr(
    pool: &DbPool,
    actor: PrincipalId,
    method: &str,
    qr: &str,
) -> Result<Option<String>, ShopError> {
    require_admin(pool, actor).await?;

    let old = catalog_service::set_qr(pool, method, qr).await?;

    let detail = match &old {
        Some(old) => format!("{method}: replaced QR '{old}'"),
        None => format!("{method}: QR set"),
    };
    audit_service::record(pool, actor, "set_qr", None, &detail).await?;

    Ok(old)
}

/// Approve a pending payment on an admin's behalf.
pub async fn approve_transaction(
    pool: &DbPool,
    actor: PrincipalId,
    id: TxId,
) -> Result<approval_service::Approval, ShopError> {
    require_admin(pool, actor).await?;

    let approval = approval_service::approve(pool, actor, id).await?;

    audit_service::record(
        pool,
        actor,
        "approve",
        Some(approval.record.user_id),
        &format!(
            "#{} ₹{} {}: {} -> {}",
            approval.record.id,
            approval.record.amount,
            approval.record.payment_method,
            TxStatus::Pending,
            approval.record.status
        ),
    )
    .await?;

    Ok(approval)
}

/// Pre-flight for a rejection: gate the actor and confirm the record
/// is still pending. No audit entry until the rejection lands.
pub async fn begin_reject_transaction(
    pool: &DbPool,
    actor: PrincipalId,
    id: TxId,
) -> Result<Transaction, ShopError> {
    require_admin(pool, actor).await?;

    approval_service::begin_reject(pool, id).await
}

/// Reject a pending payment with a reason on an admin's behalf.
pub async fn reject_transaction(
    pool: &DbPool,
    actor: PrincipalId,
    id: TxId,
    reason: &str,
) -> Result<Transaction, ShopError> {
    require_admin(pool, actor).await?;

    let record = approval_service::reject(pool, actor, id, reason).await?;

    audit_service::record(
        pool,
        actor,
        "reject",
        Some(record.user_id),
        &format!(
            "#{} ₹{} {}: {} -> {} ({reason})",
            record.id,
            record.amount,
            record.payment_method,
            TxStatus::Pending,
            record.status
        ),
    )
    .await?;

    Ok(record)
}

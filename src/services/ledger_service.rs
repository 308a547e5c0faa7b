//! Ledger store - one row per principal with balance, block state and
//! admin flag. Enrollment is idempotent and balances can never go
//! negative; the debit guard lives in the UPDATE itself.

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::user::{PrincipalId, User};

/// Look a principal up by id.
pub async fn get(pool: &DbPool, id: PrincipalId) -> Result<Option<User>, ShopError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Look a principal up by id, erroring when absent.
pub async fn require(pool: &DbPool, id: PrincipalId) -> Result<User, ShopError> {
    get(pool, id).await?.ok_or(ShopError::UserNotFound(id))
}

/// Fetch the ledger row for the principal, enrolling them on first
/// contact.
///
/// # Process
///
/// 1. Fast path: the row already exists
/// 2. Insert with a fresh alias, zero balance and the bootstrap admin
///    flag from configuration
/// 3. `INSERT OR IGNORE` absorbs a concurrent enrollment of the same
///    principal; an alias collision retries with a new alias
pub async fn get_or_create(
    pool: &DbPool,
    config: &Config,
    id: PrincipalId,
    handle: Option<&str>,
) -> Result<User, ShopError> {
    if let Some(user) = get(pool, id).await? {
        return Ok(user);
    }

    let is_admin = config.is_bootstrap_admin(id);

    for _ in 0..2 {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (id, handle, alias, balance, is_admin, created_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(handle)
        .bind(generate_alias())
        .bind(is_admin)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        if let Some(user) = get(pool, id).await? {
            return Ok(user);
        }
    }

    // Both attempts hit an alias collision without anyone else
    // enrolling this id either; astronomically unlikely.
    Err(ShopError::UserNotFound(id))
}

/// Short uppercase display alias for principals without a handle.
fn generate_alias() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Apply a signed delta to a balance, refusing to go below zero.
///
/// The guard rides in the WHERE clause, so a concurrent debit can
/// never overdraw: whichever statement runs second sees the already
/// reduced balance.
///
/// # Errors
///
/// - `UserNotFound`: no such principal
/// - `InsufficientBalance`: the delta would take the balance negative
pub async fn adjust_balance(pool: &DbPool, id: PrincipalId, delta: i64) -> Result<i64, ShopError> {
    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET balance = balance + ?1
        WHERE id = ?2 AND balance + ?1 >= 0
        RETURNING balance
        "#,
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match new_balance {
        Some(balance) => Ok(balance),
        None => {
            let user = require(pool, id).await?;
            Err(ShopError::InsufficientBalance {
                required: -delta,
                available: user.balance,
            })
        }
    }
}

/// Block or unblock a principal, recording why and when.
///
/// Unblocking clears the reason and timestamp along with the flag.
pub async fn set_blocked(
    pool: &DbPool,
    id: PrincipalId,
    blocked: bool,
    reason: Option<&str>,
) -> Result<User, ShopError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_blocked = ?1, blocked_reason = ?2, blocked_at = ?3
        WHERE id = ?4
        RETURNING *
        "#,
    )
    .bind(blocked)
    .bind(if blocked { reason } else { None })
    .bind(if blocked { Some(Utc::now()) } else { None })
    .bind(id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(ShopError::UserNotFound(id))
}

/// Grant or revoke the admin flag, remembering who granted it.
pub async fn set_admin(
    pool: &DbPool,
    id: PrincipalId,
    is_admin: bool,
    added_by: Option<PrincipalId>,
) -> Result<User, ShopError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET is_admin = ?1, added_by = ?2
        WHERE id = ?3
        RETURNING *
        "#,
    )
    .bind(is_admin)
    .bind(if is_admin { added_by } else { None })
    .bind(id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(ShopError::UserNotFound(id))
}

/// All principals currently carrying the admin flag.
pub async fn admins(pool: &DbPool) -> Result<Vec<User>, ShopError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE is_admin = 1 ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

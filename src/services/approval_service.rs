//! Approval state machine for pending payments.
//!
//! A pending record is decided exactly once: the status flip is a
//! guarded UPDATE, so when two admins race only the first one wins and
//! the balance is credited a single time.

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::transaction::{Transaction, TxId, TxStatus};
use crate::models::user::PrincipalId;

/// Outcome of an approval: the decided record and the credited balance.
#[derive(Debug)]
pub struct Approval {
    pub record: Transaction,
    pub new_balance: i64,
}

/// Fetch one ledger record by id.
pub async fn get(pool: &DbPool, id: TxId) -> Result<Option<Transaction>, ShopError> {
    let record = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Translate a failed status-flip guard into the precise error: the
/// record either does not exist or was already decided.
async fn decision_conflict(pool: &DbPool, id: TxId) -> ShopError {
    match get(pool, id).await {
        Ok(Some(record)) => ShopError::AlreadyDecided {
            id,
            status: record.status,
        },
        Ok(None) => ShopError::TxNotFound(id),
        Err(err) => err,
    }
}

/// Approve a pending payment and credit the amount to its owner.
///
/// # Process
///
/// 1. Open a transaction
/// 2. Guarded flip pending -> approved; a failed guard means the
///    record is gone or already decided
/// 3. Credit the owner's balance
/// 4. Commit; approval never touches the key inventory
///
/// # Errors
///
/// - `TxNotFound`: no record with this id
/// - `AlreadyDecided`: the record left pending before we got there
/// - `UserNotFound`: the record's owner vanished (credit rolled back)
pub async fn approve(pool: &DbPool, admin: PrincipalId, id: TxId) -> Result<Approval, ShopError> {
    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'approved', decided_by = ?1
        WHERE id = ?2 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(admin)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(record) = record else {
        tx.rollback().await?;
        return Err(decision_conflict(pool, id).await);
    };

    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET balance = balance + ?1
        WHERE id = ?2
        RETURNING balance
        "#,
    )
    .bind(record.amount)
    .bind(record.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(new_balance) = new_balance else {
        tx.rollback().await?;
        return Err(ShopError::UserNotFound(record.user_id));
    };

    tx.commit().await?;

    Ok(Approval {
        record,
        new_balance,
    })
}

/// Check that a record can still be rejected before asking the admin
/// for a reason.
///
/// Purely a pre-flight read; the guarded UPDATE in [`reject`] is what
/// actually enforces exactly-once.
///
/// # Errors
///
/// - `TxNotFound`: no record with this id
/// - `AlreadyDecided`: already approved or rejected
pub async fn begin_reject(pool: &DbPool, id: TxId) -> Result<Transaction, ShopError> {
    let record = get(pool, id).await?.ok_or(ShopError::TxNotFound(id))?;

    if record.status != TxStatus::Pending {
        return Err(ShopError::AlreadyDecided {
            id,
            status: record.status,
        });
    }

    Ok(record)
}

/// Reject a pending payment with a reason. The owner's balance is
/// never touched.
///
/// # Errors
///
/// - `TxNotFound`: no record with this id
/// - `AlreadyDecided`: the record left pending before we got there
pub async fn reject(
    pool: &DbPool,
    admin: PrincipalId,
    id: TxId,
    reason: &str,
) -> Result<Transaction, ShopError> {
    let record = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = 'rejected', decided_by = ?1, reject_reason = ?2
        WHERE id = ?3 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(admin)
    .bind(reason)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match record {
        Some(record) => Ok(record),
        None => Err(decision_conflict(pool, id).await),
    }
}

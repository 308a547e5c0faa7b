//! Commerce engine - the balance purchase path and payment
//! submissions.
//!
//! A balance purchase is all-or-nothing: debit, key allocation,
//! receipt and the approved ledger record either all land or none do.

use chrono::Utc;

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::key::{Key, Tier, UserKey};
use crate::models::transaction::{Transaction, METHOD_BALANCE};
use crate::models::user::PrincipalId;
use crate::services::ledger_service;

/// Smallest top-up the shop accepts.
pub const MIN_TOP_UP: i64 = 100;

/// Everything a completed balance purchase produced.
#[derive(Debug)]
pub struct BalancePurchase {
    pub key: Key,
    pub receipt: UserKey,
    pub record: Transaction,
    pub new_balance: i64,
}

/// Buy a key outright with shop balance.
///
/// # Process
///
/// 1. Open a transaction
/// 2. Guarded debit: only succeeds if the buyer is unblocked and can
///    afford the price; a failed guard rolls back and reports exactly
///    why
/// 3. Allocate the oldest available key of the tier inside the same
///    transaction
/// 4. Write the receipt and an already-approved ledger record
/// 5. Commit; any error before that point unwinds every step
///
/// # Errors
///
/// - `UserNotFound`: buyer is not enrolled
/// - `Blocked`: buyer is blocked from purchasing
/// - `InsufficientBalance`: price exceeds the buyer's balance
/// - `OutOfStock`: no available key of this tier (debit rolled back)
pub async fn purchase_with_balance(
    pool: &DbPool,
    buyer: PrincipalId,
    tier: Tier,
    price: i64,
) -> Result<BalancePurchase, ShopError> {
    if price <= 0 {
        return Err(ShopError::InvalidInput(
            "Price must be a positive amount".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Debit first: the guard folds the block check and the affordability
    // check into one statement, so the balance can never go negative and
    // a blocked buyer never reaches allocation.
    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET balance = balance - ?1
        WHERE id = ?2 AND is_blocked = 0 AND balance >= ?1
        RETURNING balance
        "#,
    )
    .bind(price)
    .bind(buyer)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(new_balance) = new_balance else {
        tx.rollback().await?;
        let user = ledger_service::require(pool, buyer).await?;
        if user.is_blocked {
            return Err(ShopError::Blocked {
                reason: user.blocked_reason,
            });
        }
        return Err(ShopError::InsufficientBalance {
            required: price,
            available: user.balance,
        });
    };

    // Same guarded allocation the inventory uses, bound to this
    // transaction so an empty shelf unwinds the debit.
    let key = sqlx::query_as::<_, Key>(
        r#"
        UPDATE keys
        SET status = 'used', used_by = ?1, used_at = ?2
        WHERE id = (
            SELECT id FROM keys
            WHERE tier = ?3 AND status = 'available'
            ORDER BY id
            LIMIT 1
        )
        AND status = 'available'
        RETURNING *
        "#,
    )
    .bind(buyer)
    .bind(Utc::now())
    .bind(tier)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(key) = key else {
        tx.rollback().await?;
        return Err(ShopError::OutOfStock(tier));
    };

    let receipt = sqlx::query_as::<_, UserKey>(
        r#"
        INSERT INTO user_keys (user_id, key_value, tier, status, purchased_at)
        VALUES (?1, ?2, ?3, 'active', ?4)
        RETURNING *
        "#,
    )
    .bind(buyer)
    .bind(&key.value)
    .bind(tier)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    // Balance purchases settle instantly, so the record is born approved
    // with no deciding admin.
    let record = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, amount, payment_method, status, created_at)
        VALUES (?1, ?2, ?3, 'approved', ?4)
        RETURNING *
        "#,
    )
    .bind(buyer)
    .bind(price)
    .bind(METHOD_BALANCE)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(BalancePurchase {
        key,
        receipt,
        record,
        new_balance,
    })
}

/// Record a pending external payment awaiting admin review.
///
/// Nothing about the buyer's ledger changes here; only an approval
/// credits the balance.
///
/// # Errors
///
/// - `InvalidInput`: non-positive amount
pub async fn submit_payment(
    pool: &DbPool,
    principal: PrincipalId,
    amount: i64,
    method: &str,
    evidence: Option<&str>,
) -> Result<Transaction, ShopError> {
    if amount <= 0 {
        return Err(ShopError::InvalidInput(
            "Amount must be a positive number".to_string(),
        ));
    }

    let record = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, amount, payment_method, evidence, status, created_at)
        VALUES (?1, ?2, ?3, ?4, 'pending', ?5)
        RETURNING *
        "#,
    )
    .bind(principal)
    .bind(amount)
    .bind(method)
    .bind(evidence)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// All pending ledger records, oldest first, for the admin queue.
pub async fn pending(pool: &DbPool) -> Result<Vec<Transaction>, ShopError> {
    let records = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE status = 'pending' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

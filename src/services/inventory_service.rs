//! Inventory store - the pool of sellable keys and their lifecycle.
//!
//! Keys are unique case-insensitively but stored with their original
//! casing. A key moves available -> used exactly once; allocation is a
//! single guarded UPDATE, so two concurrent buyers can never be handed
//! the same key.

use chrono::Utc;

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::key::{Key, Tier};
use crate::models::user::PrincipalId;

/// Insert a new sellable key with status `available`.
///
/// # Process
///
/// 1. Trim the ends; interior whitespace is part of the key and is
///    stored exactly as sent
/// 2. Case-insensitive duplicate lookup for a precise report
/// 3. Insert; the unique NOCASE index backs the lookup up against a
///    concurrent insert of the same key in different casing
///
/// # Errors
///
/// - `InvalidInput`: the value is empty
/// - `DuplicateKey`: a case-insensitive match exists (reports the stored casing)
pub async fn add_key(pool: &DbPool, value: &str, tier: Tier) -> Result<Key, ShopError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShopError::InvalidInput(
            "A key value cannot be empty".to_string(),
        ));
    }

    // Friendly duplicate report carrying the exact stored casing
    if let Some(existing) = find_key(pool, value).await? {
        return Err(ShopError::DuplicateKey {
            existing: existing.value,
        });
    }

    let inserted = sqlx::query_as::<_, Key>(
        r#"
        INSERT INTO keys (value, tier, status, created_at)
        VALUES (?1, ?2, 'available', ?3)
        RETURNING *
        "#,
    )
    .bind(value)
    .bind(tier)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(key) => Ok(key),
        // Lost a race with another insert differing at most in casing
        Err(sqlx::Error::Database(db_err))
            if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
        {
            let existing = find_key(pool, value)
                .await?
                .map(|key| key.value)
                .unwrap_or_else(|| value.to_string());
            Err(ShopError::DuplicateKey { existing })
        }
        Err(err) => Err(err.into()),
    }
}

/// Case-insensitive lookup returning the stored row, exact casing intact.
pub async fn find_key(pool: &DbPool, value: &str) -> Result<Option<Key>, ShopError> {
    let key = sqlx::query_as::<_, Key>("SELECT * FROM keys WHERE value = ?1 COLLATE NOCASE")
        .bind(value)
        .fetch_optional(pool)
        .await?;

    Ok(key)
}

/// Remove a key from the inventory regardless of its status.
///
/// Returns the deleted row so the caller can report the exact stored
/// value and whether it had already been sold.
///
/// # Errors
///
/// - `KeyNotFound`: nothing matches, even case-insensitively
pub async fn delete_key(pool: &DbPool, value: &str) -> Result<Key, ShopError> {
    sqlx::query_as::<_, Key>("DELETE FROM keys WHERE value = ?1 COLLATE NOCASE RETURNING *")
        .bind(value)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ShopError::KeyNotFound(value.to_string()))
}

/// Atomically take one available key of the tier, oldest first.
///
/// The subselect picks the candidate and the status guard keeps the
/// update exact: the whole statement executes under the database's
/// write lock, so at most one caller can flip any given key to used.
///
/// # Errors
///
/// - `OutOfStock`: no available key of this tier remains
pub async fn allocate_one(
    pool: &DbPool,
    tier: Tier,
    consumer: PrincipalId,
) -> Result<Key, ShopError> {
    sqlx::query_as::<_, Key>(
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
    .bind(consumer)
    .bind(Utc::now())
    .bind(tier)
    .fetch_optional(pool)
    .await?
    .ok_or(ShopError::OutOfStock(tier))
}

/// Count of available keys for one tier.
pub async fn available_count(pool: &DbPool, tier: Tier) -> Result<i64, ShopError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM keys WHERE tier = ?1 AND status = 'available'")
            .bind(tier)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Available-key counts for every tier, zero-filled so callers always
/// see the whole catalog.
pub async fn stock_counts(pool: &DbPool) -> Result<Vec<(Tier, i64)>, ShopError> {
    let mut counts: Vec<(Tier, i64)> = Tier::ALL.iter().map(|tier| (*tier, 0)).collect();

    let rows = sqlx::query_as::<_, (Tier, i64)>(
        "SELECT tier, COUNT(*) FROM keys WHERE status = 'available' GROUP BY tier",
    )
    .fetch_all(pool)
    .await?;

    for (tier, count) in rows {
        if let Some(slot) = counts.iter_mut().find(|(t, _)| *t == tier) {
            slot.1 = count;
        }
    }

    Ok(counts)
}

/// Every key in the inventory, grouped for the admin stock report.
pub async fn list_all(pool: &DbPool) -> Result<Vec<Key>, ShopError> {
    let keys = sqlx::query_as::<_, Key>("SELECT * FROM keys ORDER BY tier, status, id")
        .fetch_all(pool)
        .await?;

    Ok(keys)
}

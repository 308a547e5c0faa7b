//! Catalog - tier prices and payment method details, with built-in
//! defaults that admin overrides shadow through the settings table.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::ShopError;
use crate::models::key::Tier;

/// A way to pay: where to send money and an optional QR attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub destination: String,
    #[serde(default)]
    pub qr: Option<String>,
}

/// The methods every deployment starts with. Overrides persist per
/// method id, so a fresh database still quotes something sensible.
fn builtin_methods() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod {
            id: "easypaisa".to_string(),
            name: "EasyPaisa".to_string(),
            destination: "03001234567".to_string(),
            qr: None,
        },
        PaymentMethod {
            id: "binance".to_string(),
            name: "Binance".to_string(),
            destination: "12345678".to_string(),
            qr: None,
        },
        PaymentMethod {
            id: "upi".to_string(),
            name: "UPI".to_string(),
            destination: "shop@upi".to_string(),
            qr: None,
        },
    ]
}

fn default_price(tier: Tier) -> i64 {
    match tier {
        Tier::ThreeDay => 280,
        Tier::TenDay => 560,
        Tier::ThirtyDay => 1250,
    }
}

async fn setting(pool: &DbPool, key: &str) -> Result<Option<String>, ShopError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

async fn put_setting(pool: &DbPool, key: &str, value: &str) -> Result<(), ShopError> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE
        SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Current price of a tier: the persisted override if one exists,
/// otherwise the built-in default.
pub async fn price(pool: &DbPool, tier: Tier) -> Result<i64, ShopError> {
    let key = format!("price_{}", tier.as_str());
    match setting(pool, &key).await? {
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            // Unparseable override falls back rather than bricking the shop
            _ => Ok(default_price(tier)),
        },
        None => Ok(default_price(tier)),
    }
}

/// Persist a new price for a tier, returning the price it replaced.
///
/// # Errors
///
/// - `InvalidInput`: price is zero or negative
pub async fn set_price(pool: &DbPool, tier: Tier, new_price: i64) -> Result<i64, ShopError> {
    if new_price <= 0 {
        return Err(ShopError::InvalidInput(
            "Price must be a positive amount".to_string(),
        ));
    }

    let old = price(pool, tier).await?;
    let key = format!("price_{}", tier.as_str());
    put_setting(pool, &key, &new_price.to_string()).await?;

    Ok(old)
}

/// Every tier with its current price, in catalog order.
pub async fn products(pool: &DbPool) -> Result<Vec<(Tier, i64)>, ShopError> {
    let mut listing = Vec::with_capacity(Tier::ALL.len());
    for tier in Tier::ALL {
        listing.push((tier, price(pool, tier).await?));
    }

    Ok(listing)
}

/// All payment methods with any persisted overrides applied.
pub async fn payment_methods(pool: &DbPool) -> Result<Vec<PaymentMethod>, ShopError> {
    let mut methods = builtin_methods();
    for method in &mut methods {
        let key = format!("payment_method_{}", method.id);
        if let Some(raw) = setting(pool, &key).await? {
            *method = serde_json::from_str(&raw)?;
        }
    }

    Ok(methods)
}

/// One payment method by id.
///
/// # Errors
///
/// - `InvalidInput`: no method with this id exists
pub async fn payment_method(pool: &DbPool, id: &str) -> Result<PaymentMethod, ShopError> {
    payment_methods(pool)
        .await?
        .into_iter()
        .find(|method| method.id == id)
        .ok_or_else(|| ShopError::InvalidInput(format!("Unknown payment method '{id}'")))
}

/// Point a payment method at a new account or address, returning the
/// destination it replaced.
pub async fn set_destination(
    pool: &DbPool,
    id: &str,
    destination: &str,
) -> Result<String, ShopError> {
    if destination.is_empty() {
        return Err(ShopError::InvalidInput(
            "Destination cannot be empty".to_string(),
        ));
    }

    let mut method = payment_method(pool, id).await?;
    let old = std::mem::replace(&mut method.destination, destination.to_string());

    let key = format!("payment_method_{}", method.id);
    put_setting(pool, &key, &serde_json::to_string(&method)?).await?;

    Ok(old)
}

/// Attach (or replace) the QR image shown with a payment method,
/// returning the previous attachment if there was one.
pub async fn set_qr(
    pool: &DbPool,
    id: &str,
    qr: &str,
) -> Result<Option<String>, ShopError> {
    let mut method = payment_method(pool, id).await?;
    let old = method.qr.replace(qr.to_string());

    let key = format!("payment_method_{}", method.id);
    put_setting(pool, &key, &serde_json::to_string(&method)?).await?;

    Ok(old)
}

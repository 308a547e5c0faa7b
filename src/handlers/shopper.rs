//! Buyer-facing commands: enrollment, browsing, balance and receipts.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::error::ShopError;
use crate::handlers::selections;
use crate::models::user::User;
use crate::router::Cmd;
use crate::services::{catalog_service, inventory_service, stats_service};
use crate::shop::Shop;
use crate::transport::Reply;

/// `/start` - greet the principal and list what the shop can do.
///
/// Enrollment already happened at dispatch, so this only renders the
/// welcome card with the caller's id, balance and the command list.
pub async fn start(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    let mut text = format!(
        "🎉 Welcome to the Key Shop!\n\n\
         🆔 Your ID: {}\n\
         💰 Balance: ₹{}\n\n\
         🛒 /buy - Browse keys\n\
         💰 /balance - Check your balance\n\
         🔑 /mykeys - Keys you own\n\
         ❌ /cancel - Abort the current action",
        user.id, user.balance
    );

    if user.is_admin {
        text.push_str("\n🛠 /admin - Admin panel");
    }

    if let Some(contact) = &shop.config.contact_handle {
        text.push_str(&format!("\n\n📞 Support: {contact}"));
    }
    if let Some(channel) = &shop.config.channel_handle {
        text.push_str(&format!("\n📢 Updates: {channel}"));
    }

    Ok(Reply::text(text))
}

/// `/buy` - the product listing with live stock and a button per tier.
pub async fn buy(shop: Arc<Shop>, _user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    let products = catalog_service::products(&shop.pool).await?;
    let stock = inventory_service::stock_counts(&shop.pool).await?;

    let text = format!(
        "🛒 Available Keys\n\n{}\n\nPick one below:",
        crate::text::product_lines(&products, &stock)
    );

    Ok(Reply::text(text).with_menu(selections::product_menu(&products)))
}

/// `/balance` - current balance with a pointer to the top-up flow.
pub async fn balance(_shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    Ok(Reply::text(format!(
        "💰 Your balance: ₹{}\n\nUse /buy and pick 'Add Balance' to top up.",
        user.balance
    )))
}

/// `/mykeys` - every key the principal bought, with a display-only
/// expiry derived from purchase time and tier duration.
pub async fn my_keys(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    let receipts = stats_service::receipts_for(&shop.pool, user.id).await?;

    if receipts.is_empty() {
        return Ok(Reply::text(
            "🔑 You don't own any keys yet.\n\nUse /buy to get one!",
        ));
    }

    let now = Utc::now();
    let lines = receipts
        .iter()
        .map(|receipt| {
            let expires =
                receipt.purchased_at + Duration::days(i64::from(receipt.tier.duration_days()));
            let state = if now > expires { "expired" } else { "active" };
            format!(
                "🔑 `{}`\n   {} · {} · expires {}",
                receipt.key_value,
                receipt.tier.display_name(),
                state,
                expires.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(Reply::text(format!("🔑 Your Keys\n\n{lines}")))
}

/// `/cancel` - drop whatever flow is in progress.
pub async fn cancel(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if shop.sessions.cancel(user.id) {
        Ok(Reply::text("❌ Cancelled. Use /buy to start over."))
    } else {
        Ok(Reply::text("Nothing to cancel."))
    }
}

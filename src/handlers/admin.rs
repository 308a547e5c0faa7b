//! Admin panel commands: inventory, pricing, payment setup, user
//! management and the shop dashboard.
//!
//! Mutations go through the gated services, which audit every change.
//! Read-only panels gate on the admin flag resolved at dispatch.

use std::sync::Arc;

use crate::error::ShopError;
use crate::models::key::{KeyStatus, Tier};
use crate::models::user::{PrincipalId, User};
use crate::router::Cmd;
use crate::services::{
    admin_service, catalog_service, inventory_service, ledger_service, purchase_service,
    stats_service,
};
use crate::session::Intent;
use crate::shop::Shop;
use crate::transport::{AttachmentRef, Reply};

fn parse_principal(raw: &str, usage: &str) -> Result<PrincipalId, ShopError> {
    raw.trim()
        .parse::<i64>()
        .map(PrincipalId)
        .map_err(|_| ShopError::InvalidInput(format!("Usage: {usage}")))
}

fn parse_tier(raw: &str, usage: &str) -> Result<Tier, ShopError> {
    Tier::parse(raw).ok_or_else(|| ShopError::InvalidInput(format!("Usage: {usage}")))
}

/// `/admin` - the command reference, super-admin extras included.
pub async fn panel(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let mut text = "🛠 Admin Panel\n\n\
         📦 Inventory\n\
         /stock - Stock report\n\
         /addkey_<3d|10d|30d> <key> - Add a key\n\
         /delkey <key> - Remove a key\n\n\
         💰 Pricing & Payments\n\
         /price_<3d|10d|30d> <amount> - Change a price\n\
         /setdest <method> <destination> - Payment destination\n\
         /setqr <method> - Attach a QR photo\n\n\
         👥 Users\n\
         /block <id> [reason] - Block a user\n\
         /unblock <id> - Unblock a user\n\
         /userinfo <id> - Inspect a user\n\
         /listadmins - Admin roster\n\n\
         🧾 Payments\n\
         /pending - Pending payments\n\
         /approve_<id> - Approve a payment\n\
         /reject_<id> - Reject a payment\n\n\
         📊 /stats - Shop stats"
        .to_string();

    if shop.config.is_super_admin(user.id) {
        text.push_str(
            "\n\n👑 Super Admin\n\
             /addadmin <id> - Grant admin\n\
             /removeadmin <id> - Revoke admin",
        );
    }

    Ok(Reply::text(text))
}

/// `/stock` - every key per tier with its value and status.
pub async fn stock(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let keys = inventory_service::list_all(&shop.pool).await?;

    let mut text = "📦 Stock Report\n".to_string();
    for tier in Tier::ALL {
        let of_tier: Vec<_> = keys.iter().filter(|key| key.tier == tier).collect();
        let available = of_tier
            .iter()
            .filter(|key| key.status == KeyStatus::Available)
            .count();

        text.push_str(&format!(
            "\n{}: {} available\n",
            tier.display_name(),
            available
        ));
        for key in of_tier {
            text.push_str(&format!(
                "  • `{}` - {} ({})\n",
                key.value,
                key.status,
                key.created_at.format("%Y-%m-%d")
            ));
        }
    }

    Ok(Reply::text(text.trim_end().to_string()))
}

/// `/stats` - the shop dashboard.
pub async fn stats(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let stats = stats_service::shop_stats(&shop.pool).await?;

    let stock_lines = stats
        .stock
        .iter()
        .map(|(tier, count)| format!("{}: {}", tier.display_name(), count))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Reply::text(format!(
        "📊 Shop Stats\n\n\
         👥 Users: {} ({} blocked)\n\
         🛠 Admins: {}\n\
         ⏳ Pending payments: {}\n\
         💰 Revenue (approved): ₹{}\n\
         📅 Today: ₹{}\n\n\
         📦 Stock\n{}",
        stats.total_users,
        stats.blocked_users,
        stats.admin_count,
        stats.pending_transactions,
        stats.approved_revenue,
        stats.revenue_today,
        stock_lines
    )))
}

/// `/addkey_<tier> <key>` - add one sellable key.
pub async fn add_key(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    const USAGE: &str = "/addkey_<3d|10d|30d> <key>";

    let tier = parse_tier(cmd.suffix("addkey_").unwrap_or_default(), USAGE)?;
    let value = cmd.args.trim();
    if value.is_empty() {
        return Err(ShopError::InvalidInput(format!("Usage: {USAGE}")));
    }

    let key = admin_service::add_key(&shop.pool, user.id, value, tier).await?;
    let count = inventory_service::available_count(&shop.pool, tier).await?;

    Ok(Reply::text(format!(
        "✅ Added {} key `{}`.\n📦 {} now available.",
        tier.display_name(),
        key.value,
        count
    )))
}

/// `/delkey <key>` - remove a key, sold or not.
pub async fn delete_key(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let value = cmd.args.trim();
    if value.is_empty() {
        return Err(ShopError::InvalidInput("Usage: /delkey <key>".to_string()));
    }

    let key = admin_service::delete_key(&shop.pool, user.id, value).await?;

    Ok(Reply::text(format!(
        "🗑 Removed {} key `{}` (was {}).",
        key.tier.display_name(),
        key.value,
        key.status
    )))
}

/// `/price_<tier> <amount>` - change a tier's price.
pub async fn set_price(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    const USAGE: &str = "/price_<3d|10d|30d> <amount>";

    let tier = parse_tier(cmd.suffix("price_").unwrap_or_default(), USAGE)?;
    let new_price: i64 = cmd
        .args
        .trim()
        .parse()
        .map_err(|_| ShopError::InvalidInput(format!("Usage: {USAGE}")))?;

    let old = admin_service::set_price(&shop.pool, user.id, tier, new_price).await?;

    Ok(Reply::text(format!(
        "💰 {}: ₹{} -> ₹{}",
        tier.display_name(),
        old,
        new_price
    )))
}

/// `/block <id> [reason]` - block a principal and tell them why.
pub async fn block(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    const USAGE: &str = "/block <id> [reason]";

    let mut parts = cmd.args.trim().splitn(2, char::is_whitespace);
    let target = parse_principal(parts.next().unwrap_or_default(), USAGE)?;
    let reason = parts.next().map(str::trim).filter(|r| !r.is_empty());

    let blocked = admin_service::block_user(&shop.pool, user.id, target, reason).await?;

    shop.notify(
        target,
        &format!(
            "🚫 You have been blocked from this shop.\nReason: {}",
            reason.unwrap_or("No reason provided")
        ),
    )
    .await;

    Ok(Reply::text(format!(
        "🚫 Blocked {} ({}).",
        blocked.display_name(),
        blocked.id
    )))
}

/// `/unblock <id>` - lift a block.
pub async fn unblock(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let target = parse_principal(&cmd.args, "/unblock <id>")?;

    let unblocked = admin_service::unblock_user(&shop.pool, user.id, target).await?;

    shop.notify(target, "✅ You have been unblocked. Welcome back!")
        .await;

    Ok(Reply::text(format!(
        "✅ Unblocked {} ({}).",
        unblocked.display_name(),
        unblocked.id
    )))
}

/// `/userinfo <id>` - one principal's profile, totals and keys.
pub async fn user_info(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let target = parse_principal(&cmd.args, "/userinfo <id>")?;
    let report = stats_service::user_report(&shop.pool, target).await?;
    let receipts = stats_service::receipts_for(&shop.pool, target).await?;

    let blocked = if report.user.is_blocked {
        format!(
            "yes ({})",
            report.user.blocked_reason.as_deref().unwrap_or("no reason")
        )
    } else {
        "no".to_string()
    };

    let mut text = format!(
        "👤 {} ({})\n\
         💰 Balance: ₹{}\n\
         🚫 Blocked: {}\n\
         🛠 Admin: {}\n\
         💵 Approved top-ups: ₹{}\n\
         🧾 Transactions: {}\n\
         📅 First seen: {}\n\
         🔑 Keys owned: {}",
        report.user.display_name(),
        report.user.id,
        report.user.balance,
        blocked,
        if report.user.is_admin { "yes" } else { "no" },
        report.approved_top_ups,
        report.transaction_count,
        report.user.created_at.format("%Y-%m-%d"),
        report.keys_owned
    );
    for receipt in &receipts {
        text.push_str(&format!(
            "\n   • {} ({}, {})",
            receipt.key_value,
            receipt.tier.display_name(),
            receipt.purchased_at.format("%Y-%m-%d")
        ));
    }

    Ok(Reply::text(text))
}

/// `/pending` - the queue of payments awaiting review.
pub async fn pending_queue(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let records = purchase_service::pending(&shop.pool).await?;

    if records.is_empty() {
        return Ok(Reply::text("✅ No pending payments."));
    }

    let lines = records
        .iter()
        .map(|record| {
            format!(
                "#{} ₹{} via {} from user {}\n/approve_{} or /reject_{}",
                record.id,
                record.amount,
                record.payment_method,
                record.user_id,
                record.id,
                record.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(Reply::text(format!("⏳ Pending Payments\n\n{lines}")))
}

/// `/setdest <method> <destination>` - repoint a payment method.
pub async fn set_destination(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    const USAGE: &str = "/setdest <method> <destination>";

    let mut parts = cmd.args.trim().splitn(2, char::is_whitespace);
    let method = parts.next().unwrap_or_default().to_lowercase();
    let destination = parts.next().map(str::trim).unwrap_or_default();
    if method.is_empty() || destination.is_empty() {
        return Err(ShopError::InvalidInput(format!("Usage: {USAGE}")));
    }

    let old = admin_service::set_destination(&shop.pool, user.id, &method, destination).await?;

    Ok(Reply::text(format!(
        "📮 {method}: '{old}' -> '{destination}'"
    )))
}

/// `/setqr <method>` - first half of a QR update: remember which
/// method, then wait for the photo.
pub async fn set_qr(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let method_id = cmd.args.trim().to_lowercase();
    if method_id.is_empty() {
        return Err(ShopError::InvalidInput("Usage: /setqr <method>".to_string()));
    }

    // Resolve now so a typo fails before the admin uploads anything
    let method = catalog_service::payment_method(&shop.pool, &method_id).await?;

    shop.sessions
        .begin(user.id, Intent::AwaitingQrPhoto { method: method.id });

    Ok(Reply::text(format!(
        "📷 Send the QR photo for {} now.\nUse /cancel to abort.",
        method.name
    )))
}

/// A photo while `AwaitingQrPhoto`: second half of the QR update.
pub async fn qr_photo(
    shop: Arc<Shop>,
    user: User,
    attachment: AttachmentRef,
) -> Result<Reply, ShopError> {
    let Some(Intent::AwaitingQrPhoto { method }) = shop.sessions.take(user.id) else {
        return Ok(Reply::text("Nothing to attach right now."));
    };

    let old = admin_service::set_qr(&shop.pool, user.id, &method, &attachment.0).await?;

    let text = match old {
        Some(_) => format!("✅ QR for {method} replaced."),
        None => format!("✅ QR for {method} set."),
    };
    Ok(Reply::text(text))
}

/// `/addadmin <id>` - grant the admin flag. Super admin only.
pub async fn add_admin(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let target = parse_principal(&cmd.args, "/addadmin <id>")?;

    let admin =
        admin_service::add_admin(&shop.pool, &shop.config, user.id, target).await?;

    shop.notify(target, "🛠 You are now an admin of this shop.")
        .await;

    Ok(Reply::text(format!(
        "✅ {} ({}) is now an admin.",
        admin.display_name(),
        admin.id
    )))
}

/// `/removeadmin <id>` - revoke the admin flag. Super admin only.
pub async fn remove_admin(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let target = parse_principal(&cmd.args, "/removeadmin <id>")?;

    let removed =
        admin_service::remove_admin(&shop.pool, &shop.config, user.id, target).await?;

    shop.notify(target, "Your admin access has been removed.").await;

    Ok(Reply::text(format!(
        "✅ {} ({}) is no longer an admin.",
        removed.display_name(),
        removed.id
    )))
}

/// `/listadmins` - the roster, with edit hints for the super admin.
pub async fn list_admins(shop: Arc<Shop>, user: User, _cmd: Cmd) -> Result<Reply, ShopError> {
    if !user.is_admin {
        return Err(ShopError::Unauthorized);
    }

    let admins = ledger_service::admins(&shop.pool).await?;

    let lines = admins
        .iter()
        .map(|admin| {
            let mut line = format!("🛠 {} ({})", admin.display_name(), admin.id);
            if shop.config.is_super_admin(admin.id) {
                line.push_str(" 👑");
            }
            if let Some(added_by) = admin.added_by {
                line.push_str(&format!(" - added by {added_by}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut text = format!("👥 Admins\n\n{lines}");
    if shop.config.is_super_admin(user.id) {
        text.push_str(
            "\n\n👑 Super Admin\n\
             /addadmin <id> - Grant admin\n\
             /removeadmin <id> - Revoke admin",
        );
    }

    Ok(Reply::text(text))
}

//! Menu button handling: the purchase and top-up funnel.
//!
//! Every button carries a selector string. The grammar:
//!
//! ```text
//! product_<tier>   pick a product            (product_3d)
//! add_balance      open the top-up amounts
//! amount_<n>       pick a preset top-up      (amount_500)
//! amount_other     type a custom amount
//! payment_<id>     pick a payment method     (payment_easypaisa)
//! use_balance      pay with shop balance
//! cancel           abort the flow
//! ```
//!
//! Handlers that settle money consume the intent with an atomic take
//! first, so a double-tapped button cannot settle twice.

use std::sync::Arc;

use crate::error::ShopError;
use crate::models::key::Tier;
use crate::models::user::User;
use crate::services::catalog_service::{self, PaymentMethod};
use crate::services::{inventory_service, purchase_service};
use crate::session::{Intent, Purpose};
use crate::shop::Shop;
use crate::transport::{AttachmentRef, Choice, Reply};

const PRESET_TOP_UPS: [i64; 3] = [500, 1000, 2000];

fn cancel_row() -> Vec<Choice> {
    vec![Choice::new("❌ Cancel", "cancel")]
}

/// One button per tier, plus the top-up entry point.
pub fn product_menu(products: &[(Tier, i64)]) -> Vec<Vec<Choice>> {
    let mut menu: Vec<Vec<Choice>> = products
        .iter()
        .map(|(tier, price)| {
            vec![Choice::new(
                format!("🔑 {} - ₹{}", tier.display_name(), price),
                format!("product_{}", tier.as_str()),
            )]
        })
        .collect();

    menu.push(vec![Choice::new("➕ Add Balance", "add_balance")]);
    menu.push(cancel_row());
    menu
}

/// Preset top-up amounts, two per row, then the custom option.
pub fn amount_menu() -> Vec<Vec<Choice>> {
    let preset = |amount: i64| Choice::new(format!("₹{amount}"), format!("amount_{amount}"));

    vec![
        vec![preset(PRESET_TOP_UPS[0]), preset(PRESET_TOP_UPS[1])],
        vec![preset(PRESET_TOP_UPS[2]), Choice::new("✏️ Other", "amount_other")],
        cancel_row(),
    ]
}

/// Payment methods, with a balance button on top when the flow allows
/// paying from balance.
pub fn method_menu(methods: &[PaymentMethod], balance: Option<i64>) -> Vec<Vec<Choice>> {
    let mut menu = Vec::with_capacity(methods.len() + 2);

    if let Some(balance) = balance {
        menu.push(vec![Choice::new(
            format!("💳 Use Balance (₹{balance})"),
            "use_balance",
        )]);
    }

    for method in methods {
        menu.push(vec![Choice::new(
            format!("📱 {}", method.name),
            format!("payment_{}", method.id),
        )]);
    }

    menu.push(cancel_row());
    menu
}

/// Dispatch one selector to its handler.
pub async fn handle(shop: Arc<Shop>, user: User, select: &str) -> Result<Reply, ShopError> {
    if let Some(tier_raw) = select.strip_prefix("product_") {
        let tier_raw = tier_raw.to_string();
        return product_selected(shop, user, &tier_raw).await;
    }
    if select == "add_balance" {
        return Ok(Reply::text("💰 Add Balance\n\nPick an amount:")
            .with_menu(amount_menu())
            .edited());
    }
    if let Some(raw) = select.strip_prefix("amount_") {
        let raw = raw.to_string();
        return amount_selected(shop, user, &raw).await;
    }
    if let Some(method_id) = select.strip_prefix("payment_") {
        let method_id = method_id.to_string();
        return method_selected(shop, user, &method_id).await;
    }
    if select == "use_balance" {
        return use_balance(shop, user).await;
    }
    if select == "cancel" {
        shop.sessions.cancel(user.id);
        return Ok(Reply::text("❌ Cancelled. Use /buy to start over.").edited());
    }

    // Stale menu from an old message
    Ok(Reply::text("That menu has expired. Use /buy to start over."))
}

/// A product button was pressed: check stock, remember the choice and
/// offer payment methods.
async fn product_selected(shop: Arc<Shop>, user: User, tier_raw: &str) -> Result<Reply, ShopError> {
    let tier = Tier::parse(tier_raw)
        .ok_or_else(|| ShopError::InvalidInput(format!("Unknown product '{tier_raw}'")))?;

    // Pre-check so nobody walks the whole funnel toward an empty shelf.
    // The guarded allocation still decides the real winner at purchase.
    if inventory_service::available_count(&shop.pool, tier).await? == 0 {
        return Err(ShopError::OutOfStock(tier));
    }

    let price = catalog_service::price(&shop.pool, tier).await?;
    let methods = catalog_service::payment_methods(&shop.pool).await?;

    shop.sessions
        .begin(user.id, Intent::ProductSelected { tier, price });

    let text = format!(
        "🔑 {} - ₹{}\n\nHow would you like to pay?",
        tier.display_name(),
        price
    );

    Ok(Reply::text(text)
        .with_menu(method_menu(&methods, Some(user.balance)))
        .edited())
}

/// A top-up amount button was pressed.
async fn amount_selected(shop: Arc<Shop>, user: User, raw: &str) -> Result<Reply, ShopError> {
    if raw == "other" {
        shop.sessions.begin(user.id, Intent::AwaitingTopUpAmount);
        return Ok(Reply::text(format!(
            "✏️ Type the amount you want to add (minimum ₹{}).",
            purchase_service::MIN_TOP_UP
        ))
        .edited());
    }

    let amount: i64 = raw
        .parse()
        .map_err(|_| ShopError::InvalidInput(format!("Unknown amount '{raw}'")))?;

    begin_top_up(shop, user, amount).await
}

/// Common tail of both top-up entry paths: validate the amount, record
/// the intent and offer the external payment methods.
pub async fn begin_top_up(shop: Arc<Shop>, user: User, amount: i64) -> Result<Reply, ShopError> {
    if amount < purchase_service::MIN_TOP_UP {
        return Err(ShopError::InvalidInput(format!(
            "Minimum top-up is ₹{}",
            purchase_service::MIN_TOP_UP
        )));
    }

    let methods = catalog_service::payment_methods(&shop.pool).await?;

    shop.sessions
        .begin(user.id, Intent::TopUpSelected { amount });

    // Balance cannot fund itself, so no use_balance row here.
    Ok(Reply::text(format!(
        "💰 Adding ₹{amount}\n\nPick a payment method:"
    ))
    .with_menu(method_menu(&methods, None)))
}

/// Free-text custom amount while `AwaitingTopUpAmount`.
///
/// A malformed amount leaves the intent in place so the principal can
/// simply type again.
pub async fn top_up_amount_entered(
    shop: Arc<Shop>,
    user: User,
    text: &str,
) -> Result<Reply, ShopError> {
    let amount: i64 = text.trim().parse().map_err(|_| {
        ShopError::InvalidInput("That doesn't look like an amount. Type a number like 500.".to_string())
    })?;

    begin_top_up(shop, user, amount).await
}

/// A payment method button was pressed: move the flow to evidence
/// collection.
///
/// # Process
///
/// 1. Resolve the method first; an unknown id must not consume the
///    intent
/// 2. Take the intent and derive what is being paid for
/// 3. Record `AwaitingEvidence` and render the pay-to instructions,
///    attaching the method's QR when one is configured
async fn method_selected(shop: Arc<Shop>, user: User, method_id: &str) -> Result<Reply, ShopError> {
    let method = catalog_service::payment_method(&shop.pool, method_id).await?;

    let (purpose, amount) = match shop.sessions.take(user.id) {
        Some(Intent::ProductSelected { tier, price }) => (Purpose::Purchase(tier), price),
        Some(Intent::TopUpSelected { amount }) => (Purpose::TopUp, amount),
        Some(other) => {
            shop.sessions.begin(user.id, other);
            return Err(ShopError::InvalidInput(
                "Finish the current step first, or /cancel.".to_string(),
            ));
        }
        None => {
            return Ok(Reply::text("Nothing in progress. Use /buy to start."));
        }
    };

    shop.sessions.begin(
        user.id,
        Intent::AwaitingEvidence {
            purpose,
            method: method.id.clone(),
            amount,
        },
    );

    let text = crate::text::payment_instructions(&method, amount);

    // A QR goes out as a fresh photo message; plain instructions can
    // edit the menu message in place.
    Ok(match method.qr {
        Some(qr) => Reply::text(text).with_attachment(AttachmentRef(qr)),
        None => Reply::text(text).edited(),
    })
}

/// The balance button was pressed: settle the purchase atomically.
///
/// The intent is taken before the purchase runs, so a duplicated press
/// finds no intent and cannot buy a second key.
async fn use_balance(shop: Arc<Shop>, user: User) -> Result<Reply, ShopError> {
    match shop.sessions.take(user.id) {
        Some(Intent::ProductSelected { tier, price }) => {
            let purchase =
                purchase_service::purchase_with_balance(&shop.pool, user.id, tier, price).await?;

            tracing::info!(
                buyer = %user.id,
                tier = %tier,
                price,
                record = %purchase.record.id,
                "balance purchase settled"
            );

            Ok(Reply::text(format!(
                "✅ Purchase successful!\n\n\
                 🔑 Your {}:\n`{}`\n\n\
                 💰 New balance: ₹{}",
                tier.display_name(),
                purchase.key.value,
                purchase.new_balance
            ))
            .edited())
        }
        Some(other) => {
            shop.sessions.begin(user.id, other);
            Err(ShopError::InvalidInput(
                "Balance can only pay for a product purchase.".to_string(),
            ))
        }
        None => Ok(Reply::text("Nothing in progress. Use /buy to start.")),
    }
}

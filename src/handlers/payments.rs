//! Payment review: evidence intake from buyers, approval and rejection
//! by admins.

use std::sync::Arc;

use crate::error::ShopError;
use crate::models::transaction::TxId;
use crate::models::user::User;
use crate::router::Cmd;
use crate::services::{admin_service, purchase_service};
use crate::session::{Intent, Purpose};
use crate::shop::Shop;
use crate::transport::{AttachmentRef, Reply};

fn parse_tx_id(raw: &str) -> Result<TxId, ShopError> {
    raw.trim()
        .trim_start_matches('#')
        .parse::<i64>()
        .map(TxId)
        .map_err(|_| {
            ShopError::InvalidInput("Usage: /approve_<id> or /reject_<id>".to_string())
        })
}

/// `/approve_<id>` - approve a pending payment and credit its owner.
///
/// The owner is notified after the credit is durable; a dead chat
/// session on their side never unwinds the approval.
pub async fn approve(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let id = parse_tx_id(cmd.suffix("approve_").unwrap_or_default())?;

    let approval = admin_service::approve_transaction(&shop.pool, user.id, id).await?;

    shop.notify(
        approval.record.user_id,
        &format!(
            "✅ Your payment of ₹{} has been approved!\n💰 New balance: ₹{}",
            approval.record.amount, approval.new_balance
        ),
    )
    .await;

    Ok(Reply::text(format!(
        "✅ Transaction #{} approved.\n₹{} credited to user {} (balance ₹{}).",
        approval.record.id, approval.record.amount, approval.record.user_id, approval.new_balance
    )))
}

/// `/reject_<id>` - start a rejection by asking for the reason.
///
/// The record is only checked here; the actual status flip happens
/// when the reason arrives, and that flip re-verifies pending.
pub async fn reject(shop: Arc<Shop>, user: User, cmd: Cmd) -> Result<Reply, ShopError> {
    let id = parse_tx_id(cmd.suffix("reject_").unwrap_or_default())?;

    let record = admin_service::begin_reject_transaction(&shop.pool, user.id, id).await?;

    shop.sessions
        .begin(user.id, Intent::AwaitingRejectReason { tx_id: record.id });

    Ok(Reply::text(format!(
        "📝 Rejecting transaction #{} (₹{} via {} from user {}).\n\nType the reason:",
        record.id, record.amount, record.payment_method, record.user_id
    )))
}

/// Free-text reason while `AwaitingRejectReason`: finish the rejection
/// and tell the owner why.
pub async fn reject_reason_entered(
    shop: Arc<Shop>,
    user: User,
    text: &str,
) -> Result<Reply, ShopError> {
    let Some(Intent::AwaitingRejectReason { tx_id }) = shop.sessions.take(user.id) else {
        return Ok(Reply::text("Nothing to reject right now."));
    };

    let reason = text.trim();
    if reason.is_empty() {
        // Keep the flow alive so the admin can just type again
        shop.sessions
            .begin(user.id, Intent::AwaitingRejectReason { tx_id });
        return Err(ShopError::InvalidInput(
            "The reason cannot be empty. Type the reason:".to_string(),
        ));
    }

    let record = admin_service::reject_transaction(&shop.pool, user.id, tx_id, reason).await?;

    shop.notify(
        record.user_id,
        &format!(
            "❌ Your payment of ₹{} was rejected.\nReason: {}\n\nContact support if you think this is a mistake.",
            record.amount, reason
        ),
    )
    .await;

    Ok(Reply::text(format!(
        "❌ Transaction #{} rejected.",
        record.id
    )))
}

/// A photo while `AwaitingEvidence`: record the pending payment and
/// put the screenshot in front of every admin.
///
/// # Process
///
/// 1. Take the intent; a duplicated upload finds nothing and records
///    nothing
/// 2. Insert the pending record with the attachment as evidence
/// 3. Forward the screenshot to every admin, then broadcast the
///    details with approve/reject shortcuts. The record is durable by
///    now, so a failed broadcast never turns into a failure reply;
///    the submission stays reachable through /pending
pub async fn evidence_submitted(
    shop: Arc<Shop>,
    user: User,
    attachment: AttachmentRef,
) -> Result<Reply, ShopError> {
    let Some(Intent::AwaitingEvidence {
        purpose,
        method,
        amount,
    }) = shop.sessions.take(user.id)
    else {
        return Ok(Reply::text("Nothing in progress. Use /buy to start."));
    };

    let record = purchase_service::submit_payment(
        &shop.pool,
        user.id,
        amount,
        &method,
        Some(attachment.0.as_str()),
    )
    .await?;

    tracing::info!(
        principal = %user.id,
        record = %record.id,
        amount,
        method = %method,
        "payment evidence submitted"
    );

    let what = match purpose {
        Purpose::Purchase(tier) => format!("{} purchase", tier.display_name()),
        Purpose::TopUp => "Balance top-up".to_string(),
    };
    let details = format!(
        "🧾 Payment #{}\n{}: ₹{} via {}\nFrom: {} ({})\n\n/approve_{} or /reject_{}",
        record.id,
        what,
        amount,
        method,
        user.display_name(),
        user.id,
        record.id,
        record.id
    );

    shop.forward_to_admins(
        user.id,
        &attachment,
        &format!("🧾 Evidence for payment #{}", record.id),
    )
    .await;
    shop.notify_admins(&details).await;

    Ok(Reply::text(format!(
        "✅ Screenshot received!\n\n⏳ Your payment is being reviewed. You'll be notified once it's processed.\n🧾 Reference: #{}",
        record.id
    )))
}

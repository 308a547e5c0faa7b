//! Message fragments shared by more than one handler.

use crate::models::key::Tier;
use crate::services::catalog_service::PaymentMethod;

/// The product listing with live stock counts, one line per tier.
pub fn product_lines(products: &[(Tier, i64)], stock: &[(Tier, i64)]) -> String {
    products
        .iter()
        .map(|(tier, price)| {
            let count = stock
                .iter()
                .find(|(t, _)| t == tier)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            format!(
                "🔑 {} - ₹{} ({} available)",
                tier.display_name(),
                price,
                count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pay-to instructions for a chosen method and amount.
pub fn payment_instructions(method: &PaymentMethod, amount: i64) -> String {
    format!(
        "💸 Send ₹{} via {}\n\n\
         📮 {}: `{}`\n\n\
         After paying, send a screenshot of the payment here.\n\
         Use /cancel to abort.",
        amount, method.name, method.name, method.destination
    )
}

//! Error types and user-facing message mapping.
//!
//! This module defines all application errors and how they are rendered
//! as chat messages for the acting principal.

use crate::models::key::Tier;
use crate::models::transaction::{TxId, TxStatus};
use crate::models::user::PrincipalId;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the shop.
/// Each variant maps to a specific user-visible message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from store operations
/// - **Capability Errors**: Unauthorized, Blocked
/// - **Resource Errors**: Principals, keys, or transactions not found
/// - **Business Logic Errors**: Duplicate keys, empty stock, short
///   balances, re-decided transactions
/// - **Validation Errors**: Malformed amounts, ids, or arguments
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for ShopError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catalog override could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Capability check failed: the caller lacks the admin (or
    /// super-admin) flag the operation requires.
    #[error("Unauthorized")]
    Unauthorized,

    /// The acting principal is blocked from the shop.
    #[error("Principal is blocked")]
    Blocked { reason: Option<String> },

    /// No principal record for this id.
    #[error("User {0} not found")]
    UserNotFound(PrincipalId),

    /// No inventory key matches, even case-insensitively.
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    /// No transaction with this id.
    #[error("Transaction #{0} not found")]
    TxNotFound(TxId),

    /// A case-insensitive match already exists in the inventory.
    /// Carries the stored casing so it can be reported exactly.
    #[error("Key already exists as '{existing}'")]
    DuplicateKey { existing: String },

    /// No available key of the tier remains.
    #[error("No {0} keys in stock")]
    OutOfStock(Tier),

    /// The debit would push the balance below zero.
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// The transaction already left pending; decisions are exactly-once.
    #[error("Transaction #{id} already {status}")]
    AlreadyDecided { id: TxId, status: TxStatus },

    /// Command arguments, amounts, or ids are malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A notification could not be delivered. Never surfaced to the
    /// acting principal as a failure of their own request; callers log
    /// and swallow it once the store mutation is durable.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Convert a ShopError into the message shown to the acting principal.
///
/// The dispatch boundary calls this for every error except `Delivery`
/// (which is swallowed where it occurs) so no failure is ever silently
/// dropped on the person who triggered it.
impl ShopError {
    pub fn user_message(&self) -> String {
        match self {
            ShopError::Unauthorized => {
                "⛔ You are not authorized to use this command.".to_string()
            }
            ShopError::Blocked { reason } => format!(
                "🚫 You are blocked from using this shop.\nReason: {}",
                reason.as_deref().unwrap_or("No reason provided")
            ),
            ShopError::UserNotFound(id) => {
                format!("❌ User {id} not found. They must contact the shop first.")
            }
            ShopError::KeyNotFound(value) => format!("❌ Key '{value}' not found."),
            ShopError::TxNotFound(id) => format!("❌ Transaction #{id} not found."),
            ShopError::DuplicateKey { existing } => {
                format!("⚠️ This key already exists as '{existing}'.")
            }
            ShopError::OutOfStock(tier) => format!(
                "❌ No {} in stock right now. Please try again later.",
                tier.display_name()
            ),
            ShopError::InsufficientBalance {
                required,
                available,
            } => format!(
                "❌ Insufficient balance!\n\nRequired: ₹{required}\nYour balance: ₹{available}\n\nAdd balance first, then try again."
            ),
            ShopError::AlreadyDecided { id, status } => {
                format!("⚠️ Transaction #{id} was already {status}.")
            }
            ShopError::InvalidInput(message) => format!("⚠️ {message}"),
            ShopError::Database(_) | ShopError::Serde(_) => {
                "❌ Something went wrong. Please try again.".to_string()
            }
            ShopError::Delivery(_) => "❌ The message could not be delivered.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_specific() {
        let err = ShopError::InsufficientBalance {
            required: 280,
            available: 100,
        };
        let message = err.user_message();
        assert!(message.contains("280"));
        assert!(message.contains("100"));

        let err = ShopError::DuplicateKey {
            existing: "EZwXVP".to_string(),
        };
        assert!(err.user_message().contains("EZwXVP"));

        let err = ShopError::AlreadyDecided {
            id: TxId(7),
            status: TxStatus::Rejected,
        };
        let message = err.user_message();
        assert!(message.contains("#7"));
        assert!(message.contains("rejected"));
    }

    #[test]
    fn blocked_message_defaults_reason() {
        let err = ShopError::Blocked { reason: None };
        assert!(err.user_message().contains("No reason provided"));
    }
}

//! Payment transaction data models.
//!
//! A transaction records one payment event: either a synchronous
//! balance-funded purchase (born approved) or submitted external
//! payment evidence awaiting a human decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::PrincipalId;

/// Monotonically increasing transaction id (AUTOINCREMENT).
///
/// Admins address decisions by this number (`/approve_12`), so it must
/// never be reused; SQLite's AUTOINCREMENT guarantees that.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TxId(pub i64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reserved payment method id for purchases funded from stored
/// balance. Every other method id names an external catalog method.
pub const METHOD_BALANCE: &str = "balance";

/// Approval state. A transaction leaves `Pending` at most once and is
/// immutable afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Approved,
    Rejected,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Approved => "approved",
            TxStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Belongs to one principal (`user_id`)
/// - Stores the amount in whole currency units (positive, CHECK-enforced)
/// - Carries evidence only for external payments
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique, monotonically increasing identifier
    pub id: TxId,

    /// Owning principal
    pub user_id: PrincipalId,

    /// Amount in whole currency units
    pub amount: i64,

    /// `balance`, or the external method id the buyer paid through
    pub payment_method: String,

    /// Opaque attachment handle of the submitted payment proof
    ///
    /// NULL for balance-funded purchases: there is nothing to review.
    pub evidence: Option<String>,

    /// Approval state
    pub status: TxStatus,

    /// Admin who decided the transaction
    ///
    /// NULL while pending, and NULL forever for balance-funded
    /// purchases, which nobody decides.
    pub decided_by: Option<PrincipalId>,

    /// Reason supplied with a rejection
    pub reject_reason: Option<String>,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,
}

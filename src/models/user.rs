//! Principal data models.
//!
//! A principal is anyone who talks to the shop. The record carries the
//! balance ledger fields plus the block and admin flags that gate what
//! the principal may do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable, externally issued identity of a principal.
///
/// The chat transport hands these out; the shop never generates one.
/// Stored as-is as the primary key of the `users` table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a principal record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Each principal:
/// - Is created on first contact with balance 0 and a fresh alias
/// - Is never deleted; blocks and role changes only flip flags
///
/// # Balance Storage
///
/// Balances are stored as `i64` whole currency units. The database CHECK
/// constraint and the guarded updates both keep the value non-negative.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    /// External principal id (primary key)
    pub id: PrincipalId,

    /// Display handle from the transport, if the principal has one
    pub handle: Option<String>,

    /// Short generated alias, unique, shown in receipts and admin views
    pub alias: String,

    /// Current balance in whole currency units
    pub balance: i64,

    /// Whether the principal is locked out of the shop
    pub is_blocked: bool,

    /// Reason supplied when the block was applied
    pub blocked_reason: Option<String>,

    /// When the block was applied
    pub blocked_at: Option<DateTime<Utc>>,

    /// Whether the principal may use admin commands
    pub is_admin: bool,

    /// Which admin granted the admin flag (non-owning back-reference)
    pub added_by: Option<PrincipalId>,

    /// Timestamp of first contact
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to show other people: the handle when there is one, the
    /// alias otherwise.
    pub fn display_name(&self) -> String {
        match &self.handle {
            Some(handle) => format!("@{handle}"),
            None => self.alias.clone(),
        }
    }
}

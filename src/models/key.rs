//! Inventory key data models.
//!
//! This module defines:
//! - `Tier`: the closed set of product duration classes
//! - `Key`: a sellable key in the inventory
//! - `UserKey`: the denormalized receipt written at allocation time

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::user::PrincipalId;

/// Product duration class.
///
/// Stored as its short form (`3d`, `10d`, `30d`) in the `tier` columns
/// and in catalog setting keys such as `price_3d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
pub enum Tier {
    #[sqlx(rename = "3d")]
    #[serde(rename = "3d")]
    ThreeDay,
    #[sqlx(rename = "10d")]
    #[serde(rename = "10d")]
    TenDay,
    #[sqlx(rename = "30d")]
    #[serde(rename = "30d")]
    ThirtyDay,
}

impl Tier {
    /// Every sellable tier, in display order.
    pub const ALL: [Tier; 3] = [Tier::ThreeDay, Tier::TenDay, Tier::ThirtyDay];

    /// Short form used in storage, commands, and setting keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::ThreeDay => "3d",
            Tier::TenDay => "10d",
            Tier::ThirtyDay => "30d",
        }
    }

    /// Parse the short form. `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Tier> {
        match raw {
            "3d" => Some(Tier::ThreeDay),
            "10d" => Some(Tier::TenDay),
            "30d" => Some(Tier::ThirtyDay),
            _ => None,
        }
    }

    /// How long a key of this tier grants access.
    pub fn duration_days(&self) -> u32 {
        match self {
            Tier::ThreeDay => 3,
            Tier::TenDay => 10,
            Tier::ThirtyDay => 30,
        }
    }

    /// Name shown in product listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::ThreeDay => "3 Days Key",
            Tier::TenDay => "10 Days Key",
            Tier::ThirtyDay => "30 Days Key",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an inventory key. A key moves available -> used
/// exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Available,
    Used,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Available => "available",
            KeyStatus::Used => "used",
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a sellable key from the database.
///
/// # Database Table
///
/// Maps to the `keys` table. The key string is the real identity:
/// unique case-insensitively, stored and returned with its exact
/// original casing. The numeric id exists only for ordering (allocation
/// is oldest-first) and deletion bookkeeping.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Key {
    /// Insertion-ordered row id
    pub id: i64,

    /// The key string, exact casing preserved
    pub value: String,

    /// Product tier this key unlocks
    pub tier: Tier,

    /// Current lifecycle state
    pub status: KeyStatus,

    /// Buyer the key was allocated to (set exactly once)
    pub used_by: Option<PrincipalId>,

    /// When the key was allocated
    pub used_at: Option<DateTime<Utc>>,

    /// When the key was added to stock
    pub created_at: DateTime<Utc>,
}

/// Display state of an owned-key receipt.
///
/// Nothing transitions active -> expired on a clock; the field is
/// informational and only ever read back for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Active,
    Expired,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Active => "active",
            ReceiptStatus::Expired => "expired",
        }
    }
}

/// A principal's receipt for one purchased key.
///
/// Written in the same atomic unit as the allocation and read-only
/// afterward. Deliberately denormalized: the key string and tier are
/// copied in, so the receipt survives the key's later deletion from
/// stock.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserKey {
    pub id: i64,
    pub user_id: PrincipalId,
    pub key_value: String,
    pub tier: Tier,
    pub status: ReceiptStatus,
    pub purchased_at: DateTime<Utc>,
}

//! Audit log data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::user::PrincipalId;

/// One append-only record of an admin mutation.
///
/// The `details` text carries a human-readable old -> new diff, enough
/// to reconstruct the change without replaying anything. Entries are
/// never updated or deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuditEntry {
    pub id: i64,

    /// Admin who performed the action
    pub admin_id: PrincipalId,

    /// Short action kind, e.g. `add_key`, `block`, `approve`
    pub action: String,

    /// Principal the action was aimed at, when there is one
    pub target_user_id: Option<PrincipalId>,

    /// Human-readable diff of what changed
    pub details: String,

    pub created_at: DateTime<Utc>,
}

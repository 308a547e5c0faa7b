//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::models::user::PrincipalId;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SUPER_ADMIN_ID` (required): the single principal allowed to manage
///   the admin roster
/// - `DATABASE_URL` (optional): SQLite connection string, defaults to a
///   local `keyshop.db` file
/// - `BOOTSTRAP_ADMIN_IDS` (optional): comma-separated principal ids
///   granted the admin flag on first contact
/// - `CONTACT_HANDLE` (optional): support contact shown in the welcome
/// - `CHANNEL_HANDLE` (optional): announcement channel shown in the welcome
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    pub super_admin_id: i64,

    #[serde(default)]
    pub bootstrap_admin_ids: Vec<i64>,

    pub contact_handle: Option<String>,

    pub channel_handle: Option<String>,
}

/// Default database location if DATABASE_URL is not set.
fn default_database_url() -> String {
    "sqlite:keyshop.db".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., SUPER_ADMIN_ID)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Whether this principal gets the admin flag at enrollment.
    ///
    /// The super admin is always part of the bootstrap set.
    pub fn is_bootstrap_admin(&self, id: PrincipalId) -> bool {
        id.0 == self.super_admin_id || self.bootstrap_admin_ids.contains(&id.0)
    }

    /// Whether this principal may edit the admin roster.
    pub fn is_super_admin(&self, id: PrincipalId) -> bool {
        id.0 == self.super_admin_id
    }
}

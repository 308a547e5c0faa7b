//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Admin audit trail entries
pub mod audit;
/// Inventory keys, tiers, and owned-key receipts
pub mod key;
/// Payment transactions and their approval state
pub mod transaction;
/// Principals and their ledger record
pub mod user;

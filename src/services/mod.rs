//! Business logic services.
//!
//! Services contain core business logic separated from chat handlers.
//! They handle database transactions, validation, and complex operations.

pub mod admin_service;
pub mod approval_service;
pub mod audit_service;
pub mod catalog_service;
pub mod inventory_service;
pub mod ledger_service;
pub mod purchase_service;
pub mod stats_service;

//! A chat-driven storefront for time-limited access keys.
//!
//! The crate is a transport-agnostic core: a frontend normalizes its
//! chat updates into [`transport::Event`]s, hands them to the
//! [`router::Router`] and renders the returned [`transport::Reply`].
//!
//! - `models` - database entities and id newtypes
//! - `services` - inventory, ledger, catalog, purchases, approvals,
//!   admin gates and audit, all over one SQLite pool
//! - `session` - in-memory intent per principal
//! - `handlers` - chat-facing command and button handlers
//! - `router` - the startup-built dispatch table

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod session;
pub mod shop;
pub mod text;
pub mod transport;

pub use config::Config;
pub use db::DbPool;
pub use error::ShopError;
pub use router::Router;
pub use shop::Shop;

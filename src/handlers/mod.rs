//! Chat event handlers.
//!
//! Each handler is an async function that:
//! 1. Receives the shared shop context, the resolved sender and the
//!    parsed command or event payload
//! 2. Performs business logic through the services layer
//! 3. Returns a [`crate::transport::Reply`] for the frontend to render

/// Admin panel: inventory, pricing, blocking, roster, payment setup
pub mod admin;
/// Payment review: approvals, rejections, evidence intake
pub mod payments;
/// Menu button presses and the purchase funnel
pub mod selections;
/// Buyer-facing commands
pub mod shopper;

//! Event dispatch: one routing table, built once at startup, mapping
//! command names to handlers.
//!
//! Commands resolve against an exact-name table first, then against a
//! small list of prefixes for commands that carry their argument in
//! the name itself (`/addkey_3d`, `/approve_12`). Free text and photos
//! route on the sender's current intent instead.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ShopError;
use crate::handlers::{admin, payments, selections, shopper};
use crate::models::user::User;
use crate::services::ledger_service;
use crate::session::Intent;
use crate::shop::Shop;
use crate::transport::{Event, Reply};

/// A parsed command: the name (leading slash stripped, lowercased) and
/// the untouched argument tail.
#[derive(Debug, Clone)]
pub struct Cmd {
    pub name: String,
    pub args: String,
}

impl Cmd {
    /// The part of the name after a registered prefix, for commands
    /// like `/approve_12`.
    pub fn suffix(&self, prefix: &str) -> Option<&str> {
        self.name.strip_prefix(prefix)
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, ShopError>> + Send>>;
type Handler = Box<dyn Fn(Arc<Shop>, User, Cmd) -> HandlerFuture + Send + Sync>;

/// Box a plain async handler fn into the table's uniform shape.
fn route<F, Fut>(handler: F) -> Handler
where
    F: Fn(Arc<Shop>, User, Cmd) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, ShopError>> + Send + 'static,
{
    Box::new(move |shop, user, cmd| Box::pin(handler(shop, user, cmd)))
}

/// The routing table plus the shared context it dispatches with.
pub struct Router {
    shop: Arc<Shop>,
    exact: HashMap<&'static str, Handler>,
    prefixed: Vec<(&'static str, Handler)>,
}

impl Router {
    /// Build the full routing table.
    pub fn new(shop: Arc<Shop>) -> Self {
        let mut exact: HashMap<&'static str, Handler> = HashMap::new();

        exact.insert("start", route(shopper::start));
        exact.insert("buy", route(shopper::buy));
        exact.insert("balance", route(shopper::balance));
        exact.insert("mykeys", route(shopper::my_keys));
        exact.insert("cancel", route(shopper::cancel));

        exact.insert("admin", route(admin::panel));
        exact.insert("stock", route(admin::stock));
        exact.insert("stats", route(admin::stats));
        exact.insert("delkey", route(admin::delete_key));
        exact.insert("block", route(admin::block));
        exact.insert("unblock", route(admin::unblock));
        exact.insert("userinfo", route(admin::user_info));
        exact.insert("pending", route(admin::pending_queue));
        exact.insert("setdest", route(admin::set_destination));
        exact.insert("setqr", route(admin::set_qr));
        exact.insert("addadmin", route(admin::add_admin));
        exact.insert("removeadmin", route(admin::remove_admin));
        exact.insert("listadmins", route(admin::list_admins));

        let prefixed: Vec<(&'static str, Handler)> = vec![
            ("addkey_", route(admin::add_key)),
            ("price_", route(admin::set_price)),
            ("approve_", route(payments::approve)),
            ("reject_", route(payments::reject)),
        ];

        Self {
            shop,
            exact,
            prefixed,
        }
    }

    /// Turn one inbound event into the reply to render.
    ///
    /// Never returns an error: failures are logged and mapped to their
    /// user-facing message, so the frontend always has something to
    /// show.
    pub async fn dispatch(&self, event: Event) -> Reply {
        match self.dispatch_inner(event).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    ShopError::Database(_) | ShopError::Serde(_) => {
                        tracing::error!(error = %err, "dispatch failed");
                    }
                    _ => {
                        tracing::debug!(error = %err, "request refused");
                    }
                }
                Reply::text(err.user_message())
            }
        }
    }

    /// # Process
    ///
    /// 1. Enroll or fetch the sender; every event touches the ledger
    /// 2. Blocked principals get the block notice and nothing else;
    ///    their in-flight intent stays parked
    /// 3. Commands resolve exact-then-prefix; text and photos resolve
    ///    on the sender's current intent
    async fn dispatch_inner(&self, event: Event) -> Result<Reply, ShopError> {
        let user = ledger_service::get_or_create(
            &self.shop.pool,
            &self.shop.config,
            event.sender(),
            event.handle(),
        )
        .await?;

        if user.is_blocked {
            return Err(ShopError::Blocked {
                reason: user.blocked_reason,
            });
        }

        match event {
            Event::Command { name, args, .. } => {
                let name = name.trim_start_matches('/').to_lowercase();
                let cmd = Cmd { name, args };

                if let Some(handler) = self.exact.get(cmd.name.as_str()) {
                    return handler(self.shop.clone(), user, cmd).await;
                }
                if let Some((_, handler)) = self
                    .prefixed
                    .iter()
                    .find(|(prefix, _)| cmd.name.starts_with(prefix))
                {
                    return handler(self.shop.clone(), user, cmd).await;
                }

                Ok(Reply::text(
                    "Unknown command. Use /start to see what I can do.",
                ))
            }
            Event::Selection { select, .. } => {
                selections::handle(self.shop.clone(), user, &select).await
            }
            Event::Text { text, .. } => match self.shop.sessions.peek(user.id) {
                Some(Intent::AwaitingTopUpAmount) => {
                    selections::top_up_amount_entered(self.shop.clone(), user, &text).await
                }
                Some(Intent::AwaitingRejectReason { .. }) => {
                    payments::reject_reason_entered(self.shop.clone(), user, &text).await
                }
                _ => Ok(Reply::text(
                    "Use /buy to browse keys or /start for help.",
                )),
            },
            Event::Photo { attachment, .. } => match self.shop.sessions.peek(user.id) {
                Some(Intent::AwaitingEvidence { .. }) => {
                    payments::evidence_submitted(self.shop.clone(), user, attachment).await
                }
                Some(Intent::AwaitingQrPhoto { .. }) => {
                    admin::qr_photo(self.shop.clone(), user, attachment).await
                }
                _ => Ok(Reply::text(
                    "I wasn't expecting a photo. Use /buy to start a purchase.",
                )),
            },
        }
    }
}

//! Shared application context threaded through every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::models::user::{PrincipalId, User};
use crate::services::ledger_service;
use crate::session::SessionTracker;
use crate::transport::{AttachmentRef, Notifier};

/// Everything a handler needs: the database, configuration, in-flight
/// sessions and the outbound side of the chat transport.
pub struct Shop {
    pub pool: DbPool,
    pub config: Config,
    pub sessions: SessionTracker,
    pub notifier: Arc<dyn Notifier>,
}

impl Shop {
    pub fn new(pool: DbPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            config,
            sessions: SessionTracker::new(),
            notifier,
        }
    }

    /// Push a message to one principal, swallowing delivery failures.
    ///
    /// Notifications always run after the durable mutation they report
    /// on, so a dead chat session must not unwind the sale. Log and
    /// move on.
    pub async fn notify(&self, to: PrincipalId, text: &str) {
        if let Err(err) = self.notifier.send(to, text).await {
            tracing::warn!(principal = %to, error = %err, "notification delivery failed");
        }
    }

    /// Push the same message to every admin.
    ///
    /// Best effort end to end: a failed roster read, like a failed
    /// delivery, is logged and never returned, so a broadcast can run
    /// after a durable mutation without putting it at risk.
    pub async fn notify_admins(&self, text: &str) {
        for admin in self.admin_roster().await {
            self.notify(admin.id, text).await;
        }
    }

    /// Forward an attachment to every admin, best effort like
    /// [`Shop::notify_admins`].
    pub async fn forward_to_admins(
        &self,
        from: PrincipalId,
        attachment: &AttachmentRef,
        caption: &str,
    ) {
        for admin in self.admin_roster().await {
            self.forward(from, admin.id, attachment, caption).await;
        }
    }

    /// Forward an uploaded attachment to one principal, swallowing
    /// delivery failures like [`Shop::notify`].
    pub async fn forward(
        &self,
        from: PrincipalId,
        to: PrincipalId,
        attachment: &AttachmentRef,
        caption: &str,
    ) {
        if let Err(err) = self
            .notifier
            .forward_attachment(from, to, attachment, caption)
            .await
        {
            tracing::warn!(principal = %to, error = %err, "attachment forward failed");
        }
    }

    async fn admin_roster(&self) -> Vec<User> {
        match ledger_service::admins(&self.pool).await {
            Ok(admins) => admins,
            Err(err) => {
                tracing::warn!(error = %err, "admin roster read failed");
                Vec::new()
            }
        }
    }
}

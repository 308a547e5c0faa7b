//! Chat-transport abstraction: the events a messaging frontend feeds
//! the shop and the replies it gets back.
//!
//! The shop core never talks to a chat network directly. A frontend
//! turns its own updates into [`Event`]s, hands them to the router and
//! renders the returned [`Reply`]; outbound pushes go through the
//! [`Notifier`] it implements.

use async_trait::async_trait;

use crate::error::ShopError;
use crate::models::user::PrincipalId;

/// Opaque handle to a photo held by the chat transport. The shop
/// forwards these around without ever downloading the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef(pub String);

/// One inbound chat update, normalized.
#[derive(Debug, Clone)]
pub enum Event {
    /// A slash command with its argument tail. The router normalizes
    /// the name, so frontends can pass it as typed.
    Command {
        from: PrincipalId,
        handle: Option<String>,
        name: String,
        args: String,
    },
    /// Free text outside any command.
    Text {
        from: PrincipalId,
        handle: Option<String>,
        text: String,
    },
    /// A menu button press carrying its selector.
    Selection {
        from: PrincipalId,
        handle: Option<String>,
        select: String,
    },
    /// A photo upload.
    Photo {
        from: PrincipalId,
        handle: Option<String>,
        attachment: AttachmentRef,
    },
}

impl Event {
    /// The principal behind the event.
    pub fn sender(&self) -> PrincipalId {
        match self {
            Event::Command { from, .. }
            | Event::Text { from, .. }
            | Event::Selection { from, .. }
            | Event::Photo { from, .. } => *from,
        }
    }

    /// The sender's chat handle, when the transport knows it.
    pub fn handle(&self) -> Option<&str> {
        match self {
            Event::Command { handle, .. }
            | Event::Text { handle, .. }
            | Event::Selection { handle, .. }
            | Event::Photo { handle, .. } => handle.as_deref(),
        }
    }
}

/// One button: the label the user sees and the selector that comes
/// back when they press it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub select: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, select: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            select: select.into(),
        }
    }
}

/// What the shop sends back for an event.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    /// Button rows rendered under the text.
    pub menu: Vec<Vec<Choice>>,
    /// Replace the message the pressed menu hung off instead of
    /// sending a new one.
    pub edit: bool,
    pub attachment: Option<AttachmentRef>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            menu: Vec::new(),
            edit: false,
            attachment: None,
        }
    }

    pub fn with_menu(mut self, menu: Vec<Vec<Choice>>) -> Self {
        self.menu = menu;
        self
    }

    pub fn edited(mut self) -> Self {
        self.edit = true;
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Outbound push messages, implemented by the chat frontend.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Push a text message to a principal.
    async fn send(&self, to: PrincipalId, text: &str) -> Result<(), ShopError>;

    /// Re-send an attachment one principal uploaded to another
    /// principal, with a caption.
    async fn forward_attachment(
        &self,
        from: PrincipalId,
        to: PrincipalId,
        attachment: &AttachmentRef,
        caption: &str,
    ) -> Result<(), ShopError>;
}

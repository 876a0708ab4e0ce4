// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification dispatcher: decides who is allowed to see a freshly
//! persisted message and delivers it.
//!
//! The recipient set is the union of every admin and every staff account
//! explicitly granted on the bot that raised the event. Delivery is
//! fire-and-forget: store lookup failures degrade (placeholder sender,
//! smaller recipient set) rather than failing the dispatch.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use botdesk_core::types::{Message, SenderKind};
use botdesk_core::DirectoryStore;
use botdesk_realtime::{ClientRegistry, DeliveryReport};

/// Event name used for message pushes on operator streams.
pub const NEW_MESSAGE_EVENT: &str = "new_message";

/// Display metadata for the message sender.
#[derive(Debug, Clone, Serialize)]
pub struct SenderMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// True when the sender is the bot or a staff member, so clients can
    /// render the message on the "own" side of the thread.
    pub is_self: bool,
}

/// Delivery payload for one persisted message.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePush {
    pub bot_id: String,
    pub thread_id: String,
    pub message: Message,
    pub sender: SenderMeta,
}

/// Authorizes and delivers persisted messages to operator connections.
pub struct Dispatcher {
    store: Arc<dyn DirectoryStore>,
    registry: Arc<ClientRegistry>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn DirectoryStore>, registry: Arc<ClientRegistry>) -> Self {
        Self { store, registry }
    }

    /// Deliver a persisted message to every authorized operator.
    ///
    /// An empty recipient set is a no-op. The returned report is
    /// observational; failures never propagate to the caller.
    pub async fn dispatch_message(
        &self,
        bot_id: &str,
        message: &Message,
        thread_id: &str,
    ) -> DeliveryReport {
        let sender = self.hydrate_sender(message).await;
        let recipients = self.resolve_recipients(bot_id).await;
        if recipients.is_empty() {
            debug!(bot_id, "no authorized recipients, skipping dispatch");
            return DeliveryReport::default();
        }

        let push = MessagePush {
            bot_id: bot_id.to_string(),
            thread_id: thread_id.to_string(),
            message: message.clone(),
            sender,
        };
        let payload = match serde_json::to_value(&push) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to serialize message push, skipping dispatch");
                return DeliveryReport::default();
            }
        };

        self.registry
            .multicast(&recipients, NEW_MESSAGE_EVENT, payload)
            .await
    }

    /// Look up sender display metadata, degrading to an "Unknown"
    /// placeholder on missing identity or lookup failure.
    async fn hydrate_sender(&self, message: &Message) -> SenderMeta {
        let is_self = matches!(message.sender_kind, SenderKind::Bot | SenderKind::Staff);
        let placeholder = SenderMeta {
            name: "Unknown".to_string(),
            avatar_url: None,
            is_self,
        };

        let Some(identity_id) = &message.sender_identity_id else {
            return placeholder;
        };
        match self.store.identity(identity_id).await {
            Ok(Some(identity)) => SenderMeta {
                name: identity.display_name,
                avatar_url: identity.avatar_url,
                is_self,
            },
            Ok(None) => placeholder,
            Err(err) => {
                warn!(%identity_id, %err, "sender identity lookup failed, using placeholder");
                placeholder
            }
        }
    }

    /// Admins plus explicitly granted staff, set semantics.
    async fn resolve_recipients(&self, bot_id: &str) -> Vec<String> {
        let mut recipients = BTreeSet::new();

        match self.store.admin_staff_ids().await {
            Ok(ids) => recipients.extend(ids),
            Err(err) => warn!(%err, "admin lookup failed, continuing without admins"),
        }

        // Grants key on the bot's account id, which may differ from the
        // identity id the event arrived under.
        let account_id = match self.store.bot_account_id(bot_id).await {
            Ok(Some(account_id)) => account_id,
            Ok(None) => bot_id.to_string(),
            Err(err) => {
                warn!(bot_id, %err, "bot account lookup failed, falling back to identity id");
                bot_id.to_string()
            }
        };
        match self.store.granted_staff_ids(&account_id).await {
            Ok(ids) => recipients.extend(ids),
            Err(err) => warn!(%account_id, %err, "grant lookup failed, continuing without grants"),
        }

        recipients.into_iter().collect()
    }
}

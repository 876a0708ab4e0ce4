// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the real-time core.
//!
//! The core never talks to a concrete database, session system, or chat
//! provider. It goes through these traits; `botdesk-storage` provides the
//! SQLite [`DirectoryStore`], the gateway provides the [`SessionRevoker`],
//! and `botdesk-provider` provides the HTTP [`ProviderClient`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BotdeskError;
use crate::types::{
    Conversation, ConversationKind, Identity, Message, MessageContent, MessageStatus,
};

/// The identity/routing store surface the core needs.
///
/// Backed by whatever persistence technology the deployment uses; the core
/// only issues these reads and writes.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Look up the conversation owned by `bot_id` whose membership record
    /// matches the given provider thread id.
    async fn conversation_for_thread(
        &self,
        bot_id: &str,
        thread_id: &str,
    ) -> Result<Option<Conversation>, BotdeskError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, BotdeskError>;

    /// Upsert a message keyed by `(conversation_id, external_id)`.
    ///
    /// A second delivery of the same external id updates the existing row
    /// (keeping its original `id`) rather than creating a duplicate. The raw
    /// provider payload is stored alongside for debugging. Returns the row
    /// as stored.
    async fn upsert_message(
        &self,
        message: &Message,
        raw: &serde_json::Value,
    ) -> Result<Message, BotdeskError>;

    async fn get_message(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, BotdeskError>;

    /// Flip the status of a locally-originated message, optionally adopting
    /// a provider-assigned external id on send completion.
    async fn update_message_status(
        &self,
        conversation_id: &str,
        external_id: &str,
        status: MessageStatus,
        new_external_id: Option<&str>,
    ) -> Result<(), BotdeskError>;

    /// Update the conversation's `last_message`/`last_activity_at`
    /// projection. Called unconditionally after every successful persist.
    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message: &MessageContent,
        at: DateTime<Utc>,
    ) -> Result<(), BotdeskError>;

    async fn identity(&self, id: &str) -> Result<Option<Identity>, BotdeskError>;

    /// Resolve a provider-side sender uid to a known internal identity id,
    /// scoped to the bot that received the event.
    async fn linked_identity(
        &self,
        bot_id: &str,
        external_uid: &str,
    ) -> Result<Option<String>, BotdeskError>;

    /// Resolve a bot's identity id to its underlying bot account id, when
    /// the two differ. Returns `None` if the bot has no account row.
    async fn bot_account_id(&self, bot_identity_id: &str)
        -> Result<Option<String>, BotdeskError>;

    /// Ids of every staff account with role `admin`.
    async fn admin_staff_ids(&self) -> Result<Vec<String>, BotdeskError>;

    /// Ids of every staff account explicitly granted access to the bot
    /// account.
    async fn granted_staff_ids(&self, bot_account_id: &str)
        -> Result<Vec<String>, BotdeskError>;
}

/// Invalidates an operator's session after delivery retries are exhausted.
///
/// Invoked exactly once per eviction. The operator must re-authenticate to
/// come back.
#[async_trait]
pub trait SessionRevoker: Send + Sync {
    async fn force_logout(&self, operator_id: &str);
}

/// Receipt returned by the provider bridge for an outbound send.
#[derive(Debug, Clone)]
pub struct MessageReceipt {
    /// Provider-assigned message id.
    pub external_id: String,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Thread metadata as reported by the provider bridge.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub external_thread_id: String,
    pub kind: ConversationKind,
    pub title: Option<String>,
}

/// Capability object for the chat provider bridge.
///
/// Login and QR flows live entirely outside the core; this is the only
/// surface the core calls.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn send_text(
        &self,
        bot_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<MessageReceipt, BotdeskError>;

    async fn thread_info(
        &self,
        bot_id: &str,
        thread_id: &str,
    ) -> Result<ThreadInfo, BotdeskError>;
}

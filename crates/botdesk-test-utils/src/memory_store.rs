// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`DirectoryStore`] with the same upsert and projection
//! semantics as the SQLite store, plus synchronous seed/inspect helpers
//! for test setup and assertions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use botdesk_core::types::{
    Conversation, Identity, Message, MessageContent, MessageStatus, StaffAccount, StaffRole,
};
use botdesk_core::{BotdeskError, DirectoryStore};

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    /// Keyed by `(conversation_id, external_id)`, like the SQLite unique
    /// index.
    messages: HashMap<(String, String), (Message, Value)>,
    identities: HashMap<String, Identity>,
    staff: HashMap<String, StaffAccount>,
    /// bot identity id -> bot account id
    bot_accounts: HashMap<String, String>,
    /// bot account id -> granted staff ids
    grants: HashMap<String, BTreeSet<String>>,
    /// `(bot_identity_id, external_uid)` -> identity id
    contact_links: HashMap<(String, String), String>,
}

/// In-memory directory store for tests.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
}

impl MemoryDirectory {
    pub fn add_conversation(&self, conversation: Conversation) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .conversations
            .insert(conversation.id.clone(), conversation);
    }

    pub fn add_identity(&self, identity: Identity) {
        let mut inner = self.inner.lock().unwrap();
        inner.identities.insert(identity.id.clone(), identity);
    }

    pub fn add_staff(&self, staff: StaffAccount) {
        let mut inner = self.inner.lock().unwrap();
        inner.staff.insert(staff.id.clone(), staff);
    }

    pub fn add_bot_account(&self, account_id: &str, bot_identity_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .bot_accounts
            .insert(bot_identity_id.to_string(), account_id.to_string());
    }

    pub fn add_grant(&self, bot_account_id: &str, staff_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .grants
            .entry(bot_account_id.to_string())
            .or_default()
            .insert(staff_id.to_string());
    }

    pub fn add_contact_link(&self, bot_identity_id: &str, external_uid: &str, identity_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.contact_links.insert(
            (bot_identity_id.to_string(), external_uid.to_string()),
            identity_id.to_string(),
        );
    }

    pub fn get_conversation_sync(&self, id: &str) -> Option<Conversation> {
        self.inner.lock().unwrap().conversations.get(id).cloned()
    }

    pub fn get_message_sync(&self, conversation_id: &str, external_id: &str) -> Option<Message> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .get(&(conversation_id.to_string(), external_id.to_string()))
            .map(|(message, _)| message.clone())
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectory {
    async fn conversation_for_thread(
        &self,
        bot_id: &str,
        thread_id: &str,
    ) -> Result<Option<Conversation>, BotdeskError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .conversations
            .values()
            .find(|c| c.bot_identity_id == bot_id && c.external_thread_id == thread_id)
            .cloned())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, BotdeskError> {
        Ok(self.get_conversation_sync(id))
    }

    async fn upsert_message(
        &self,
        message: &Message,
        raw: &Value,
    ) -> Result<Message, BotdeskError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (message.conversation_id.clone(), message.external_id.clone());
        let mut stored = message.clone();
        if let Some((existing, _)) = inner.messages.get(&key) {
            // Re-delivery keeps the original row id.
            stored.id = existing.id.clone();
        }
        inner.messages.insert(key, (stored.clone(), raw.clone()));
        Ok(stored)
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, BotdeskError> {
        Ok(self.get_message_sync(conversation_id, external_id))
    }

    async fn update_message_status(
        &self,
        conversation_id: &str,
        external_id: &str,
        status: MessageStatus,
        new_external_id: Option<&str>,
    ) -> Result<(), BotdeskError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (conversation_id.to_string(), external_id.to_string());
        let Some((mut message, raw)) = inner.messages.remove(&key) else {
            return Err(BotdeskError::Internal(format!(
                "no message {external_id} in conversation {conversation_id}"
            )));
        };
        message.status = status;
        if let Some(new_id) = new_external_id {
            message.external_id = new_id.to_string();
        }
        let key = (conversation_id.to_string(), message.external_id.clone());
        inner.messages.insert(key, (message, raw));
        Ok(())
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message: &MessageContent,
        at: DateTime<Utc>,
    ) -> Result<(), BotdeskError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(conversation) = inner.conversations.get_mut(conversation_id) {
            conversation.last_message = Some(last_message.clone());
            conversation.last_activity_at = Some(at);
        }
        Ok(())
    }

    async fn identity(&self, id: &str) -> Result<Option<Identity>, BotdeskError> {
        Ok(self.inner.lock().unwrap().identities.get(id).cloned())
    }

    async fn linked_identity(
        &self,
        bot_id: &str,
        external_uid: &str,
    ) -> Result<Option<String>, BotdeskError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .contact_links
            .get(&(bot_id.to_string(), external_uid.to_string()))
            .cloned())
    }

    async fn bot_account_id(
        &self,
        bot_identity_id: &str,
    ) -> Result<Option<String>, BotdeskError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bot_accounts
            .get(bot_identity_id)
            .cloned())
    }

    async fn admin_staff_ids(&self) -> Result<Vec<String>, BotdeskError> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<String> = inner
            .staff
            .values()
            .filter(|s| s.role == StaffRole::Admin)
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn granted_staff_ids(
        &self,
        bot_account_id: &str,
    ) -> Result<Vec<String>, BotdeskError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .grants
            .get(bot_account_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

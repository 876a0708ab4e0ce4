// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send path: staff-authored messages to the chat provider.
//!
//! Persists a placeholder row first (`status = sending`, local external id),
//! then calls the provider bridge and flips the row to `sent` (adopting the
//! provider receipt id) or `failed`. The result is dispatched to operators
//! like any other persisted message, so every console sees the send and its
//! outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use botdesk_core::types::{Message, MessageContent, MessageStatus, SenderKind};
use botdesk_core::{BotdeskError, DirectoryStore, ProviderClient};

use crate::dispatcher::Dispatcher;

/// Sends staff-authored text messages through the provider bridge.
pub struct OutboundSender {
    store: Arc<dyn DirectoryStore>,
    provider: Arc<dyn ProviderClient>,
    dispatcher: Arc<Dispatcher>,
}

impl OutboundSender {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        provider: Arc<dyn ProviderClient>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            provider,
            dispatcher,
        }
    }

    /// Send a text message into a conversation.
    ///
    /// Returns `Ok(None)` when the conversation does not exist. A provider
    /// failure is not an error for the caller: the message row ends up
    /// `failed` and is returned as such.
    pub async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Option<Message>, BotdeskError> {
        let Some(conversation) = self.store.get_conversation(conversation_id).await? else {
            return Ok(None);
        };
        let bot_id = conversation.bot_identity_id.clone();

        let local_external_id = format!("local-{}", Uuid::new_v4());
        let mut message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            external_id: local_external_id.clone(),
            sender_identity_id: Some(bot_id.clone()),
            sender_kind: SenderKind::Bot,
            content: MessageContent::Text {
                text: text.to_string(),
            },
            sent_at: Utc::now(),
            status: MessageStatus::Sending,
        };
        let raw = serde_json::json!({ "origin": "console", "text": text });
        self.store.upsert_message(&message, &raw).await?;

        match self
            .provider
            .send_text(&bot_id, &conversation.external_thread_id, text)
            .await
        {
            Ok(receipt) => {
                self.store
                    .update_message_status(
                        &conversation.id,
                        &local_external_id,
                        MessageStatus::Sent,
                        Some(&receipt.external_id),
                    )
                    .await?;
                message.external_id = receipt.external_id;
                message.status = MessageStatus::Sent;
                debug!(conversation_id = %conversation.id, external_id = %message.external_id, "outbound send confirmed");
            }
            Err(err) => {
                warn!(conversation_id = %conversation.id, %err, "outbound send failed");
                self.store
                    .update_message_status(
                        &conversation.id,
                        &local_external_id,
                        MessageStatus::Failed,
                        None,
                    )
                    .await?;
                message.status = MessageStatus::Failed;
            }
        }

        self.store
            .touch_conversation(&conversation.id, &message.content, message.sent_at)
            .await?;
        self.dispatcher
            .dispatch_message(&bot_id, &message, &conversation.external_thread_id)
            .await;

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use botdesk_core::types::{Conversation, ConversationKind};
    use botdesk_realtime::{ClientRegistry, RetryPolicy};
    use botdesk_test_utils::{MemoryDirectory, MockProvider, RecordingRevoker};

    fn fixture(provider: Arc<MockProvider>) -> (Arc<MemoryDirectory>, OutboundSender) {
        let store = Arc::new(MemoryDirectory::default());
        let registry = ClientRegistry::new(
            Arc::new(RecordingRevoker::default()),
            RetryPolicy::default(),
        );
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), registry));
        let outbound = OutboundSender::new(store.clone(), provider, dispatcher);
        store.add_conversation(Conversation {
            id: "c-1".to_string(),
            bot_identity_id: "bot-1".to_string(),
            kind: ConversationKind::Direct,
            external_thread_id: "123".to_string(),
            last_message: None,
            last_activity_at: None,
        });
        (store, outbound)
    }

    #[tokio::test]
    async fn successful_send_adopts_receipt_id() {
        let provider = MockProvider::succeeding("prov-42");
        let (store, outbound) = fixture(provider.clone());

        let message = outbound.send_text("c-1", "hello").await.unwrap().unwrap();

        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.external_id, "prov-42");
        assert_eq!(message.sender_kind, SenderKind::Bot);
        let stored = store.get_message_sync("c-1", "prov-42").unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert_eq!(provider.sent().await, vec![("bot-1".to_string(), "123".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn failed_send_flips_status_to_failed() {
        let provider = MockProvider::failing();
        let (store, outbound) = fixture(provider);

        let message = outbound.send_text("c-1", "hello").await.unwrap().unwrap();

        assert_eq!(message.status, MessageStatus::Failed);
        let stored = store
            .get_message_sync("c-1", &message.external_id)
            .unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_conversation_returns_none() {
        let provider = MockProvider::succeeding("prov-1");
        let (_store, outbound) = fixture(provider);
        assert!(outbound.send_text("c-missing", "hi").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_touches_conversation_projection() {
        let provider = MockProvider::succeeding("prov-1");
        let (store, outbound) = fixture(provider);

        outbound.send_text("c-1", "latest words").await.unwrap();

        let conversation = store.get_conversation_sync("c-1").unwrap();
        assert_eq!(
            conversation.last_message,
            Some(MessageContent::Text {
                text: "latest words".to_string()
            })
        );
    }
}

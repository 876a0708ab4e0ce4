// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline: one raw provider event in, one persisted
//! canonical message out, conversation projection kept current.
//!
//! Events that cannot be resolved (missing identifiers, unprovisioned
//! conversation) are logged and skipped, never retried. Persistence is
//! at-most-once: a failed upsert aborts the event. Duplicate deliveries are
//! tolerated via the `(conversation_id, external_id)` upsert key.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use strum::Display;
use tracing::{debug, error, warn};
use uuid::Uuid;

use botdesk_core::types::{Message, MessageStatus, SenderKind};
use botdesk_core::{BotdeskError, DirectoryStore};
use botdesk_dispatch::Dispatcher;

use crate::event::{MessageEvent, RawEvent};

/// Why an event was dropped without persisting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    MissingSender,
    MissingThread,
    UnknownConversation,
    UnsupportedEvent,
}

/// Result of processing one raw event.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The message was persisted (and dispatched to operators).
    Persisted { message: Message },
    /// The event was dropped; nothing was written.
    Skipped(SkipReason),
}

/// Turns raw provider events into persisted canonical messages.
pub struct IngestPipeline {
    store: Arc<dyn DirectoryStore>,
    dispatcher: Arc<Dispatcher>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn DirectoryStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Process one raw event received by `bot_id`.
    ///
    /// Called at-least-once per provider event; re-delivery of the same
    /// external id updates the stored row in place. Returns `Err` only for
    /// persistence failures; unresolvable events return
    /// [`IngestOutcome::Skipped`].
    pub async fn process(
        &self,
        bot_id: &str,
        raw: &Value,
    ) -> Result<IngestOutcome, BotdeskError> {
        let event = match RawEvent::parse(raw) {
            RawEvent::Message(event) => event,
            RawEvent::Unsupported(_) => {
                warn!(bot_id, "event has no readable envelope, dropping");
                return Ok(IngestOutcome::Skipped(SkipReason::UnsupportedEvent));
            }
        };

        let Some(sender_uid) = event.sender_uid.clone().filter(|s| !s.trim().is_empty())
        else {
            warn!(bot_id, "event has no resolvable sender id, dropping");
            return Ok(IngestOutcome::Skipped(SkipReason::MissingSender));
        };
        let Some(thread_uid) = event.resolve_thread_uid() else {
            warn!(bot_id, %sender_uid, "event has no resolvable thread id, dropping");
            return Ok(IngestOutcome::Skipped(SkipReason::MissingThread));
        };

        // The conversation must be provisioned by the external sync process
        // before messages can land.
        let Some(conversation) = self
            .store
            .conversation_for_thread(bot_id, &thread_uid)
            .await?
        else {
            warn!(bot_id, %thread_uid, "no conversation provisioned for thread, dropping");
            return Ok(IngestOutcome::Skipped(SkipReason::UnknownConversation));
        };

        let (sender_identity_id, sender_kind) =
            self.resolve_sender(bot_id, &event, &sender_uid).await?;

        let external_id = event
            .external_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));
        let sent_at = event
            .sent_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            external_id,
            sender_identity_id,
            sender_kind,
            content: event.classify(),
            sent_at,
            status: MessageStatus::Sent,
        };

        let stored = self
            .store
            .upsert_message(&message, raw)
            .await
            .inspect_err(|err| {
                error!(bot_id, conversation_id = %conversation.id, %err, "message persist failed");
            })?;

        // Unconditional, last-write-wins: no event-time comparison.
        self.store
            .touch_conversation(&conversation.id, &stored.content, stored.sent_at)
            .await?;

        debug!(
            conversation_id = %conversation.id,
            external_id = %stored.external_id,
            sender_kind = %stored.sender_kind,
            "message persisted"
        );

        self.dispatcher
            .dispatch_message(bot_id, &stored, &thread_uid)
            .await;

        Ok(IngestOutcome::Persisted { message: stored })
    }

    /// Resolve the sender: the bot itself for self-authored events,
    /// otherwise a contact-link lookup. An unlinked sender is still stored,
    /// with no identity and kind `customer`.
    async fn resolve_sender(
        &self,
        bot_id: &str,
        event: &MessageEvent,
        sender_uid: &str,
    ) -> Result<(Option<String>, SenderKind), BotdeskError> {
        if event.self_authored {
            return Ok((Some(bot_id.to_string()), SenderKind::Bot));
        }
        match self.store.linked_identity(bot_id, sender_uid).await? {
            Some(identity_id) => Ok((Some(identity_id), SenderKind::Customer)),
            None => {
                warn!(bot_id, %sender_uid, "sender not linked to a known identity, storing as unknown");
                Ok((None, SenderKind::Customer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use botdesk_core::types::{Conversation, ConversationKind, MessageContent};
    use botdesk_dispatch::Dispatcher;
    use botdesk_realtime::{ClientRegistry, RetryPolicy};
    use botdesk_test_utils::{MemoryDirectory, RecordingRevoker};

    fn fixture() -> (Arc<MemoryDirectory>, IngestPipeline) {
        let store = Arc::new(MemoryDirectory::default());
        let registry = ClientRegistry::new(
            Arc::new(RecordingRevoker::default()),
            RetryPolicy::default(),
        );
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), registry));
        let pipeline = IngestPipeline::new(store.clone(), dispatcher);
        (store, pipeline)
    }

    fn provision_conversation(store: &MemoryDirectory) {
        store.add_conversation(Conversation {
            id: "c-1".to_string(),
            bot_identity_id: "bot-1".to_string(),
            kind: ConversationKind::Direct,
            external_thread_id: "123".to_string(),
            last_message: None,
            last_activity_at: None,
        });
    }

    #[tokio::test]
    async fn webchat_event_persists_customer_message_and_touches_projection() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);

        let raw = json!({ "uidFrom": "123", "msgType": "webchat", "content": "hi" });
        let outcome = pipeline.process("bot-1", &raw).await.unwrap();

        let IngestOutcome::Persisted { message } = outcome else {
            panic!("expected persisted outcome");
        };
        assert_eq!(message.conversation_id, "c-1");
        assert_eq!(message.sender_kind, SenderKind::Customer);
        assert_eq!(message.sender_identity_id, None);
        assert_eq!(
            message.content,
            MessageContent::Text {
                text: "hi".to_string()
            }
        );

        let conversation = store.get_conversation_sync("c-1").unwrap();
        assert_eq!(conversation.last_message, Some(message.content));
    }

    #[tokio::test]
    async fn duplicate_external_id_updates_single_row() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);

        let raw = json!({
            "uidFrom": "123", "msgId": "ext-7", "msgType": "webchat", "content": "first"
        });
        pipeline.process("bot-1", &raw).await.unwrap();

        let raw = json!({
            "uidFrom": "123", "msgId": "ext-7", "msgType": "webchat", "content": "second"
        });
        pipeline.process("bot-1", &raw).await.unwrap();

        assert_eq!(store.message_count(), 1);
        let stored = store.get_message_sync("c-1", "ext-7").unwrap();
        assert_eq!(
            stored.content,
            MessageContent::Text {
                text: "second".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_identifiers_skip_without_writes() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);

        // No sender at all.
        let raw = json!({ "msgType": "webchat", "content": "hi" });
        let outcome = pipeline.process("bot-1", &raw).await.unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::Skipped(SkipReason::MissingSender)
        ));

        // Self-authored with no recipient: thread unresolvable.
        let raw = json!({ "uidFrom": "bot-uid", "isSelf": true, "msgType": "webchat" });
        let outcome = pipeline.process("bot-1", &raw).await.unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::Skipped(SkipReason::MissingThread)
        ));

        assert_eq!(store.message_count(), 0);
        let conversation = store.get_conversation_sync("c-1").unwrap();
        assert!(conversation.last_message.is_none());
    }

    #[tokio::test]
    async fn unprovisioned_conversation_skips() {
        let (store, pipeline) = fixture();
        let raw = json!({ "uidFrom": "999", "msgType": "webchat", "content": "hi" });
        let outcome = pipeline.process("bot-1", &raw).await.unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::Skipped(SkipReason::UnknownConversation)
        ));
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn self_authored_event_resolves_to_bot_sender() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);

        let raw = json!({
            "uidFrom": "bot-uid", "uidTo": "123", "isSelf": true,
            "msgType": "webchat", "content": "welcome"
        });
        let IngestOutcome::Persisted { message } =
            pipeline.process("bot-1", &raw).await.unwrap()
        else {
            panic!()
        };
        assert_eq!(message.sender_kind, SenderKind::Bot);
        assert_eq!(message.sender_identity_id.as_deref(), Some("bot-1"));
    }

    #[tokio::test]
    async fn linked_sender_resolves_identity() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);
        store.add_contact_link("bot-1", "123", "cust-9");

        let raw = json!({ "uidFrom": "123", "msgType": "webchat", "content": "hi" });
        let IngestOutcome::Persisted { message } =
            pipeline.process("bot-1", &raw).await.unwrap()
        else {
            panic!()
        };
        assert_eq!(message.sender_identity_id.as_deref(), Some("cust-9"));
        assert_eq!(message.sender_kind, SenderKind::Customer);
    }

    #[tokio::test]
    async fn unknown_msg_type_is_stored_not_lost() {
        let (store, pipeline) = fixture();
        provision_conversation(&store);

        let raw = json!({ "uidFrom": "123", "msgType": "webcard", "content": "card" });
        let IngestOutcome::Persisted { message } =
            pipeline.process("bot-1", &raw).await.unwrap()
        else {
            panic!()
        };
        assert_eq!(
            message.content,
            MessageContent::Unsupported {
                kind: "webcard".to_string(),
                text: Some("card".to_string()),
            }
        );
        assert_eq!(store.message_count(), 1);
    }
}

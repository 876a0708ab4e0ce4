// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical domain types shared across the Botdesk workspace.
//!
//! A [`Message`] is the normalized, persisted representation of one chat
//! event, independent of the provider's wire format. Conversations carry a
//! denormalized snapshot of their most recent message so list screens never
//! need a join.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who authored a message, as resolved against the routing store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Bot,
    Staff,
    Customer,
    Unknown,
}

/// Delivery status for locally-originated messages.
///
/// Inbound messages are always stored as `Sent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Failed,
}

/// Whether a conversation is a 1:1 thread or a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// Participant kind for an [`Identity`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Bot,
    User,
}

/// Role of a staff account, used for recipient resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Agent,
}

/// Normalized message content, tagged by variant.
///
/// Unrecognized provider types land in `Unsupported` with the raw type tag
/// and whatever textual field was available, so nothing is silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Sticker {
        url: String,
    },
    Voice {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
    Unsupported {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// One normalized chat event.
///
/// `(conversation_id, external_id)` is the natural key: re-delivery of the
/// same external id must update, never duplicate, the stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Provider-native message id, or a generated fallback.
    pub external_id: String,
    /// Resolved internal identity of the sender; `None` when the sender
    /// could not be resolved from routing data.
    pub sender_identity_id: Option<String>,
    pub sender_kind: SenderKind,
    pub content: MessageContent,
    /// Provider event time when present, else ingestion time.
    pub sent_at: DateTime<Utc>,
    pub status: MessageStatus,
}

/// A thread container owned by one bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Identity id of the bot that owns this conversation.
    pub bot_identity_id: String,
    pub kind: ConversationKind,
    /// Provider-side thread id this conversation is bound to.
    pub external_thread_id: String,
    /// Snapshot of the most recently persisted message's content.
    /// Last-write-wins: updated unconditionally on every successful persist,
    /// even out of strict event-time order.
    pub last_message: Option<MessageContent>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A participant (bot or end-user) known by a stable provider-global id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub external_uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub kind: IdentityKind,
}

/// A staff user of the operator console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAccount {
    pub id: String,
    pub display_name: String,
    pub role: StaffRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_kind_round_trips_through_strings() {
        use std::str::FromStr;
        for kind in [
            SenderKind::Bot,
            SenderKind::Staff,
            SenderKind::Customer,
            SenderKind::Unknown,
        ] {
            let s = kind.to_string();
            assert_eq!(SenderKind::from_str(&s).unwrap(), kind);
        }
    }

    #[test]
    fn content_serializes_with_type_tag() {
        let content = MessageContent::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn unsupported_content_keeps_raw_kind() {
        let content = MessageContent::Unsupported {
            kind: "webcard".to_string(),
            text: Some("fallback".to_string()),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "unsupported");
        assert_eq!(json["kind"], "webcard");
    }

    #[test]
    fn image_content_omits_absent_optionals() {
        let content = MessageContent::Image {
            url: "https://cdn.example/pic.jpg".to_string(),
            thumbnail_url: None,
            caption: None,
        };
        let json = serde_json::to_value(&content).unwrap();
        assert!(json.get("thumbnail_url").is_none());
        assert!(json.get("caption").is_none());
    }

    #[test]
    fn message_round_trips_through_json() {
        let message = Message {
            id: "m-1".to_string(),
            conversation_id: "c-1".to_string(),
            external_id: "ext-1".to_string(),
            sender_identity_id: None,
            sender_kind: SenderKind::Customer,
            content: MessageContent::Text {
                text: "hello".to_string(),
            },
            sent_at: Utc::now(),
            status: MessageStatus::Sent,
        };
        let json = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }
}

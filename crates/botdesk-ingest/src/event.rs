// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw provider event shapes.
//!
//! The provider listener hands the pipeline arbitrary JSON. Events carrying
//! a readable message envelope (a `msgType` tag) parse into
//! [`MessageEvent`]; everything else stays an opaque
//! [`RawEvent::Unsupported`] value. Content classification is then a
//! value-level match on the parsed kind, never ad hoc field probing.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use strum::EnumString;

use botdesk_core::types::MessageContent;

/// Provider message-type tags with a canonical content mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ProviderKind {
    Webchat,
    Webpic,
    Websticker,
    Webvoice,
    Webvideo,
}

/// One inbound event with a recognizable message envelope.
///
/// All identifier fields are optional on the wire; the pipeline applies its
/// fallback chain before deciding whether the event is usable.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    /// Provider-native message id.
    #[serde(default, rename = "msgId")]
    pub external_id: Option<String>,
    #[serde(default, rename = "uidFrom")]
    pub sender_uid: Option<String>,
    #[serde(default, rename = "uidTo")]
    pub recipient_uid: Option<String>,
    /// Explicit thread root field.
    #[serde(default, rename = "roomId")]
    pub thread_uid: Option<String>,
    /// Secondary thread source field.
    #[serde(default, rename = "source")]
    pub source_uid: Option<String>,
    /// True when the bot itself authored this event.
    #[serde(default, rename = "isSelf")]
    pub self_authored: bool,
    /// Provider event time, milliseconds since the epoch.
    #[serde(default, rename = "timestamp")]
    pub sent_at_ms: Option<i64>,
    #[serde(rename = "msgType")]
    pub kind: String,
    /// Textual body; caption for media kinds.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "thumbUrl")]
    pub thumbnail_url: Option<String>,
    #[serde(default, rename = "duration")]
    pub duration_secs: Option<u32>,
}

impl MessageEvent {
    /// Resolve the provider thread id with the fallback chain: explicit
    /// root field, then the secondary source field, then the counter-party
    /// (recipient for self-authored events, sender otherwise).
    pub fn resolve_thread_uid(&self) -> Option<String> {
        non_empty(self.thread_uid.clone())
            .or_else(|| non_empty(self.source_uid.clone()))
            .or_else(|| {
                if self.self_authored {
                    non_empty(self.recipient_uid.clone())
                } else {
                    non_empty(self.sender_uid.clone())
                }
            })
    }

    /// Map the provider type tag to canonical content. Unrecognized tags
    /// fall back to `Unsupported` with the raw tag and any text available.
    pub fn classify(&self) -> MessageContent {
        match ProviderKind::from_str(&self.kind) {
            Ok(ProviderKind::Webchat) => MessageContent::Text {
                text: self.content.clone().unwrap_or_default(),
            },
            Ok(ProviderKind::Webpic) => MessageContent::Image {
                url: self.url.clone().unwrap_or_default(),
                thumbnail_url: self.thumbnail_url.clone(),
                caption: self.content.clone(),
            },
            Ok(ProviderKind::Websticker) => MessageContent::Sticker {
                url: self.url.clone().unwrap_or_default(),
            },
            Ok(ProviderKind::Webvoice) => MessageContent::Voice {
                url: self.url.clone().unwrap_or_default(),
                duration_secs: self.duration_secs,
            },
            Ok(ProviderKind::Webvideo) => MessageContent::Video {
                url: self.url.clone().unwrap_or_default(),
                thumbnail_url: self.thumbnail_url.clone(),
                duration_secs: self.duration_secs,
            },
            Err(_) => MessageContent::Unsupported {
                kind: self.kind.clone(),
                text: self.content.clone(),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Tagged union over the raw event shapes the pipeline accepts.
#[derive(Debug, Clone)]
pub enum RawEvent {
    Message(MessageEvent),
    /// Anything without a readable message envelope, kept whole.
    Unsupported(Value),
}

impl RawEvent {
    /// Classify a raw JSON value by the presence of a `msgType` tag.
    pub fn parse(raw: &Value) -> Self {
        if raw.get("msgType").and_then(Value::as_str).is_some() {
            match serde_json::from_value::<MessageEvent>(raw.clone()) {
                Ok(event) => Self::Message(event),
                Err(_) => Self::Unsupported(raw.clone()),
            }
        } else {
            Self::Unsupported(raw.clone())
        }
    }
}

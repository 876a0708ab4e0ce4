// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat-provider bridge.
//!
//! The bridge is the process that actually holds the bot's provider
//! session. This client covers the two calls the console core needs:
//! sending a text message into a thread and fetching thread metadata.
//! Login and QR flows stay on the bridge side entirely.

use std::str::FromStr;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use botdesk_core::types::ConversationKind;
use botdesk_core::{BotdeskError, MessageReceipt, ProviderClient, ThreadInfo};

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendTextResponse {
    #[serde(rename = "msgId")]
    msg_id: String,
    /// Epoch milliseconds, when the bridge reports one.
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ThreadInfoResponse {
    #[serde(rename = "threadId")]
    thread_id: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// HTTP [`ProviderClient`] backed by the bridge's REST surface.
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProviderClient {
    /// Build a client against the bridge at `base_url`, optionally
    /// authenticating every request with a bearer token.
    pub fn new(base_url: &str, api_token: Option<&str>) -> Result<Self, BotdeskError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| BotdeskError::Config(format!("invalid provider api token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BotdeskError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn read_error(response: reqwest::Response, context: &str) -> BotdeskError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        BotdeskError::Provider {
            message: format!("{context}: bridge returned {status}: {body}"),
            source: None,
        }
    }
}

#[async_trait::async_trait]
impl ProviderClient for HttpProviderClient {
    async fn send_text(
        &self,
        bot_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<MessageReceipt, BotdeskError> {
        let url = format!(
            "{}/bots/{bot_id}/threads/{thread_id}/messages",
            self.base_url
        );
        let response = self
            .client
            .post(&url)
            .json(&SendTextRequest { text })
            .send()
            .await
            .map_err(|e| BotdeskError::Provider {
                message: format!("send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(Self::read_error(response, "send_text").await);
        }

        let body: SendTextResponse =
            response.json().await.map_err(|e| BotdeskError::Provider {
                message: format!("send response was not valid JSON: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(bot_id, thread_id, external_id = %body.msg_id, "bridge accepted outbound message");

        Ok(MessageReceipt {
            external_id: body.msg_id,
            sent_at: body
                .timestamp
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        })
    }

    async fn thread_info(
        &self,
        bot_id: &str,
        thread_id: &str,
    ) -> Result<ThreadInfo, BotdeskError> {
        let url = format!("{}/bots/{bot_id}/threads/{thread_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BotdeskError::Provider {
                message: format!("thread info request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(Self::read_error(response, "thread_info").await);
        }

        let body: ThreadInfoResponse =
            response.json().await.map_err(|e| BotdeskError::Provider {
                message: format!("thread info response was not valid JSON: {e}"),
                source: Some(Box::new(e)),
            })?;

        let kind = body
            .kind
            .as_deref()
            .and_then(|k| ConversationKind::from_str(k).ok())
            .unwrap_or(ConversationKind::Direct);

        Ok(ThreadInfo {
            external_thread_id: body.thread_id,
            kind,
            title: body.title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_text_posts_and_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bots/bot-1/threads/123/messages"))
            .and(body_json(json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "msgId": "prov-42",
                "timestamp": 1_700_000_000_000i64
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpProviderClient::new(&server.uri(), None).unwrap();
        let receipt = client.send_text("bot-1", "123", "hello").await.unwrap();

        assert_eq!(receipt.external_id, "prov-42");
        assert!(receipt.sent_at.is_some());
    }

    #[tokio::test]
    async fn api_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bots/bot-1/threads/123/messages"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"msgId": "prov-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpProviderClient::new(&server.uri(), Some("secret-token")).unwrap();
        client.send_text("bot-1", "123", "hi").await.unwrap();
    }

    #[tokio::test]
    async fn bridge_error_surfaces_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("session lost"))
            .mount(&server)
            .await;

        let client = HttpProviderClient::new(&server.uri(), None).unwrap();
        let err = client.send_text("bot-1", "123", "hi").await.unwrap_err();

        let BotdeskError::Provider { message, .. } = err else {
            panic!("expected provider error");
        };
        assert!(message.contains("502"));
        assert!(message.contains("session lost"));
    }

    #[tokio::test]
    async fn thread_info_maps_kind_and_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bots/bot-1/threads/room-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "threadId": "room-9",
                "kind": "group",
                "title": "Support room"
            })))
            .mount(&server)
            .await;

        let client = HttpProviderClient::new(&server.uri(), None).unwrap();
        let info = client.thread_info("bot-1", "room-9").await.unwrap();

        assert_eq!(info.external_thread_id, "room-9");
        assert_eq!(info.kind, ConversationKind::Group);
        assert_eq!(info.title.as_deref(), Some("Support room"));
    }

    #[tokio::test]
    async fn unknown_kind_defaults_to_direct() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bots/bot-1/threads/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"threadId": "123"})),
            )
            .mount(&server)
            .await;

        let client = HttpProviderClient::new(&server.uri(), None).unwrap();
        let info = client.thread_info("bot-1", "123").await.unwrap();
        assert_eq!(info.kind, ConversationKind::Direct);
    }
}

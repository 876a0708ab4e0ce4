// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles the bridge event webhook, topic subscription control, outbound
//! sends, and the public health endpoint. The operator stream itself lives
//! in [`crate::sse`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use botdesk_core::types::Message;
use botdesk_core::BotdeskError;
use botdesk_ingest::IngestOutcome;

use crate::auth::OperatorId;
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(err: &BotdeskError) -> Response {
    error!(%err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal error".to_string(),
        }),
    )
        .into_response()
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connected_clients: usize,
}

/// GET /health (unauthenticated, for probes).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        connected_clients: state.registry.client_count().await,
    })
}

/// Response body for the bridge event webhook.
#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// POST /v1/bots/{bot_id}/events (bridge auth).
///
/// One raw provider event per request. Skipped events are still `202`:
/// from the bridge's point of view the delivery was consumed either way,
/// and it must not retry.
pub async fn post_events(
    State(state): State<GatewayState>,
    Path(bot_id): Path<String>,
    Json(raw): Json<Value>,
) -> Response {
    match state.pipeline.process(&bot_id, &raw).await {
        Ok(IngestOutcome::Persisted { .. }) => (
            StatusCode::ACCEPTED,
            Json(EventAccepted {
                outcome: "persisted".to_string(),
                reason: None,
            }),
        )
            .into_response(),
        Ok(IngestOutcome::Skipped(reason)) => (
            StatusCode::ACCEPTED,
            Json(EventAccepted {
                outcome: "skipped".to_string(),
                reason: Some(reason.to_string()),
            }),
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

/// Topic action carried by POST /v1/stream/topics.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicAction {
    Subscribe,
    Unsubscribe,
}

/// Request body for POST /v1/stream/topics.
#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub topic: String,
    pub action: TopicAction,
}

/// POST /v1/stream/topics (operator auth).
///
/// Both directions are idempotent no-ops when the precondition is absent
/// (no live connection, unknown topic), so this always returns 204.
pub async fn post_topics(
    State(state): State<GatewayState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Json(body): Json<TopicRequest>,
) -> StatusCode {
    match body.action {
        TopicAction::Subscribe => state.registry.subscribe(&operator_id, &body.topic).await,
        TopicAction::Unsubscribe => {
            state.registry.unsubscribe(&operator_id, &body.topic).await
        }
    }
    StatusCode::NO_CONTENT
}

/// Request body for POST /v1/conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Response body for a completed send. `status` tells the console whether
/// the bridge accepted the message.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    #[serde(flatten)]
    pub message: Message,
}

/// POST /v1/conversations/{id}/messages (operator auth).
pub async fn post_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    if body.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    match state.outbound.send_text(&conversation_id, &body.text).await {
        Ok(Some(message)) => Json(SendMessageResponse { message }).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no conversation {conversation_id}"),
            }),
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use botdesk_core::BotdeskError;
use botdesk_dispatch::OutboundSender;
use botdesk_ingest::IngestPipeline;
use botdesk_realtime::ClientRegistry;

use crate::auth::{bridge_auth, operator_auth, AuthState};
use crate::handlers;
use crate::sse;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Live operator connections and topic subscriptions.
    pub registry: Arc<ClientRegistry>,
    /// Processes raw bridge events into persisted messages.
    pub pipeline: Arc<IngestPipeline>,
    /// Drives staff-authored sends through the bridge.
    pub outbound: Arc<OutboundSender>,
    /// Authentication configuration.
    pub auth: AuthState,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
    /// Per-connection frame buffer size.
    pub client_buffer: usize,
}

/// Gateway server configuration (mirrors ServerConfig from botdesk-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the full gateway router.
///
/// Routes:
/// - GET  /health                              (public)
/// - GET  /v1/stream                           (operator auth, SSE)
/// - POST /v1/stream/topics                    (operator auth)
/// - POST /v1/conversations/{id}/messages      (operator auth)
/// - POST /v1/bots/{bot_id}/events             (bridge auth)
pub fn build_router(state: GatewayState) -> Router {
    let auth = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let operator_routes = Router::new()
        .route("/v1/stream", get(sse::stream_events))
        .route("/v1/stream/topics", post(handlers::post_topics))
        .route(
            "/v1/conversations/{id}/messages",
            post(handlers::post_messages),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth.clone(),
            operator_auth,
        ))
        .with_state(state.clone());

    let bridge_routes = Router::new()
        .route("/v1/bots/{bot_id}/events", post(handlers::post_events))
        .route_layer(axum_middleware::from_fn_with_state(auth, bridge_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(operator_routes)
        .merge(bridge_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
///
/// Serves until `shutdown` is cancelled, then drains in-flight requests.
/// Long-lived SSE responses end when their registry entries are dropped.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), BotdeskError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| BotdeskError::Http {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BotdeskError::Http {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use botdesk_core::types::{Conversation, ConversationKind};
    use botdesk_dispatch::Dispatcher;
    use botdesk_realtime::RetryPolicy;
    use botdesk_test_utils::{MemoryDirectory, MockProvider, RecordingRevoker};

    use crate::auth::OperatorTokens;

    fn test_state() -> (Arc<MemoryDirectory>, GatewayState) {
        let store = Arc::new(MemoryDirectory::default());
        let registry = ClientRegistry::new(
            Arc::new(RecordingRevoker::default()),
            RetryPolicy::default(),
        );
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), registry.clone()));
        let pipeline = Arc::new(IngestPipeline::new(store.clone(), dispatcher.clone()));
        let outbound = Arc::new(OutboundSender::new(
            store.clone(),
            MockProvider::succeeding("prov-1"),
            dispatcher,
        ));

        let mut operator_tokens = std::collections::HashMap::new();
        operator_tokens.insert("op-alice".to_string(), "token-a".to_string());
        let state = GatewayState {
            registry,
            pipeline,
            outbound,
            auth: AuthState {
                operators: OperatorTokens::from_config(&operator_tokens),
                bridge_token: Some("bridge-secret".to_string()),
            },
            start_time: Instant::now(),
            client_buffer: 16,
        };
        (store, state)
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

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_store, state) = test_state();
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connected_clients"], 0);
    }

    #[tokio::test]
    async fn operator_routes_reject_missing_and_bad_tokens() {
        let (_store, state) = test_state();
        let app = build_router(state);

        let no_token = app
            .clone()
            .oneshot(
                Request::post("/v1/stream/topics")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"topic": "t", "action": "subscribe"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(no_token.status(), StatusCode::UNAUTHORIZED);

        let bad_token = app
            .oneshot(
                Request::post("/v1/stream/topics")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"topic": "t", "action": "subscribe"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_requires_bridge_token() {
        let (store, state) = test_state();
        provision_conversation(&store);
        let app = build_router(state);

        let unauthorized = app
            .clone()
            .oneshot(
                Request::post("/v1/bots/bot-1/events")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"uidFrom": "123", "msgType": "webchat", "content": "hi"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.message_count(), 0);

        let accepted = app
            .oneshot(
                Request::post("/v1/bots/bot-1/events")
                    .header(header::AUTHORIZATION, "Bearer bridge-secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"uidFrom": "123", "msgType": "webchat", "content": "hi"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);
        let body = body_json(accepted).await;
        assert_eq!(body["outcome"], "persisted");
        assert_eq!(store.message_count(), 1);
    }

    #[tokio::test]
    async fn skipped_event_is_still_accepted() {
        let (_store, state) = test_state();
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/v1/bots/bot-1/events")
                    .header(header::AUTHORIZATION, "Bearer bridge-secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"uidFrom": "999", "msgType": "webchat", "content": "hi"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["outcome"], "skipped");
        assert_eq!(body["reason"], "unknown_conversation");
    }

    #[tokio::test]
    async fn send_message_round_trips() {
        let (store, state) = test_state();
        provision_conversation(&store);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/v1/conversations/c-1/messages")
                    .header(header::AUTHORIZATION, "Bearer token-a")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"text": "hello"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "sent");
        assert_eq!(body["external_id"], "prov-1");
    }

    #[tokio::test]
    async fn send_to_unknown_conversation_is_404() {
        let (_store, state) = test_state();
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/v1/conversations/ghost/messages")
                    .header(header::AUTHORIZATION, "Bearer token-a")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"text": "hello"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let (store, state) = test_state();
        provision_conversation(&store);
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/v1/conversations/c-1/messages")
                    .header(header::AUTHORIZATION, "Bearer token-a")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"text": "  "}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn topic_subscription_registers_interest() {
        let (_store, state) = test_state();
        let registry = state.registry.clone();
        registry
            .add_client("op-alice", botdesk_test_utils::RecordingSink::shared())
            .await;
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/v1/stream/topics")
                    .header(header::AUTHORIZATION, "Bearer token-a")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"topic": "bot-status", "action": "subscribe"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(registry.topic_exists("bot-status").await);
    }

    #[tokio::test]
    async fn reconnect_survives_stale_stream_teardown() {
        let (_store, state) = test_state();
        let registry = state.registry.clone();
        let app = build_router(state);

        let stream_request = || {
            Request::get("/v1/stream")
                .header(header::AUTHORIZATION, "Bearer token-a")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(stream_request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Reconnect under the same operator id. This replaces the first
        // registration and closes the first stream's channel.
        let second = app.oneshot(stream_request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert!(registry.is_connected("op-alice").await);

        // The stale stream winds down on its own; draining it to completion
        // fires its teardown.
        let stale_body = first.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&stale_body).contains("connected"));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The fresh registration is still live.
        assert!(registry.is_connected("op-alice").await);
        drop(second);
    }
}

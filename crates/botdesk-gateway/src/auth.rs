// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the gateway.
//!
//! Two independent surfaces:
//! 1. Operator endpoints: static bearer tokens mapped to operator ids.
//! 2. Bridge webhook: one shared token presented by the provider bridge.
//!
//! Both fail closed: an empty token map (or an unset bridge token) rejects
//! every request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::RwLock;

use botdesk_core::SessionRevoker;

/// Operator id resolved by the auth middleware, attached as a request
/// extension.
#[derive(Debug, Clone)]
pub struct OperatorId(pub String);

/// Live token table for operator authentication.
///
/// Tokens are seeded from config and can be revoked at runtime; forced
/// logout removes every token belonging to the operator, so the next
/// request (and the SSE reconnect) comes back 401 until re-provisioned.
#[derive(Clone)]
pub struct OperatorTokens {
    /// token -> operator id
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl OperatorTokens {
    /// Build the table from the config map (operator id -> token).
    pub fn from_config(operator_tokens: &HashMap<String, String>) -> Self {
        let tokens = operator_tokens
            .iter()
            .map(|(operator_id, token)| (token.clone(), operator_id.clone()))
            .collect();
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
        }
    }

    /// Resolve a presented token to its operator id.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }

    /// Remove every token belonging to `operator_id`.
    pub async fn revoke_operator(&self, operator_id: &str) {
        self.tokens
            .write()
            .await
            .retain(|_, owner| owner != operator_id);
    }
}

impl std::fmt::Debug for OperatorTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorTokens").finish_non_exhaustive()
    }
}

/// Authentication state shared by the middleware layers.
#[derive(Clone)]
pub struct AuthState {
    pub operators: OperatorTokens,
    /// Shared webhook token; `None` rejects all bridge deliveries.
    pub bridge_token: Option<String>,
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware for operator endpoints. Resolves the bearer token to an
/// operator id and attaches it as an [`OperatorId`] extension.
pub async fn operator_auth(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(&request) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(operator_id) = auth.operators.resolve(token).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    request.extensions_mut().insert(OperatorId(operator_id));
    Ok(next.run(request).await)
}

/// Middleware for the bridge webhook. A single shared token, fail-closed
/// when unconfigured.
pub async fn bridge_auth(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bridge_token.as_deref() else {
        tracing::error!("no bridge token configured, rejecting webhook delivery");
        return Err(StatusCode::UNAUTHORIZED);
    };
    match bearer_token(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// [`SessionRevoker`] that invalidates the operator's static tokens.
///
/// Fired by the registry when delivery retries are exhausted; the SSE
/// stream is already torn down by then, so dropping the tokens is what
/// forces a fresh login.
pub struct TokenRevoker {
    tokens: OperatorTokens,
}

impl TokenRevoker {
    pub fn new(tokens: OperatorTokens) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl SessionRevoker for TokenRevoker {
    async fn force_logout(&self, operator_id: &str) {
        tracing::warn!(operator_id, "revoking operator tokens");
        self.tokens.revoke_operator(operator_id).await;
    }
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE gateway for the Botdesk operator console.
//!
//! Serves the operator event stream, topic control, outbound sends, the
//! bridge event webhook, and the public health probe.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::{AuthState, OperatorTokens, TokenRevoker};
pub use server::{build_router, start_server, GatewayState, ServerConfig};
pub use sse::ChannelSink;

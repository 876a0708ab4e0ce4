// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam between the registry and a live operator connection.
//!
//! The registry never sees sockets. It addresses a [`ClientSink`], and the
//! gateway implements the sink over whatever transport carries the stream.

use async_trait::async_trait;
use thiserror::Error;

use crate::frame::Frame;

/// A single failed delivery attempt against one connection.
#[derive(Debug, Error)]
#[error("client sink rejected frame: {0}")]
pub struct SinkError(pub String);

/// A live delivery channel for one operator.
///
/// `deliver` must not block indefinitely: a stalled or closed transport
/// returns an error so the registry can enter its retry path.
#[async_trait]
pub trait ClientSink: Send + Sync {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError>;
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events transport for operator streams.
//!
//! `GET /v1/stream` registers the operator in the connection registry and
//! returns a long-lived SSE response. Frames delivered by the registry are
//! pushed through a bounded channel; a full buffer counts as a delivery
//! failure, which puts the slow client on the registry's retry path.
//!
//! SSE wire format:
//! ```text
//! event: new_message
//! data: {"message": ...}
//!
//! : ping
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Extension;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use botdesk_realtime::{ClientRegistry, ClientSink, Frame, SinkError};

use crate::auth::OperatorId;
use crate::server::GatewayState;

/// Opening event sent on every new stream.
pub const CONNECTED_EVENT: &str = "connected";

/// [`ClientSink`] backed by the bounded per-connection channel.
///
/// `deliver` never waits: a full buffer or a gone consumer is an
/// immediate [`SinkError`], and the registry takes it from there.
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl ClientSink for ChannelSink {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.tx.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SinkError("client buffer full".to_string()),
            mpsc::error::TrySendError::Closed(_) => {
                SinkError("client disconnected".to_string())
            }
        })
    }
}

/// Deregisters the operator when the SSE response body is dropped.
///
/// Keyed by the registration generation: after a reconnect the replaced
/// stream still winds down and drops its guard, and that teardown must not
/// take the fresh registration with it.
struct DisconnectGuard {
    registry: Arc<ClientRegistry>,
    operator_id: String,
    generation: u64,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let operator_id = std::mem::take(&mut self.operator_id);
        let generation = self.generation;
        tokio::spawn(async move {
            debug!(%operator_id, "stream closed, deregistering");
            registry.remove_client_if(&operator_id, generation).await;
        });
    }
}

fn frame_to_sse(frame: &Frame) -> Event {
    match frame {
        Frame::Event { name, data } => Event::default().event(name).data(data.to_string()),
        Frame::Ping => Event::default().comment("ping"),
    }
}

/// Open the operator event stream.
///
/// A reconnect under the same operator id replaces the previous
/// registration; the old stream's channel closes and its response body
/// winds down on its own.
pub async fn stream_events(
    State(state): State<GatewayState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (sink, rx) = ChannelSink::new(state.client_buffer);
    let generation = state.registry.add_client(&operator_id, sink).await;
    debug!(%operator_id, "operator stream opened");

    let opening = Frame::event(CONNECTED_EVENT, json!({ "operator_id": operator_id }));
    let guard = DisconnectGuard {
        registry: state.registry.clone(),
        operator_id,
        generation,
    };

    let stream = stream::once(std::future::ready(frame_to_sse(&opening)))
        .chain(stream::unfold(
            (rx, guard),
            |(mut rx, guard)| async move {
                rx.recv()
                    .await
                    .map(|frame| (frame_to_sse(&frame), (rx, guard)))
            },
        ))
        .map(Ok);

    Sse::new(stream)
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`ClientSink`] and [`SessionRevoker`] implementations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use botdesk_core::SessionRevoker;
use botdesk_realtime::{ClientSink, Frame, SinkError};

/// A sink that records every delivered frame.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
}

impl RecordingSink {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn frames(&self) -> Vec<Frame> {
        self.frames.lock().await.clone()
    }

    pub async fn frame_count(&self) -> usize {
        self.frames.lock().await.len()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.frames.lock().await.push(frame);
        Ok(())
    }
}

/// A sink that rejects its first `failures` deliveries, then records the
/// rest. Drives the retry path without any real transport stall.
pub struct FlakySink {
    remaining_failures: AtomicUsize,
    delivered: Mutex<Vec<Frame>>,
}

impl FlakySink {
    pub fn shared(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining_failures: AtomicUsize::new(failures),
            delivered: Mutex::new(Vec::new()),
        })
    }

    pub async fn delivered(&self) -> Vec<Frame> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl ClientSink for FlakySink {
    async fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError("scripted failure".to_string()));
        }
        self.delivered.lock().await.push(frame);
        Ok(())
    }
}

/// A revoker that records each forced logout.
#[derive(Default)]
pub struct RecordingRevoker {
    logouts: Mutex<Vec<String>>,
}

impl RecordingRevoker {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn logouts(&self) -> Vec<String> {
        self.logouts.lock().await.clone()
    }
}

#[async_trait]
impl SessionRevoker for RecordingRevoker {
    async fn force_logout(&self, operator_id: &str) {
        self.logouts.lock().await.push(operator_id.to_string());
    }
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider bridge mock with scripted send outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use botdesk_core::types::ConversationKind;
use botdesk_core::{BotdeskError, MessageReceipt, ProviderClient, ThreadInfo};

enum SendScript {
    Succeed { external_id: String },
    Fail,
}

/// A [`ProviderClient`] that records sends and returns a scripted outcome.
pub struct MockProvider {
    script: SendScript,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MockProvider {
    /// Every send succeeds with the given provider message id.
    pub fn succeeding(external_id: &str) -> Arc<Self> {
        Arc::new(Self {
            script: SendScript::Succeed {
                external_id: external_id.to_string(),
            },
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Every send fails with a provider error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: SendScript::Fail,
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Recorded `(bot_id, thread_id, text)` tuples, in call order.
    pub async fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn send_text(
        &self,
        bot_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<MessageReceipt, BotdeskError> {
        self.sent
            .lock()
            .await
            .push((bot_id.to_string(), thread_id.to_string(), text.to_string()));
        match &self.script {
            SendScript::Succeed { external_id } => Ok(MessageReceipt {
                external_id: external_id.clone(),
                sent_at: None,
            }),
            SendScript::Fail => Err(BotdeskError::Provider {
                message: "scripted send failure".to_string(),
                source: None,
            }),
        }
    }

    async fn thread_info(
        &self,
        _bot_id: &str,
        thread_id: &str,
    ) -> Result<ThreadInfo, BotdeskError> {
        Ok(ThreadInfo {
            external_thread_id: thread_id.to_string(),
            kind: ConversationKind::Direct,
            title: None,
        })
    }
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `botdesk serve` command implementation.
//!
//! Wires the SQLite directory store, the connection registry, the ingestion
//! pipeline, the dispatcher, the provider bridge client, and the HTTP
//! gateway, then serves until a shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use botdesk_config::model::BotdeskConfig;
use botdesk_core::{BotdeskError, DirectoryStore, ProviderClient};
use botdesk_dispatch::{Dispatcher, OutboundSender};
use botdesk_gateway::{
    server, AuthState, GatewayState, OperatorTokens, ServerConfig, TokenRevoker,
};
use botdesk_ingest::IngestPipeline;
use botdesk_provider::HttpProviderClient;
use botdesk_realtime::{run_heartbeat, ClientRegistry, RetryPolicy};
use botdesk_storage::SqliteDirectoryStore;

use crate::shutdown;

/// Runs the `botdesk serve` command.
pub async fn run_serve(config: BotdeskConfig) -> Result<(), BotdeskError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting botdesk serve");

    let store = Arc::new(SqliteDirectoryStore::open(&config.storage).await?);
    let directory: Arc<dyn DirectoryStore> = store.clone();

    let tokens = OperatorTokens::from_config(&config.server.operator_tokens);
    let revoker = Arc::new(TokenRevoker::new(tokens.clone()));
    let registry = ClientRegistry::new(
        revoker,
        RetryPolicy::from_secs(&config.realtime.retry_backoff_secs),
    );

    let dispatcher = Arc::new(Dispatcher::new(directory.clone(), registry.clone()));
    let pipeline = Arc::new(IngestPipeline::new(directory.clone(), dispatcher.clone()));

    let provider: Arc<dyn ProviderClient> = Arc::new(HttpProviderClient::new(
        &config.provider.base_url,
        config.provider.api_token.as_deref(),
    )?);
    let outbound = Arc::new(OutboundSender::new(directory, provider, dispatcher));

    let cancel = shutdown::install_signal_handler();

    let heartbeat = tokio::spawn(run_heartbeat(
        registry.clone(),
        Duration::from_secs(config.realtime.heartbeat_interval_secs),
        cancel.clone(),
    ));

    let state = GatewayState {
        registry,
        pipeline,
        outbound,
        auth: AuthState {
            operators: tokens,
            bridge_token: config.server.bridge_token.clone(),
        },
        start_time: Instant::now(),
        client_buffer: config.realtime.client_buffer,
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    server::start_server(&server_config, state, cancel.clone()).await?;

    let _ = heartbeat.await;
    store.close().await?;

    info!("botdesk serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("botdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic liveness pings for connected operators.
//!
//! Every interval tick the loop sends a no-data ping frame to every
//! connected client; a failed ping is an immediate disconnect. The loop
//! exits when the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::registry::ClientRegistry;

/// Run the heartbeat loop until cancelled.
///
/// The first ping fires one full period after startup, not immediately.
pub async fn run_heartbeat(
    registry: Arc<ClientRegistry>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval's first tick completes immediately; consume it so pings
    // start one period in.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("heartbeat loop stopped");
                return;
            }
            _ = ticker.tick() => {
                registry.ping_all().await;
            }
        }
    }
}

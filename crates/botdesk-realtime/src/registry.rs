// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection registry: live operator channels, topic interest, and
//! best-effort retried delivery.
//!
//! One registry instance exists per process, constructed explicitly at
//! startup and injected into every component that delivers events. Both maps
//! live behind a single async mutex so compound operations (replace a
//! connection, scrub an operator from every topic) are atomic with respect
//! to concurrent delivery.
//!
//! Per-client state machine:
//! `CONNECTED -> SEND_FAILED(attempt 1..n, backoff) -> { redelivered ->
//! CONNECTED | exhausted -> DEAD (evicted + forced logout) }`. A DEAD client
//! is never resurrected by the registry; only a fresh `add_client` brings
//! the operator id back.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use botdesk_core::SessionRevoker;

use crate::frame::Frame;
use crate::sink::ClientSink;

/// Backoff schedule for delivery retries.
///
/// The list length is the number of retries after the immediate attempt;
/// exhausting it declares the client dead.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn from_secs(secs: &[u64]) -> Self {
        Self {
            backoff: secs.iter().map(|s| Duration::from_secs(*s)).collect(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(&[5, 15, 40])
    }
}

/// Outcome of one multicast or broadcast call.
///
/// Missing recipients are an observation, not an error; retrying recipients
/// resolve in the background without ever surfacing to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients whose immediate attempt succeeded.
    pub delivered: Vec<String>,
    /// Recipients with no live connection at call time.
    pub missing: Vec<String>,
    /// Recipients whose immediate attempt failed and entered the retry path.
    pub retrying: Vec<String>,
}

struct ClientEntry {
    sink: Arc<dyn ClientSink>,
    /// Monotonic per-registration marker. Teardown paths that captured an
    /// older generation (a replaced stream, an exhausted retry sequence)
    /// compare against it and leave the current registration alone.
    generation: u64,
}

#[derive(Default)]
struct Inner {
    clients: HashMap<String, ClientEntry>,
    /// topic -> subscriber set; an entry is removed entirely once its set
    /// empties (no tombstones).
    topics: HashMap<String, BTreeSet<String>>,
    next_generation: u64,
}

impl Inner {
    fn evict(&mut self, operator_id: &str) -> bool {
        let existed = self.clients.remove(operator_id).is_some();
        self.topics.retain(|_, subscribers| {
            subscribers.remove(operator_id);
            !subscribers.is_empty()
        });
        existed
    }
}

/// Owns all live operator connections and topic subscriptions.
pub struct ClientRegistry {
    inner: Mutex<Inner>,
    revoker: Arc<dyn SessionRevoker>,
    policy: RetryPolicy,
    // Handle to self for background retry tasks. A task that outlives the
    // registry simply stops.
    weak: Weak<ClientRegistry>,
}

impl ClientRegistry {
    pub fn new(revoker: Arc<dyn SessionRevoker>, policy: RetryPolicy) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            inner: Mutex::new(Inner::default()),
            revoker,
            policy,
            weak: weak.clone(),
        })
    }

    /// Register or replace the connection for `operator_id`.
    ///
    /// Idempotent overwrite: a reconnect under the same id replaces the
    /// previous entry, and any in-flight retry re-resolves the new sink on
    /// its next attempt. Returns the generation of the new registration,
    /// for use with [`remove_client_if`](Self::remove_client_if).
    pub async fn add_client(&self, operator_id: &str, sink: Arc<dyn ClientSink>) -> u64 {
        let mut inner = self.inner.lock().await;
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let replaced = inner
            .clients
            .insert(operator_id.to_string(), ClientEntry { sink, generation })
            .is_some();
        debug!(operator_id, generation, replaced, "client registered");
        generation
    }

    /// Delete the connection and remove the operator from every topic,
    /// pruning topics whose subscriber set empties.
    ///
    /// Returns whether a connection was actually removed.
    pub async fn remove_client(&self, operator_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let existed = inner.evict(operator_id);
        if existed {
            debug!(operator_id, "client removed");
        }
        existed
    }

    /// Delete the connection only if the registration from `generation` is
    /// still the live one.
    ///
    /// Teardown that raced a reconnect (a replaced stream winding down, a
    /// retry sequence exhausting against an already-replaced entry) is a
    /// no-op here; the fresh registration stays untouched.
    pub async fn remove_client_if(&self, operator_id: &str, generation: u64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.clients.get(operator_id) {
            Some(entry) if entry.generation == generation => {
                inner.evict(operator_id);
                debug!(operator_id, generation, "client removed");
                true
            }
            _ => {
                debug!(operator_id, generation, "stale removal ignored");
                false
            }
        }
    }

    /// Subscribe the operator to a topic. No-op without a live connection.
    pub async fn subscribe(&self, operator_id: &str, topic: &str) {
        let mut inner = self.inner.lock().await;
        if !inner.clients.contains_key(operator_id) {
            debug!(operator_id, topic, "subscribe ignored: no live connection");
            return;
        }
        inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(operator_id.to_string());
    }

    /// Unsubscribe the operator from a topic. No-op if the topic does not
    /// exist; prunes the topic when its subscriber set empties.
    pub async fn unsubscribe(&self, operator_id: &str, topic: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(subscribers) = inner.topics.get_mut(topic) {
            subscribers.remove(operator_id);
            if subscribers.is_empty() {
                inner.topics.remove(topic);
            }
        }
    }

    /// Deliver a named event to an explicit list of operator ids.
    ///
    /// Ids with no live connection are counted as missing, never an error.
    /// An empty recipient list is a no-op. Delivery failures are retried in
    /// the background and invisible to the caller.
    pub async fn multicast(
        &self,
        recipients: &[String],
        event: &str,
        payload: Value,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if recipients.is_empty() {
            return report;
        }
        let frame = Frame::event(event, payload);

        let mut targets: Vec<(String, Arc<dyn ClientSink>, u64)> = Vec::new();
        {
            let inner = self.inner.lock().await;
            for operator_id in recipients {
                match inner.clients.get(operator_id) {
                    Some(entry) => {
                        targets.push((operator_id.clone(), entry.sink.clone(), entry.generation))
                    }
                    None => report.missing.push(operator_id.clone()),
                }
            }
        }

        for (operator_id, sink, generation) in targets {
            match sink.deliver(frame.clone()).await {
                Ok(()) => report.delivered.push(operator_id),
                Err(err) => {
                    warn!(%operator_id, %err, "immediate delivery failed, scheduling retries");
                    self.spawn_retry(operator_id.clone(), frame.clone(), generation);
                    report.retrying.push(operator_id);
                }
            }
        }
        report
    }

    /// Deliver a named event to every current subscriber of `topic`.
    ///
    /// No-op if the topic has no subscribers.
    pub async fn broadcast(&self, topic: &str, event: &str, payload: Value) -> DeliveryReport {
        let subscribers: Vec<String> = {
            let inner = self.inner.lock().await;
            inner
                .topics
                .get(topic)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        };
        self.multicast(&subscribers, event, payload).await
    }

    /// Send a liveness ping to every connected client.
    ///
    /// A failed ping is an immediate disconnect: the client is removed
    /// without entering the retry path, and without a forced logout.
    pub async fn ping_all(&self) {
        let targets: Vec<(String, Arc<dyn ClientSink>, u64)> = {
            let inner = self.inner.lock().await;
            inner
                .clients
                .iter()
                .map(|(id, entry)| (id.clone(), entry.sink.clone(), entry.generation))
                .collect()
        };
        for (operator_id, sink, generation) in targets {
            if let Err(err) = sink.deliver(Frame::Ping).await {
                warn!(%operator_id, %err, "liveness ping failed, dropping connection");
                self.remove_client_if(&operator_id, generation).await;
            }
        }
    }

    /// Number of live connections.
    pub async fn client_count(&self) -> usize {
        self.inner.lock().await.clients.len()
    }

    /// Whether the operator currently has a live connection.
    pub async fn is_connected(&self, operator_id: &str) -> bool {
        self.inner.lock().await.clients.contains_key(operator_id)
    }

    /// Whether the topic currently has any subscribers.
    pub async fn topic_exists(&self, topic: &str) -> bool {
        self.inner.lock().await.topics.contains_key(topic)
    }

    /// Drive the bounded retry sequence for one operator.
    ///
    /// Each attempt re-resolves whatever connection is currently registered,
    /// so a reconnect during the backoff window is transparently picked up;
    /// a missing entry cancels the sequence. Exhausting the schedule evicts
    /// the client and fires the forced-logout hook exactly once, but only
    /// while the registration that failed the last attempt is still the
    /// live one; a reconnect that lands after the final failure survives.
    fn spawn_retry(&self, operator_id: String, frame: Frame, mut generation: u64) {
        let weak = self.weak.clone();
        let backoff = self.policy.backoff.clone();
        tokio::spawn(async move {
            for (attempt, delay) in backoff.iter().enumerate() {
                tokio::time::sleep(*delay).await;
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                let sink = {
                    let inner = registry.inner.lock().await;
                    match inner.clients.get(&operator_id) {
                        Some(entry) => {
                            generation = entry.generation;
                            entry.sink.clone()
                        }
                        None => {
                            debug!(%operator_id, "retry cancelled: connection no longer registered");
                            return;
                        }
                    }
                };
                match sink.deliver(frame.clone()).await {
                    Ok(()) => {
                        debug!(%operator_id, attempt = attempt + 1, "redelivery succeeded");
                        return;
                    }
                    Err(err) => {
                        warn!(%operator_id, attempt = attempt + 1, %err, "redelivery failed");
                    }
                }
            }
            let Some(registry) = weak.upgrade() else {
                return;
            };
            if registry.remove_client_if(&operator_id, generation).await {
                error!(%operator_id, "delivery retries exhausted, evicting client and forcing logout");
                registry.revoker.force_logout(&operator_id).await;
            }
        });
    }
}

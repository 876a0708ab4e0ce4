// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time transport core for the Botdesk operator console.
//!
//! Holds the set of live operator streaming sessions, supports direct
//! multicast to named recipients and broadcast to topic subscribers,
//! performs periodic liveness pings, and handles delivery failure with
//! bounded retry and forced eviction.

pub mod frame;
pub mod heartbeat;
pub mod registry;
pub mod sink;

pub use frame::Frame;
pub use heartbeat::run_heartbeat;
pub use registry::{ClientRegistry, DeliveryReport, RetryPolicy};
pub use sink::{ClientSink, SinkError};

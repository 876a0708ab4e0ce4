// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Botdesk integration tests.
//!
//! Provides in-memory mock collaborators for fast, deterministic,
//! CI-runnable tests without a database or a live provider bridge.
//!
//! # Components
//!
//! - [`MemoryDirectory`] - In-memory `DirectoryStore` with synchronous
//!   seeding and inspection helpers
//! - [`RecordingSink`] / [`FlakySink`] - Client sinks that capture or
//!   reject delivered frames
//! - [`RecordingRevoker`] - `SessionRevoker` that records forced logouts
//! - [`MockProvider`] - Provider bridge with scripted send outcomes

pub mod memory_store;
pub mod mock_provider;
pub mod sinks;

pub use memory_store::MemoryDirectory;
pub use mock_provider::MockProvider;
pub use sinks::{FlakySink, RecordingRevoker, RecordingSink};

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline for the Botdesk operator console.
//!
//! Consumes one raw provider event at a time, extracts stable identifiers
//! with a fallback chain, resolves routing and sender identity, classifies
//! content, persists a canonical message, and hands the result to the
//! notification dispatcher.

pub mod event;
pub mod pipeline;

pub use event::{MessageEvent, RawEvent};
pub use pipeline::{IngestOutcome, IngestPipeline, SkipReason};

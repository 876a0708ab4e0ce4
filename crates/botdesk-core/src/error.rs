// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Botdesk operator console.

use thiserror::Error;

/// The primary error type used across all Botdesk traits and core operations.
#[derive(Debug, Error)]
pub enum BotdeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat-provider bridge errors (send failure, thread lookup, HTTP transport).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Gateway/HTTP server errors (bind failure, serve error).
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

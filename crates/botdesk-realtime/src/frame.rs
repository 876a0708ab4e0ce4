// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire frames pushed to operator connections.
//!
//! Frames render as server-sent event framing:
//! ```text
//! event: new_message
//! data: {"message": ...}
//!
//! ```
//! The liveness ping is a comment line (`: ping`) so clients that only parse
//! named events ignore it.

use serde_json::Value;

/// One unit of delivery to an operator connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A named event carrying a JSON payload.
    Event { name: String, data: Value },
    /// A no-data liveness ping.
    Ping,
}

impl Frame {
    /// Build a named event frame.
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }

    /// The event name, if this frame is a named event.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Event { name, .. } => Some(name),
            Self::Ping => None,
        }
    }

    /// Render the frame as SSE wire bytes.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Event { name, data } => format!("event: {name}\ndata: {data}\n\n"),
            Self::Ping => ": ping\n\n".to_string(),
        }
    }
}

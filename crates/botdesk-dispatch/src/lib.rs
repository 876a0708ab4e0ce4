// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message dispatch for the Botdesk operator console.
//!
//! [`Dispatcher`] authorizes and fans out persisted messages to operator
//! connections; [`OutboundSender`] drives staff-authored sends through the
//! provider bridge and reports the outcome the same way.

pub mod dispatcher;
pub mod outbound;

pub use dispatcher::{Dispatcher, MessagePush, SenderMeta, NEW_MESSAGE_EVENT};
pub use outbound::OutboundSender;

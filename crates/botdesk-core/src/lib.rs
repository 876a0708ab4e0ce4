// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Botdesk operator console.
//!
//! This crate provides the canonical domain types, the shared error enum,
//! and the collaborator traits the real-time core depends on. Concrete
//! implementations live in the sibling crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BotdeskError;
pub use traits::{
    DirectoryStore, MessageReceipt, ProviderClient, SessionRevoker, ThreadInfo,
};
pub use types::{
    Conversation, ConversationKind, Identity, IdentityKind, Message, MessageContent,
    MessageStatus, SenderKind, StaffAccount, StaffRole,
};

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function accepts `&Database` and serializes its
//! work through the single background connection.

pub mod conversations;
pub mod directory;
pub mod messages;

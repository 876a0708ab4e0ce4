// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-provider bridge adapter for the Botdesk operator console.

pub mod client;

pub use client::HttpProviderClient;

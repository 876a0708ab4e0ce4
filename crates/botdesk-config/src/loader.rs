// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./botdesk.toml` > `~/.config/botdesk/botdesk.toml`
//! > `/etc/botdesk/botdesk.toml` with environment variable overrides via the
//! `BOTDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BotdeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/botdesk/botdesk.toml` (system-wide)
/// 3. `~/.config/botdesk/botdesk.toml` (user XDG config)
/// 4. `./botdesk.toml` (local directory)
/// 5. `BOTDESK_*` environment variables
pub fn load_config() -> Result<BotdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotdeskConfig::default()))
        .merge(Toml::file("/etc/botdesk/botdesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("botdesk/botdesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("botdesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BotdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BotdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BotdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BOTDESK_SERVICE_LOG_LEVEL` must map to
/// `service.log_level`, not `service.log.level`.
fn env_provider() -> Env {
    Env::prefixed("BOTDESK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("realtime_", "realtime.", 1)
            .replacen("provider_", "provider.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_config_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[storage]
database_path = "/tmp/console.db"
"#,
        )
        .unwrap();
        assert_eq!(config.storage.database_path, "/tmp/console.db");
        assert!(config.storage.wal_mode, "untouched keys keep defaults");
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.realtime.client_buffer, 64);
    }

    #[test]
    fn path_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("botdesk.toml");
        std::fs::write(&path, "[server]\nport = 4242\n").unwrap();
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.server.port, 4242);
    }
}

// SPDX-FileCopyrightText: 2026 Botdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and well-formed timing values.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::BotdeskConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BotdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.realtime.heartbeat_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.heartbeat_interval_secs must be at least 1".to_string(),
        });
    }

    if config.realtime.retry_backoff_secs.is_empty() {
        errors.push(ConfigError::Validation {
            message: "realtime.retry_backoff_secs must contain at least one delay".to_string(),
        });
    }

    if config.realtime.client_buffer == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.client_buffer must be at least 1".to_string(),
        });
    }

    if config.provider.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "provider.base_url must not be empty".to_string(),
        });
    }

    // Two operators sharing one token would make token resolution ambiguous.
    let mut seen_tokens = HashSet::new();
    for (operator_id, token) in &config.server.operator_tokens {
        if token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "server.operator_tokens.{operator_id} must not be empty"
                ),
            });
        }
        if !seen_tokens.insert(token) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "server.operator_tokens.{operator_id} duplicates another operator's token"
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = BotdeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = BotdeskConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_heartbeat_interval_fails_validation() {
        let mut config = BotdeskConfig::default();
        config.realtime.heartbeat_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("heartbeat_interval_secs"))));
    }

    #[test]
    fn empty_backoff_schedule_fails_validation() {
        let mut config = BotdeskConfig::default();
        config.realtime.retry_backoff_secs.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("retry_backoff_secs"))));
    }

    #[test]
    fn duplicate_operator_tokens_fail_validation() {
        let mut config = BotdeskConfig::default();
        config
            .server
            .operator_tokens
            .insert("op-a".to_string(), "same".to_string());
        config
            .server
            .operator_tokens
            .insert("op-b".to_string(), "same".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("duplicates"))));
    }
}

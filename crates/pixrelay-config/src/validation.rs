// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: required credentials, chat ids, URLs and numeric bounds.

use crate::diagnostic::ConfigError;
use crate::model::PixrelayConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PixrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match config.telegram.bot_token.as_deref().map(str::trim) {
        None | Some("") => errors.push(ConfigError::Validation {
            message: "telegram.bot_token is required".to_string(),
        }),
        Some(token) if !token.contains(':') => errors.push(ConfigError::Validation {
            message: "telegram.bot_token must look like `<bot id>:<secret>`".to_string(),
        }),
        Some(_) => {}
    }

    if config.telegram.group_chat_id == 0 {
        errors.push(ConfigError::Validation {
            message: "telegram.group_chat_id must be set to the staff forum group".to_string(),
        });
    }

    if config.bot.admin_id == 0 {
        errors.push(ConfigError::Validation {
            message: "bot.admin_id must be set to the operator's user id".to_string(),
        });
    }

    match reqwest::Url::parse(config.image_api.base_url.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ConfigError::Validation {
            message: format!(
                "image_api.base_url must use http or https, got `{}`",
                url.scheme()
            ),
        }),
        Err(e) => errors.push(ConfigError::Validation {
            message: format!(
                "image_api.base_url `{}` is not a valid URL: {e}",
                config.image_api.base_url
            ),
        }),
    }

    if config.image_api.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "image_api.max_attempts must be at least 1".to_string(),
        });
    }

    if config.image_api.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "image_api.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.users_file.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.users_file must not be empty".to_string(),
        });
    }

    if config.health.enabled && config.health.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "health.host must not be empty".to_string(),
        });
    }

    if config.daemon.lock_file.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "daemon.lock_file must not be empty".to_string(),
        });
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

    fn valid_config() -> PixrelayConfig {
        let mut config = PixrelayConfig::default();
        config.telegram.bot_token = Some("123:ABC".to_string());
        config.telegram.group_chat_id = -1001;
        config.bot.admin_id = 42;
        config
    }

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn complete_config_validates() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn defaults_report_every_missing_identity() {
        let errors = validate_config(&PixrelayConfig::default()).unwrap_err();
        assert!(has_error(&errors, "bot_token"));
        assert!(has_error(&errors, "group_chat_id"));
        assert!(has_error(&errors, "admin_id"));
    }

    #[test]
    fn malformed_token_fails_validation() {
        let mut config = valid_config();
        config.telegram.bot_token = Some("no-colon".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "bot_token"));
    }

    #[test]
    fn non_http_base_url_fails_validation() {
        let mut config = valid_config();
        config.image_api.base_url = "ftp://images.example.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "http or https"));

        config.image_api.base_url = "not a url".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "not a valid URL"));
    }

    #[test]
    fn zero_attempts_fails_validation() {
        let mut config = valid_config();
        config.image_api.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "max_attempts"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = valid_config();
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }
}

// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level pixrelay configuration.
///
/// Every section is optional and falls back to defaults; credentials and
/// chat identifiers have no usable default and are caught by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PixrelayConfig {
    /// Operator identity and conversation behaviour.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// External image generation API.
    #[serde(default)]
    pub image_api: ImageApiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Broadcast pacing.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Health-check responder.
    #[serde(default)]
    pub health: HealthConfig,

    /// Process lifecycle settings.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Operator identity and conversation behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// User id of the single operator allowed to run admin commands.
    #[serde(default)]
    pub admin_id: i64,

    /// Link behind the "Support" button of the welcome message.
    #[serde(default = "default_support_url")]
    pub support_url: String,

    /// Seconds after which an unfinished generation conversation is
    /// forgotten. `0` keeps sessions until they complete.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            admin_id: 0,
            support_url: default_support_url(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_support_url() -> String {
    "t.me/hazexpy".to_string()
}

fn default_session_ttl_secs() -> u64 {
    1800
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Forum supergroup holding one thread per user.
    #[serde(default)]
    pub group_chat_id: i64,

    /// Tell the operator when a stored thread turned out to be gone.
    #[serde(default)]
    pub notify_stale_topics: bool,
}

/// External image generation API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageApiConfig {
    /// Base URL receiving `prompt`, `improve` and `format` query parameters.
    #[serde(default = "default_image_api_url")]
    pub base_url: String,

    /// Require a successful HEAD on the returned image URL before delivery.
    #[serde(default)]
    pub verify_image_url: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout of HEAD requests used for size fallback and verification.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ImageApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_api_url(),
            verify_image_url: false,
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_image_api_url() -> String {
    "https://img-gen.hazex.workers.dev/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding the user id import/export file.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File name of the user id list inside `data_dir`.
    #[serde(default = "default_users_file")]
    pub users_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            data_dir: default_data_dir(),
            users_file: default_users_file(),
        }
    }
}

impl StorageConfig {
    /// Full path of the user id list.
    pub fn users_file_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.users_file)
    }
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("pixrelay"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn default_database_path() -> String {
    data_root().join("users.db").to_string_lossy().to_string()
}

fn default_data_dir() -> String {
    data_root().to_string_lossy().to_string()
}

fn default_users_file() -> String {
    "users.txt".to_string()
}

/// Broadcast pacing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Pause between two recipients, in milliseconds.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

fn default_send_delay_ms() -> u64 {
    50
}

/// Health-check responder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_health_host")]
    pub host: String,

    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_health_host(),
            port: default_health_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_health_host() -> String {
    "0.0.0.0".to_string()
}

fn default_health_port() -> u16 {
    8000
}

/// Process lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Exclusive lock file preventing a second instance from starting.
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    /// Upper bound for each shutdown step.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_lock_file() -> String {
    data_root().join("pixrelay.lock").to_string_lossy().to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PixrelayConfig::default();
        assert_eq!(config.bot.log_level, "info");
        assert_eq!(config.bot.session_ttl_secs, 1800);
        assert_eq!(config.image_api.max_attempts, 3);
        assert_eq!(config.image_api.retry_delay_ms, 1000);
        assert_eq!(config.image_api.request_timeout_secs, 10);
        assert!(!config.image_api.verify_image_url);
        assert_eq!(config.broadcast.send_delay_ms, 50);
        assert_eq!(config.health.port, 8000);
        assert!(config.health.enabled);
        assert_eq!(config.storage.users_file, "users.txt");
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn users_file_path_joins_data_dir() {
        let storage = StorageConfig {
            database_path: "/data/users.db".into(),
            data_dir: "/data".into(),
            users_file: "ids.txt".into(),
        };
        assert_eq!(storage.users_file_path(), PathBuf::from("/data/ids.txt"));
    }

    #[test]
    fn deny_unknown_fields_in_section() {
        let toml_str = r#"
[broadcast]
send_delay = 10
"#;
        assert!(toml::from_str::<PixrelayConfig>(toml_str).is_err());
    }
}

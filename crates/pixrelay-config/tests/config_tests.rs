// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the pixrelay configuration system.

use pixrelay_config::diagnostic::ConfigError;
use pixrelay_config::{load_and_validate_str, load_config_from_str};

const VALID: &str = r#"
[bot]
admin_id = 777
log_level = "debug"
support_url = "t.me/support"
session_ttl_secs = 60

[telegram]
bot_token = "123:ABC"
group_chat_id = -1001234
notify_stale_topics = true

[image_api]
base_url = "https://images.example.com/"
verify_image_url = true
max_attempts = 5

[storage]
database_path = "/tmp/pixrelay.db"
data_dir = "/tmp/pixrelay"

[broadcast]
send_delay_ms = 0

[health]
port = 9000
"#;

#[test]
fn full_toml_deserializes() {
    let config = load_and_validate_str(VALID).expect("valid config");
    assert_eq!(config.bot.admin_id, 777);
    assert_eq!(config.bot.log_level, "debug");
    assert_eq!(config.bot.session_ttl_secs, 60);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.group_chat_id, -1001234);
    assert!(config.telegram.notify_stale_topics);
    assert_eq!(config.image_api.base_url, "https://images.example.com/");
    assert!(config.image_api.verify_image_url);
    assert_eq!(config.image_api.max_attempts, 5);
    assert_eq!(config.storage.database_path, "/tmp/pixrelay.db");
    assert_eq!(config.broadcast.send_delay_ms, 0);
    assert_eq!(config.health.port, 9000);
    assert_eq!(config.health.host, "0.0.0.0");
}

#[test]
fn empty_toml_extracts_defaults() {
    let config = load_config_from_str("").expect("defaults extract");
    assert_eq!(config.image_api.max_attempts, 3);
    assert_eq!(config.broadcast.send_delay_ms, 50);
    assert!(config.telegram.bot_token.is_none());
}

#[test]
fn empty_toml_fails_validation() {
    let errors = load_and_validate_str("").expect_err("credentials are required");
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
    assert!(errors.len() >= 3, "got: {errors:?}");
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[telegram]
bot_tken = "123:ABC"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "bot_tken"
                && suggestion.as_deref() == Some("bot_token")
                && valid_keys.contains("group_chat_id")
        })
    });
    assert!(found, "expected UnknownKey for bot_tken, got: {errors:?}");
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[metrics]
enabled = true
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown section");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::UnknownKey { key, .. } if key == "metrics"))
    );
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[health]
port = "eight thousand"
"#;

    let errors = load_and_validate_str(toml).expect_err("wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

#[test]
fn diagnostics_render_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "send_delay".to_string(),
        suggestion: Some("send_delay_ms".to_string()),
        valid_keys: "send_delay_ms".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `send_delay_ms`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("render");
    assert!(buf.contains("send_delay"));
}

#[test]
#[serial_test::serial]
fn load_and_validate_reads_local_file_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "pixrelay.toml",
            r#"
[bot]
admin_id = 5

[telegram]
group_chat_id = -100
"#,
        )?;
        jail.set_env("PIXRELAY_TELEGRAM_BOT_TOKEN", "1:from-env");
        jail.set_env("PIXRELAY_BROADCAST_SEND_DELAY_MS", "7");

        let config = pixrelay_config::load_and_validate()
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.bot.admin_id, 5);
        assert_eq!(config.telegram.group_chat_id, -100);
        assert_eq!(config.telegram.bot_token.as_deref(), Some("1:from-env"));
        assert_eq!(config.broadcast.send_delay_ms, 7);
        Ok(())
    });
}

#[test]
#[serial_test::serial]
fn required_settings_can_come_from_env_alone() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("PIXRELAY_TELEGRAM_BOT_TOKEN", "1:env-only");
        jail.set_env("PIXRELAY_TELEGRAM_GROUP_CHAT_ID", "-100777");
        jail.set_env("PIXRELAY_BOT_ADMIN_ID", "42");
        jail.set_env("PIXRELAY_IMAGE_API_BASE_URL", "https://images.example.com/");
        jail.set_env("PIXRELAY_IMAGE_API_VERIFY_IMAGE_URL", "true");

        let config = pixrelay_config::load_and_validate()
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("1:env-only"));
        assert_eq!(config.telegram.group_chat_id, -100777);
        assert_eq!(config.bot.admin_id, 42);
        assert_eq!(config.image_api.base_url, "https://images.example.com/");
        assert!(config.image_api.verify_image_url);
        Ok(())
    });
}

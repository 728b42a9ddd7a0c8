// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./pixrelay.toml` > `~/.config/pixrelay/pixrelay.toml`
//! > `/etc/pixrelay/pixrelay.toml`, with environment variable overrides via
//! the `PIXRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PixrelayConfig;

/// Config sections, used to map flat env var names onto dotted keys.
const SECTIONS: &[&str] = &[
    "image_api",
    "telegram",
    "broadcast",
    "storage",
    "health",
    "daemon",
    "bot",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pixrelay/pixrelay.toml`
/// 3. `~/.config/pixrelay/pixrelay.toml`
/// 4. `./pixrelay.toml`
/// 5. `PIXRELAY_*` environment variables
pub fn load_config() -> Result<PixrelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PixrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PixrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PixrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PixrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PixrelayConfig::default()))
        .merge(Toml::file("/etc/pixrelay/pixrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pixrelay/pixrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pixrelay.toml"))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name onto a dotted config key.
///
/// Only the leading section name is split off, so `telegram_bot_token`
/// becomes `telegram.bot_token` rather than `telegram.bot.token`. Figment
/// hands keys over in their original case, so matching is case-insensitive.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

fn env_provider() -> Env {
    Env::prefixed("PIXRELAY_").map(|key| map_env_key(key.as_str()).into())
}

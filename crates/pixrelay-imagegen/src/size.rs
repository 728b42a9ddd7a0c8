// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size descriptor parsing.

use std::sync::LazyLock;

use regex::Regex;

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+\.?\d*)\s*(KB|MB|GB)").unwrap());

/// Convert a descriptor like `"1.5 MB"` into kilobytes.
///
/// Units are case-insensitive; KB = 1, MB = 1024, GB = 1024 * 1024.
/// Empty, `"unknown"` and unparseable descriptors yield `0.0`.
pub fn parse_size_kb(descriptor: &str) -> f64 {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() || descriptor.eq_ignore_ascii_case("unknown") {
        return 0.0;
    }
    let Some(caps) = SIZE_PATTERN.captures(descriptor) else {
        return 0.0;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return 0.0;
    };
    let multiplier = match caps[2].to_ascii_uppercase().as_str() {
        "KB" => 1.0,
        "MB" => 1024.0,
        "GB" => 1024.0 * 1024.0,
        _ => return 0.0,
    };
    value * multiplier
}

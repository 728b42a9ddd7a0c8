// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts.

pub const WELCOME: &str = "Welcome to AI Image Generator!\nUse /gen to create images.";
pub const SUPPORT: &str = "Support";
pub const PROMPT: &str = "Enter a prompt (e.g., 'A futuristic city').";
pub const DIMENSION: &str = "Choose dimension:";
pub const IMPROVE: &str = "Enable quality?";
pub const GENERATING: &str = "Processing...";
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const DOWNLOAD: &str = "Download Image";
pub const ADMIN_ONLY: &str = "This command is for admins only!";
pub const BROADCAST_USAGE: &str =
    "Use: /bro <message> [-<btnname>:<btnlink>] [--<imagelink>]";
pub const BROADCAST_APPROVE: &str = "Approve this broadcast?";
pub const BROADCAST_CANCELED: &str = "Broadcast canceled.";
pub const START_FAILED: &str = "Failed to start bot, please try again later";
pub const USERS_FAILED: &str = "Failed to send users.txt";

pub fn error(reason: &str) -> String {
    format!("Error: {reason}")
}

pub fn broadcast_success(count: usize) -> String {
    format!("Broadcast sent to {count} users!")
}

pub fn user_count(count: usize) -> String {
    format!("User Count: {count}")
}

pub fn generated(prompt: &str, elapsed_secs: f64, size_kb: f64) -> String {
    format!("Generated! Prompt: {prompt}\nTime: {elapsed_secs}s\nSize: {size_kb} KB")
}

pub fn selected_dimension(dimension: &str) -> String {
    format!("Selected dimension: {dimension}")
}

pub fn selected_improve(improve: bool) -> String {
    format!("Selected improve: {improve}")
}

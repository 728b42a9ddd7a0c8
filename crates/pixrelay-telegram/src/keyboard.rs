// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline keyboard conversion.

use pixrelay_core::RelayError;
use pixrelay_core::types::{ButtonAction, Keyboard};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Parse a button link, accepting scheme-less links such as `t.me/name`.
pub fn parse_link(link: &str) -> Result<reqwest::Url, RelayError> {
    let link = link.trim();
    reqwest::Url::parse(link)
        .or_else(|_| reqwest::Url::parse(&format!("https://{link}")))
        .map_err(|e| RelayError::Validation(format!("invalid button link `{link}`: {e}")))
}

/// Build the Telegram markup for a keyboard.
pub fn to_markup(keyboard: &Keyboard) -> Result<InlineKeyboardMarkup, RelayError> {
    let rows = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Url(link) => {
                        Ok(InlineKeyboardButton::url(button.text.clone(), parse_link(link)?))
                    }
                    ButtonAction::Callback(data) => Ok(InlineKeyboardButton::callback(
                        button.text.clone(),
                        data.clone(),
                    )),
                })
                .collect::<Result<Vec<_>, RelayError>>()
        })
        .collect::<Result<Vec<_>, RelayError>>()?;
    Ok(InlineKeyboardMarkup::new(rows))
}

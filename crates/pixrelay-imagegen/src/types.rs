// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types of the image generation API.

use serde::Deserialize;

/// JSON body returned by the generation endpoint.
///
/// Both fields are optional on the wire; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiReply {
    #[serde(default)]
    pub image_url: Option<String>,

    /// Human size descriptor such as `"512 KB"` or `"unknown"`.
    #[serde(default)]
    pub image_size: Option<String>,
}

impl ApiReply {
    /// The image reference, treating blank strings as absent.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

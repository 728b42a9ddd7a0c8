// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation trait.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationOutcome, GenerationRequest};

/// Turns a captured request into a terminal outcome.
///
/// Failures are part of the outcome, so this never returns an error.
#[async_trait]
pub trait ImageGenerator: PluginAdapter {
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;
}

// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation for pixrelay.
//!
//! [`ImageApiClient`] talks to the external generation endpoint with a
//! bounded retry budget for transient failures. [`GenerationPipeline`] turns
//! its replies into a [`GenerationOutcome`](pixrelay_core::types::GenerationOutcome):
//! size resolution, optional URL verification and outcome classification.

pub mod client;
pub mod pipeline;
pub mod size;
pub mod types;

pub use client::ImageApiClient;
pub use pipeline::GenerationPipeline;
pub use size::parse_size_kb;

// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for pixrelay.
//!
//! Provides the trait definitions, error types, and common types shared by
//! the storage, transport, generation, and workflow crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{AdapterType, HealthStatus, MessageRef, TopicId, UserId};

pub use traits::{ImageGenerator, Messenger, PluginAdapter, UserStore};
